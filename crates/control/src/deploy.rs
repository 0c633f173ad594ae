use crate::provider::{FunctionApi, IdentityApi, ObjectStore};
use crate::pruner::{self, PruneReport};
use crate::reconciler::{DeployOptions, DeployOutcome, Reconciler};
use crate::transport;
use lambda_models::{BuildArtifact, FunctionCode, LambdaError, ProjectConfig};
use lambda_telemetry::TracingService;
use tracing::{info, instrument};

/// How the artifact reaches the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodeDelivery {
    /// Zip bytes sent in the create/update request.
    #[default]
    Inline,
    /// Zip uploaded to the configured bucket first and referenced by key.
    ObjectStorage,
}

/// Entry points for everything that talks to the provider.
pub struct Deployer<'a> {
    functions: &'a dyn FunctionApi,
    identity: &'a dyn IdentityApi,
    objects: &'a dyn ObjectStore,
}

impl<'a> Deployer<'a> {
    pub fn new(
        functions: &'a dyn FunctionApi,
        identity: &'a dyn IdentityApi,
        objects: &'a dyn ObjectStore,
    ) -> Self {
        Self {
            functions,
            identity,
            objects,
        }
    }

    /// Deploy a built artifact. With object storage delivery the upload
    /// happens before any function call, so a failed upload leaves the
    /// function untouched.
    #[instrument(skip(self, config, artifact), fields(function_name = %config.function_name))]
    pub async fn deploy(
        &self,
        config: &ProjectConfig,
        artifact: &BuildArtifact,
        delivery: CodeDelivery,
        options: DeployOptions,
    ) -> Result<DeployOutcome, LambdaError> {
        let (code, object_key) = match delivery {
            CodeDelivery::Inline => (FunctionCode::ZipFile(artifact.read_bytes()?), None),
            CodeDelivery::ObjectStorage => {
                let bucket = config.bucket()?;
                let key = self.upload(config, artifact).await?;
                (
                    FunctionCode::S3 {
                        bucket: bucket.to_string(),
                        key: key.clone(),
                    },
                    Some(key),
                )
            }
        };

        let result = Reconciler::new(self.functions, self.identity)
            .reconcile(config, code, options)
            .await;

        match result {
            Ok(mut outcome) => {
                outcome.object_key = object_key;
                Ok(outcome)
            }
            Err(e) => {
                TracingService::log_error("deploy", &e);
                Err(e)
            }
        }
    }

    /// Stage the artifact in the configured bucket and return its key.
    pub async fn upload(
        &self,
        config: &ProjectConfig,
        artifact: &BuildArtifact,
    ) -> Result<String, LambdaError> {
        let bucket = config.bucket()?;
        info!("Uploading {} to bucket {}", artifact.path.display(), bucket);
        transport::stage(artifact, bucket, &config.s3_key_prefix, self.objects).await
    }

    pub async fn cleanup(
        &self,
        config: &ProjectConfig,
        keep_last: i64,
    ) -> Result<PruneReport, LambdaError> {
        pruner::prune(self.functions, &config.function_name, keep_last).await
    }
}
