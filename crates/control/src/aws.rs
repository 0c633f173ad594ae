use crate::provider::{FunctionApi, IdentityApi, ObjectStore};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_lambda::config::Credentials;
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{
    self as lambda_types, Environment, LastUpdateStatus, Runtime, VpcConfig,
};
use aws_sdk_s3::primitives::ByteStream;
use lambda_models::{
    CredentialSource, CreateFunctionRequest, FunctionCode, FunctionSummary, FunctionVersion,
    LambdaError, ProjectConfig, RemoteFunctionState, RemoteVpcConfig, UpdateFunctionCodeRequest,
    UpdateFunctionConfigurationRequest, VpcSettings,
};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Pause between status polls while a function update settles.
const UPDATE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const UPDATE_WAIT_LIMIT: Duration = Duration::from_secs(300);

/// Lambda, S3 and STS clients sharing one credential and region setup.
/// SDK retries are off; every failed call surfaces immediately.
#[derive(Debug, Clone)]
pub struct AwsProvider {
    lambda: aws_sdk_lambda::Client,
    s3: aws_sdk_s3::Client,
    sts: aws_sdk_sts::Client,
    region: Option<String>,
}

impl AwsProvider {
    pub async fn from_config(config: &ProjectConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::disabled());

        if let Some(region) = config.region.clone() {
            loader = loader.region(Region::new(region));
        }

        loader = match config.credentials() {
            CredentialSource::Profile(profile) => {
                debug!("Using AWS profile {}", profile);
                loader.profile_name(profile)
            }
            CredentialSource::Static {
                access_key_id,
                secret_access_key,
            } => {
                debug!("Using static AWS credentials from config");
                loader.credentials_provider(Credentials::new(
                    access_key_id,
                    secret_access_key,
                    None,
                    None,
                    "lambda-deploy-config",
                ))
            }
            CredentialSource::DefaultChain => loader,
        };

        let sdk_config = loader.load().await;
        Self {
            lambda: aws_sdk_lambda::Client::new(&sdk_config),
            s3: aws_sdk_s3::Client::new(&sdk_config),
            sts: aws_sdk_sts::Client::new(&sdk_config),
            region: sdk_config.region().map(|r| r.to_string()),
        }
    }

    /// Region the clients resolved, from config or the SDK region chain.
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

fn map_sdk_error<E>(operation: &'static str, err: E) -> LambdaError
where
    E: std::error::Error + Send + Sync + 'static,
{
    LambdaError::provider(operation, DisplayErrorContext(err))
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn vpc_config(settings: VpcSettings) -> VpcConfig {
    VpcConfig::builder()
        .set_subnet_ids(Some(settings.subnet_ids))
        .set_security_group_ids(Some(settings.security_group_ids))
        .build()
}

fn environment(variables: Option<BTreeMap<String, String>>) -> Option<Environment> {
    variables.map(|v| {
        Environment::builder()
            .set_variables(Some(v.into_iter().collect::<HashMap<_, _>>()))
            .build()
    })
}

fn remote_state(
    configuration: lambda_types::FunctionConfiguration,
    tags: Option<HashMap<String, String>>,
    concurrency: Option<lambda_types::Concurrency>,
) -> RemoteFunctionState {
    let vpc_config = configuration
        .vpc_config
        .map(|vpc| RemoteVpcConfig {
            subnet_ids: vpc.subnet_ids.unwrap_or_default(),
            security_group_ids: vpc.security_group_ids.unwrap_or_default(),
            vpc_id: vpc.vpc_id.filter(|id| !id.is_empty()),
        })
        .filter(|vpc| !vpc.subnet_ids.is_empty() || !vpc.security_group_ids.is_empty());

    RemoteFunctionState {
        function_name: configuration.function_name.unwrap_or_default(),
        function_arn: configuration.function_arn.unwrap_or_default(),
        runtime: configuration.runtime.map(|r| r.as_str().to_string()),
        role: configuration.role,
        handler: configuration.handler,
        description: configuration.description,
        timeout: configuration.timeout.and_then(|t| u32::try_from(t).ok()),
        memory_size: configuration.memory_size.and_then(|m| u32::try_from(m).ok()),
        environment: configuration
            .environment
            .and_then(|e| e.variables)
            .map(|v| v.into_iter().collect())
            .unwrap_or_default(),
        vpc_config,
        tags: tags.map(|t| t.into_iter().collect()).unwrap_or_default(),
        reserved_concurrency: concurrency
            .and_then(|c| c.reserved_concurrent_executions)
            .and_then(|c| u32::try_from(c).ok()),
        version: configuration.version,
    }
}

#[async_trait]
impl FunctionApi for AwsProvider {
    #[instrument(skip(self))]
    async fn get_function(
        &self,
        function_name: &str,
    ) -> Result<Option<RemoteFunctionState>, LambdaError> {
        match self
            .lambda
            .get_function()
            .function_name(function_name)
            .send()
            .await
        {
            Ok(output) => Ok(output
                .configuration
                .map(|c| remote_state(c, output.tags, output.concurrency))),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_resource_not_found_exception())
                    .unwrap_or(false);
                if not_found {
                    debug!("Function {} does not exist", function_name);
                    Ok(None)
                } else {
                    Err(map_sdk_error("GetFunction", err))
                }
            }
        }
    }

    #[instrument(skip(self, request), fields(function_name = %request.function_name))]
    async fn create_function(
        &self,
        request: CreateFunctionRequest,
    ) -> Result<FunctionSummary, LambdaError> {
        let code = match request.code {
            FunctionCode::ZipFile(bytes) => lambda_types::FunctionCode::builder()
                .zip_file(Blob::new(bytes))
                .build(),
            FunctionCode::S3 { bucket, key } => lambda_types::FunctionCode::builder()
                .s3_bucket(bucket)
                .s3_key(key)
                .build(),
        };

        let output = self
            .lambda
            .create_function()
            .function_name(&request.function_name)
            .runtime(Runtime::from(request.runtime.as_str()))
            .set_role(request.role)
            .handler(request.handler)
            .code(code)
            .description(request.description)
            .timeout(to_i32(request.timeout))
            .memory_size(to_i32(request.memory_size))
            .vpc_config(vpc_config(request.vpc_config))
            .set_environment(environment(request.environment))
            .set_tags(request.tags.map(|t| t.into_iter().collect()))
            .publish(request.publish)
            .send()
            .await
            .map_err(|e| map_sdk_error("CreateFunction", e))?;

        Ok(FunctionSummary {
            function_name: output.function_name.unwrap_or(request.function_name),
            function_arn: output.function_arn.unwrap_or_default(),
            version: output.version,
        })
    }

    #[instrument(skip(self, request), fields(function_name = %request.function_name))]
    async fn update_function_code(
        &self,
        request: UpdateFunctionCodeRequest,
    ) -> Result<FunctionSummary, LambdaError> {
        let builder = self
            .lambda
            .update_function_code()
            .function_name(&request.function_name)
            .publish(request.publish);
        let builder = match request.code {
            FunctionCode::ZipFile(bytes) => builder.zip_file(Blob::new(bytes)),
            FunctionCode::S3 { bucket, key } => builder.s3_bucket(bucket).s3_key(key),
        };

        let output = builder
            .send()
            .await
            .map_err(|e| map_sdk_error("UpdateFunctionCode", e))?;

        Ok(FunctionSummary {
            function_name: output.function_name.unwrap_or(request.function_name),
            function_arn: output.function_arn.unwrap_or_default(),
            version: output.version,
        })
    }

    #[instrument(skip(self))]
    async fn wait_until_updated(&self, function_name: &str) -> Result<(), LambdaError> {
        let started = Instant::now();
        loop {
            let configuration = self
                .lambda
                .get_function_configuration()
                .function_name(function_name)
                .send()
                .await
                .map_err(|e| map_sdk_error("GetFunctionConfiguration", e))?;

            match configuration.last_update_status() {
                Some(LastUpdateStatus::InProgress) => {}
                Some(LastUpdateStatus::Failed) => {
                    return Err(LambdaError::provider(
                        "GetFunctionConfiguration",
                        format!(
                            "last update of {} failed: {}",
                            function_name,
                            configuration
                                .last_update_status_reason()
                                .unwrap_or("no reason given")
                        ),
                    ));
                }
                _ => return Ok(()),
            }

            if started.elapsed() >= UPDATE_WAIT_LIMIT {
                return Err(LambdaError::provider(
                    "GetFunctionConfiguration",
                    format!(
                        "update of {} still in progress after {}s",
                        function_name,
                        UPDATE_WAIT_LIMIT.as_secs()
                    ),
                ));
            }
            debug!("Update of {} in progress, polling again", function_name);
            tokio::time::sleep(UPDATE_POLL_INTERVAL).await;
        }
    }

    #[instrument(skip(self, request), fields(function_name = %request.function_name))]
    async fn update_function_configuration(
        &self,
        request: UpdateFunctionConfigurationRequest,
    ) -> Result<FunctionSummary, LambdaError> {
        let output = self
            .lambda
            .update_function_configuration()
            .function_name(&request.function_name)
            .runtime(Runtime::from(request.runtime.as_str()))
            .set_role(request.role)
            .handler(request.handler)
            .description(request.description)
            .timeout(to_i32(request.timeout))
            .memory_size(to_i32(request.memory_size))
            .vpc_config(vpc_config(request.vpc_config))
            .set_environment(environment(request.environment))
            .send()
            .await
            .map_err(|e| map_sdk_error("UpdateFunctionConfiguration", e))?;

        Ok(FunctionSummary {
            function_name: output.function_name.unwrap_or(request.function_name),
            function_arn: output.function_arn.unwrap_or_default(),
            version: output.version,
        })
    }

    async fn put_function_concurrency(
        &self,
        function_name: &str,
        reserved: u32,
    ) -> Result<(), LambdaError> {
        self.lambda
            .put_function_concurrency()
            .function_name(function_name)
            .reserved_concurrent_executions(to_i32(reserved))
            .send()
            .await
            .map_err(|e| map_sdk_error("PutFunctionConcurrency", e))?;
        Ok(())
    }

    async fn delete_function_concurrency(&self, function_name: &str) -> Result<(), LambdaError> {
        self.lambda
            .delete_function_concurrency()
            .function_name(function_name)
            .send()
            .await
            .map_err(|e| map_sdk_error("DeleteFunctionConcurrency", e))?;
        Ok(())
    }

    async fn tag_resource(
        &self,
        function_arn: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), LambdaError> {
        self.lambda
            .tag_resource()
            .resource(function_arn)
            .set_tags(Some(tags.clone().into_iter().collect()))
            .send()
            .await
            .map_err(|e| map_sdk_error("TagResource", e))?;
        Ok(())
    }

    async fn untag_resource(
        &self,
        function_arn: &str,
        keys: &[String],
    ) -> Result<(), LambdaError> {
        self.lambda
            .untag_resource()
            .resource(function_arn)
            .set_tag_keys(Some(keys.to_vec()))
            .send()
            .await
            .map_err(|e| map_sdk_error("UntagResource", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_versions_by_function(
        &self,
        function_name: &str,
    ) -> Result<Vec<FunctionVersion>, LambdaError> {
        let mut paginator = self
            .lambda
            .list_versions_by_function()
            .function_name(function_name)
            .into_paginator()
            .send();

        let mut versions = Vec::new();
        while let Some(page) = paginator.next().await {
            let page = page.map_err(|e| map_sdk_error("ListVersionsByFunction", e))?;
            for configuration in page.versions.unwrap_or_default() {
                let Some(version) = configuration.version else {
                    continue;
                };
                versions.push(FunctionVersion {
                    version,
                    function_arn: configuration.function_arn,
                    last_modified: configuration.last_modified,
                });
            }
        }
        Ok(versions)
    }

    async fn delete_function(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<(), LambdaError> {
        self.lambda
            .delete_function()
            .function_name(function_name)
            .set_qualifier(qualifier.map(str::to_string))
            .send()
            .await
            .map_err(|e| map_sdk_error("DeleteFunction", e))?;
        Ok(())
    }
}

#[async_trait]
impl IdentityApi for AwsProvider {
    async fn caller_account_id(&self) -> Result<String, LambdaError> {
        let output = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| map_sdk_error("GetCallerIdentity", e))?;
        output
            .account
            .ok_or_else(|| LambdaError::provider("GetCallerIdentity", "response had no account id"))
    }
}

#[async_trait]
impl ObjectStore for AwsProvider {
    #[instrument(skip(self, body), fields(size = body.len()))]
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), LambdaError> {
        self.s3
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| LambdaError::TransportError {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: DisplayErrorContext(e).to_string(),
            })?;
        Ok(())
    }
}
