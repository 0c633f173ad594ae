use crate::provider::{FunctionApi, IdentityApi};
use crate::role::resolve_role;
use lambda_models::{
    CreateFunctionRequest, FunctionCode, FunctionSummary, LambdaError, ProjectConfig,
    RemoteFunctionState, UpdateFunctionCodeRequest, UpdateFunctionConfigurationRequest,
    VpcSettings,
};
use lambda_telemetry::TracingService;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeployOptions {
    /// Keep the VPC attachment the function already has instead of the
    /// configured subnets and security groups.
    pub preserve_vpc: bool,
}

/// Target configuration of a function, derived from the project config.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredFunction {
    pub function_name: String,
    pub runtime: String,
    pub role: Option<String>,
    pub handler: String,
    pub description: String,
    pub timeout: u32,
    pub memory_size: u32,
    pub vpc_config: VpcSettings,
    pub environment: Option<BTreeMap<String, String>>,
    pub tags: Option<BTreeMap<String, String>>,
    pub reserved_concurrency: u32,
}

impl DesiredFunction {
    /// Placeholders naming unset variables are left out of the environment.
    pub fn from_config<F>(config: &ProjectConfig, role: Option<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = config.resolved_environment_with(lookup).map(|resolved| {
            for key in &resolved.unresolved {
                warn!(
                    function_name = %config.function_name,
                    key = %key,
                    "Environment placeholder is unset; variable not deployed"
                );
            }
            resolved.variables
        });

        Self {
            function_name: config.function_name.clone(),
            runtime: config.runtime.clone(),
            role,
            handler: config.handler.clone(),
            description: config.description.clone(),
            timeout: config.timeout_seconds,
            memory_size: config.memory_mb,
            vpc_config: VpcSettings {
                subnet_ids: config.subnet_ids.clone(),
                security_group_ids: config.security_group_ids.clone(),
            },
            environment,
            tags: config.tags.clone(),
            reserved_concurrency: config.reserved_concurrency(),
        }
    }

    fn create_request(&self, code: FunctionCode) -> CreateFunctionRequest {
        CreateFunctionRequest {
            function_name: self.function_name.clone(),
            runtime: self.runtime.clone(),
            role: self.role.clone(),
            handler: self.handler.clone(),
            code,
            description: self.description.clone(),
            timeout: self.timeout,
            memory_size: self.memory_size,
            vpc_config: self.vpc_config.clone(),
            environment: self.environment.clone(),
            tags: self.tags.clone().filter(|t| !t.is_empty()),
            publish: true,
        }
    }

    fn update_configuration_request(
        &self,
        vpc_config: VpcSettings,
    ) -> UpdateFunctionConfigurationRequest {
        UpdateFunctionConfigurationRequest {
            function_name: self.function_name.clone(),
            runtime: self.runtime.clone(),
            role: self.role.clone(),
            handler: self.handler.clone(),
            description: self.description.clone(),
            timeout: self.timeout,
            memory_size: self.memory_size,
            vpc_config,
            environment: self.environment.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConcurrencyAction {
    #[default]
    Unchanged,
    Set(u32),
    Deleted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagChanges {
    pub removed: Vec<String>,
    pub applied: BTreeMap<String, String>,
}

impl TagChanges {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.applied.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    pub action: DeployAction,
    pub function_name: String,
    pub function_arn: String,
    /// Version published by this deploy.
    pub version: Option<String>,
    /// Object key when the code was staged through object storage.
    pub object_key: Option<String>,
    pub concurrency: ConcurrencyAction,
    pub tags: TagChanges,
}

/// VPC settings for an update. With `preserve` set, a remote attachment
/// with at least one subnet or security group wins over the config.
pub fn select_vpc_config(
    desired: &VpcSettings,
    remote: Option<&RemoteFunctionState>,
    preserve: bool,
) -> VpcSettings {
    if preserve {
        let existing = remote
            .and_then(|r| r.vpc_config.as_ref())
            .filter(|v| !v.subnet_ids.is_empty() || !v.security_group_ids.is_empty());
        if let Some(existing) = existing {
            return existing.to_settings();
        }
    }
    desired.clone()
}

/// Keys to untag and the tag set to apply, or `None` when nothing changes.
pub fn diff_tags(
    remote: &BTreeMap<String, String>,
    desired: &BTreeMap<String, String>,
) -> Option<TagChanges> {
    if remote == desired {
        return None;
    }
    let removed = remote
        .keys()
        .filter(|k| !desired.contains_key(*k))
        .cloned()
        .collect();
    Some(TagChanges {
        removed,
        applied: desired.clone(),
    })
}

/// Brings one remote function in line with the project config.
pub struct Reconciler<'a> {
    functions: &'a dyn FunctionApi,
    identity: &'a dyn IdentityApi,
}

impl<'a> Reconciler<'a> {
    pub fn new(functions: &'a dyn FunctionApi, identity: &'a dyn IdentityApi) -> Self {
        Self {
            functions,
            identity,
        }
    }

    /// Create the function when it is missing, update it otherwise.
    #[instrument(skip(self, config, code), fields(function_name = %config.function_name))]
    pub async fn reconcile(
        &self,
        config: &ProjectConfig,
        code: FunctionCode,
        options: DeployOptions,
    ) -> Result<DeployOutcome, LambdaError> {
        let role = resolve_role(&config.role, config.region.as_deref(), self.identity).await?;
        let desired = DesiredFunction::from_config(config, role, |name| std::env::var(name).ok());
        self.apply(&desired, code, options).await
    }

    /// Converge on an already resolved target.
    pub async fn apply(
        &self,
        desired: &DesiredFunction,
        code: FunctionCode,
        options: DeployOptions,
    ) -> Result<DeployOutcome, LambdaError> {
        match self.functions.get_function(&desired.function_name).await? {
            None => self.create(desired, code).await,
            Some(remote) => self.update(desired, &remote, code, options).await,
        }
    }

    async fn create(
        &self,
        desired: &DesiredFunction,
        code: FunctionCode,
    ) -> Result<DeployOutcome, LambdaError> {
        info!("Creating function {}", desired.function_name);
        let summary = self
            .functions
            .create_function(desired.create_request(code))
            .await?;
        TracingService::log_function_created(&summary);

        let mut concurrency = ConcurrencyAction::Unchanged;
        if desired.reserved_concurrency > 0 {
            self.functions
                .put_function_concurrency(&desired.function_name, desired.reserved_concurrency)
                .await?;
            concurrency = ConcurrencyAction::Set(desired.reserved_concurrency);
        }

        Ok(DeployOutcome {
            action: DeployAction::Created,
            function_name: summary.function_name,
            function_arn: summary.function_arn,
            version: summary.version,
            object_key: None,
            concurrency,
            tags: TagChanges {
                removed: Vec::new(),
                applied: desired.tags.clone().unwrap_or_default(),
            },
        })
    }

    /// Code first, then configuration once the code update has settled,
    /// then concurrency and tags. Anything that fails after the code update
    /// reports a partial update.
    async fn update(
        &self,
        desired: &DesiredFunction,
        remote: &RemoteFunctionState,
        code: FunctionCode,
        options: DeployOptions,
    ) -> Result<DeployOutcome, LambdaError> {
        let name = desired.function_name.as_str();
        info!("Updating function {}", name);

        let code_summary = self
            .functions
            .update_function_code(UpdateFunctionCodeRequest {
                function_name: name.to_string(),
                code,
                publish: true,
            })
            .await?;
        let mut completed = vec!["UpdateFunctionCode"];

        self.functions
            .wait_until_updated(name)
            .await
            .map_err(|e| partial_update(name, &completed, e))?;

        let vpc_config = select_vpc_config(&desired.vpc_config, Some(remote), options.preserve_vpc);
        let config_summary = self
            .functions
            .update_function_configuration(desired.update_configuration_request(vpc_config))
            .await
            .map_err(|e| partial_update(name, &completed, e))?;
        completed.push("UpdateFunctionConfiguration");

        let concurrency = self
            .reconcile_concurrency(desired, remote)
            .await
            .map_err(|e| partial_update(name, &completed, e))?;
        if concurrency != ConcurrencyAction::Unchanged {
            completed.push("FunctionConcurrency");
        }

        let function_arn = if config_summary.function_arn.is_empty() {
            remote.function_arn.clone()
        } else {
            config_summary.function_arn.clone()
        };
        let tags = self
            .reconcile_tags(desired, remote, &function_arn)
            .await
            .map_err(|e| partial_update(name, &completed, e))?;

        let summary = FunctionSummary {
            function_name: name.to_string(),
            function_arn,
            version: code_summary.version,
        };
        TracingService::log_function_updated(&summary);

        Ok(DeployOutcome {
            action: DeployAction::Updated,
            function_name: summary.function_name,
            function_arn: summary.function_arn,
            version: summary.version,
            object_key: None,
            concurrency,
            tags,
        })
    }

    async fn reconcile_concurrency(
        &self,
        desired: &DesiredFunction,
        remote: &RemoteFunctionState,
    ) -> Result<ConcurrencyAction, LambdaError> {
        if desired.reserved_concurrency > 0 {
            self.functions
                .put_function_concurrency(&desired.function_name, desired.reserved_concurrency)
                .await?;
            return Ok(ConcurrencyAction::Set(desired.reserved_concurrency));
        }
        if remote.reserved_concurrency.is_some() {
            info!(
                "Removing reserved concurrency from {}",
                desired.function_name
            );
            self.functions
                .delete_function_concurrency(&desired.function_name)
                .await?;
            return Ok(ConcurrencyAction::Deleted);
        }
        Ok(ConcurrencyAction::Unchanged)
    }

    async fn reconcile_tags(
        &self,
        desired: &DesiredFunction,
        remote: &RemoteFunctionState,
        function_arn: &str,
    ) -> Result<TagChanges, LambdaError> {
        let Some(desired_tags) = desired.tags.as_ref() else {
            return Ok(TagChanges::default());
        };
        let Some(changes) = diff_tags(&remote.tags, desired_tags) else {
            return Ok(TagChanges::default());
        };

        if !changes.removed.is_empty() {
            self.functions
                .untag_resource(function_arn, &changes.removed)
                .await?;
        }
        if !changes.applied.is_empty() {
            self.functions
                .tag_resource(function_arn, &changes.applied)
                .await?;
        }
        Ok(changes)
    }
}

fn partial_update(function_name: &str, completed: &[&str], err: LambdaError) -> LambdaError {
    match err {
        LambdaError::ProviderError { operation, reason } => LambdaError::PartialUpdate {
            function_name: function_name.to_string(),
            completed: completed.join(", "),
            operation,
            reason,
        },
        other => other,
    }
}
