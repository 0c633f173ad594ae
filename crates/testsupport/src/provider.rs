use async_trait::async_trait;
use lambda_control::{FunctionApi, IdentityApi, ObjectStore};
use lambda_models::{
    CreateFunctionRequest, FunctionCode, FunctionSummary, FunctionVersion, LambdaError,
    RemoteFunctionState, RemoteVpcConfig, UpdateFunctionCodeRequest,
    UpdateFunctionConfigurationRequest, VpcSettings,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const FAKE_ACCOUNT_ID: &str = "123456789012";

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    GetFunction(String),
    CreateFunction(CreateFunctionRequest),
    UpdateFunctionCode(UpdateFunctionCodeRequest),
    GetFunctionConfiguration(String),
    UpdateFunctionConfiguration(UpdateFunctionConfigurationRequest),
    PutFunctionConcurrency { function_name: String, reserved: u32 },
    DeleteFunctionConcurrency(String),
    TagResource { arn: String, tags: BTreeMap<String, String> },
    UntagResource { arn: String, keys: Vec<String> },
    ListVersionsByFunction(String),
    DeleteFunction { function_name: String, qualifier: Option<String> },
    GetCallerIdentity,
    PutObject { bucket: String, key: String, size: usize },
}

impl ProviderCall {
    pub fn operation(&self) -> &'static str {
        match self {
            ProviderCall::GetFunction(_) => "GetFunction",
            ProviderCall::CreateFunction(_) => "CreateFunction",
            ProviderCall::UpdateFunctionCode(_) => "UpdateFunctionCode",
            ProviderCall::GetFunctionConfiguration(_) => "GetFunctionConfiguration",
            ProviderCall::UpdateFunctionConfiguration(_) => "UpdateFunctionConfiguration",
            ProviderCall::PutFunctionConcurrency { .. } => "PutFunctionConcurrency",
            ProviderCall::DeleteFunctionConcurrency(_) => "DeleteFunctionConcurrency",
            ProviderCall::TagResource { .. } => "TagResource",
            ProviderCall::UntagResource { .. } => "UntagResource",
            ProviderCall::ListVersionsByFunction(_) => "ListVersionsByFunction",
            ProviderCall::DeleteFunction { .. } => "DeleteFunction",
            ProviderCall::GetCallerIdentity => "GetCallerIdentity",
            ProviderCall::PutObject { .. } => "PutObject",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeFunction {
    pub state: RemoteFunctionState,
    pub code: FunctionCode,
    /// Published versions, oldest first. `$LATEST` is implicit.
    pub versions: Vec<String>,
    /// Highest version number ever published. Deleted numbers are not reused.
    pub last_published: usize,
    /// Set by a code update until a status poll sees it settle.
    pub update_in_progress: bool,
}

/// In-memory function, identity and object store provider that records
/// every call it receives.
#[derive(Debug, Clone, Default)]
pub struct FakeProvider {
    pub calls: Arc<Mutex<Vec<ProviderCall>>>,
    pub functions: Arc<Mutex<BTreeMap<String, FakeFunction>>>,
    pub objects: Arc<Mutex<BTreeMap<(String, String), Vec<u8>>>>,
    /// Versions an alias points at; deleting them fails.
    pub aliased_versions: Arc<Mutex<BTreeSet<String>>>,
    /// Operations that fail with the given reason.
    pub failures: Arc<Mutex<BTreeMap<&'static str, String>>>,
}

fn arn_for(function_name: &str) -> String {
    format!("arn:aws:lambda:us-east-1:{FAKE_ACCOUNT_ID}:function:{function_name}")
}

fn remote_vpc(settings: &VpcSettings) -> Option<RemoteVpcConfig> {
    if settings.subnet_ids.is_empty() && settings.security_group_ids.is_empty() {
        return None;
    }
    Some(RemoteVpcConfig {
        subnet_ids: settings.subnet_ids.clone(),
        security_group_ids: settings.security_group_ids.clone(),
        vpc_id: Some("vpc-fake".to_string()),
    })
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing function with `published` numbered versions.
    pub async fn with_function(&self, state: RemoteFunctionState, published: usize) {
        let name = state.function_name.clone();
        let mut state = state;
        if state.function_arn.is_empty() {
            state.function_arn = arn_for(&name);
        }
        self.functions.lock().await.insert(
            name,
            FakeFunction {
                state,
                code: FunctionCode::ZipFile(Vec::new()),
                versions: (1..=published).map(|v| v.to_string()).collect(),
                last_published: published,
                update_in_progress: false,
            },
        );
    }

    pub async fn fail_on(&self, operation: &'static str, reason: &str) {
        self.failures
            .lock()
            .await
            .insert(operation, reason.to_string());
    }

    pub async fn alias_version(&self, version: &str) {
        self.aliased_versions
            .lock()
            .await
            .insert(version.to_string());
    }

    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().await.clone()
    }

    pub async fn operations(&self) -> Vec<&'static str> {
        self.calls
            .lock()
            .await
            .iter()
            .map(ProviderCall::operation)
            .collect()
    }

    pub async fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    pub async fn function(&self, name: &str) -> Option<FakeFunction> {
        self.functions.lock().await.get(name).cloned()
    }

    async fn record(&self, call: ProviderCall) -> Result<(), LambdaError> {
        let operation = call.operation();
        self.calls.lock().await.push(call);
        match self.failures.lock().await.get(operation) {
            Some(reason) => Err(LambdaError::provider(operation, reason)),
            None => Ok(()),
        }
    }

    fn not_found(operation: &'static str, name: &str) -> LambdaError {
        LambdaError::provider(operation, format!("Function not found: {name}"))
    }
}

#[async_trait]
impl FunctionApi for FakeProvider {
    async fn get_function(
        &self,
        function_name: &str,
    ) -> Result<Option<RemoteFunctionState>, LambdaError> {
        self.record(ProviderCall::GetFunction(function_name.to_string()))
            .await?;
        Ok(self
            .functions
            .lock()
            .await
            .get(function_name)
            .map(|f| f.state.clone()))
    }

    async fn create_function(
        &self,
        request: CreateFunctionRequest,
    ) -> Result<FunctionSummary, LambdaError> {
        self.record(ProviderCall::CreateFunction(request.clone()))
            .await?;
        let mut functions = self.functions.lock().await;
        if functions.contains_key(&request.function_name) {
            return Err(LambdaError::provider(
                "CreateFunction",
                format!("Function already exist: {}", request.function_name),
            ));
        }

        let arn = arn_for(&request.function_name);
        let versions = if request.publish {
            vec!["1".to_string()]
        } else {
            Vec::new()
        };
        let state = RemoteFunctionState {
            function_name: request.function_name.clone(),
            function_arn: arn.clone(),
            runtime: Some(request.runtime),
            role: request.role,
            handler: Some(request.handler),
            description: Some(request.description),
            timeout: Some(request.timeout),
            memory_size: Some(request.memory_size),
            environment: request.environment.unwrap_or_default(),
            vpc_config: remote_vpc(&request.vpc_config),
            tags: request.tags.unwrap_or_default(),
            reserved_concurrency: None,
            version: versions.last().cloned(),
        };
        functions.insert(
            request.function_name.clone(),
            FakeFunction {
                state,
                code: request.code,
                versions: versions.clone(),
                last_published: versions.len(),
                update_in_progress: false,
            },
        );

        Ok(FunctionSummary {
            function_name: request.function_name,
            function_arn: arn,
            version: versions.last().cloned(),
        })
    }

    async fn update_function_code(
        &self,
        request: UpdateFunctionCodeRequest,
    ) -> Result<FunctionSummary, LambdaError> {
        self.record(ProviderCall::UpdateFunctionCode(request.clone()))
            .await?;
        let mut functions = self.functions.lock().await;
        let function = functions
            .get_mut(&request.function_name)
            .ok_or_else(|| Self::not_found("UpdateFunctionCode", &request.function_name))?;

        function.code = request.code;
        function.update_in_progress = true;
        if request.publish {
            function.last_published += 1;
            let next = function.last_published.to_string();
            function.versions.push(next.clone());
            function.state.version = Some(next);
        }
        Ok(FunctionSummary {
            function_name: request.function_name,
            function_arn: function.state.function_arn.clone(),
            version: function.state.version.clone(),
        })
    }

    async fn wait_until_updated(&self, function_name: &str) -> Result<(), LambdaError> {
        self.record(ProviderCall::GetFunctionConfiguration(
            function_name.to_string(),
        ))
        .await?;
        let mut functions = self.functions.lock().await;
        let function = functions
            .get_mut(function_name)
            .ok_or_else(|| Self::not_found("GetFunctionConfiguration", function_name))?;
        function.update_in_progress = false;
        Ok(())
    }

    async fn update_function_configuration(
        &self,
        request: UpdateFunctionConfigurationRequest,
    ) -> Result<FunctionSummary, LambdaError> {
        self.record(ProviderCall::UpdateFunctionConfiguration(request.clone()))
            .await?;
        let mut functions = self.functions.lock().await;
        let function = functions.get_mut(&request.function_name).ok_or_else(|| {
            Self::not_found("UpdateFunctionConfiguration", &request.function_name)
        })?;
        if function.update_in_progress {
            return Err(LambdaError::provider(
                "UpdateFunctionConfiguration",
                format!(
                    "ResourceConflictException: An update is in progress for resource: {}",
                    function.state.function_arn
                ),
            ));
        }

        let state = &mut function.state;
        state.runtime = Some(request.runtime);
        state.role = request.role;
        state.handler = Some(request.handler);
        state.description = Some(request.description);
        state.timeout = Some(request.timeout);
        state.memory_size = Some(request.memory_size);
        state.vpc_config = remote_vpc(&request.vpc_config);
        if let Some(environment) = request.environment {
            state.environment = environment;
        }
        Ok(FunctionSummary {
            function_name: request.function_name,
            function_arn: state.function_arn.clone(),
            version: Some("$LATEST".to_string()),
        })
    }

    async fn put_function_concurrency(
        &self,
        function_name: &str,
        reserved: u32,
    ) -> Result<(), LambdaError> {
        self.record(ProviderCall::PutFunctionConcurrency {
            function_name: function_name.to_string(),
            reserved,
        })
        .await?;
        let mut functions = self.functions.lock().await;
        let function = functions
            .get_mut(function_name)
            .ok_or_else(|| Self::not_found("PutFunctionConcurrency", function_name))?;
        function.state.reserved_concurrency = Some(reserved);
        Ok(())
    }

    async fn delete_function_concurrency(&self, function_name: &str) -> Result<(), LambdaError> {
        self.record(ProviderCall::DeleteFunctionConcurrency(
            function_name.to_string(),
        ))
        .await?;
        let mut functions = self.functions.lock().await;
        let function = functions
            .get_mut(function_name)
            .ok_or_else(|| Self::not_found("DeleteFunctionConcurrency", function_name))?;
        function.state.reserved_concurrency = None;
        Ok(())
    }

    async fn tag_resource(
        &self,
        function_arn: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), LambdaError> {
        self.record(ProviderCall::TagResource {
            arn: function_arn.to_string(),
            tags: tags.clone(),
        })
        .await?;
        let mut functions = self.functions.lock().await;
        if let Some(function) = functions
            .values_mut()
            .find(|f| f.state.function_arn == function_arn)
        {
            function.state.tags.extend(tags.clone());
        }
        Ok(())
    }

    async fn untag_resource(
        &self,
        function_arn: &str,
        keys: &[String],
    ) -> Result<(), LambdaError> {
        self.record(ProviderCall::UntagResource {
            arn: function_arn.to_string(),
            keys: keys.to_vec(),
        })
        .await?;
        let mut functions = self.functions.lock().await;
        if let Some(function) = functions
            .values_mut()
            .find(|f| f.state.function_arn == function_arn)
        {
            for key in keys {
                function.state.tags.remove(key);
            }
        }
        Ok(())
    }

    async fn list_versions_by_function(
        &self,
        function_name: &str,
    ) -> Result<Vec<FunctionVersion>, LambdaError> {
        self.record(ProviderCall::ListVersionsByFunction(
            function_name.to_string(),
        ))
        .await?;
        let functions = self.functions.lock().await;
        let function = functions
            .get(function_name)
            .ok_or_else(|| Self::not_found("ListVersionsByFunction", function_name))?;
        Ok(std::iter::once("$LATEST".to_string())
            .chain(function.versions.iter().cloned())
            .map(FunctionVersion::new)
            .collect())
    }

    async fn delete_function(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<(), LambdaError> {
        self.record(ProviderCall::DeleteFunction {
            function_name: function_name.to_string(),
            qualifier: qualifier.map(str::to_string),
        })
        .await?;

        let mut functions = self.functions.lock().await;
        match qualifier {
            None => {
                functions
                    .remove(function_name)
                    .ok_or_else(|| Self::not_found("DeleteFunction", function_name))?;
            }
            Some(version) => {
                if self.aliased_versions.lock().await.contains(version) {
                    return Err(LambdaError::provider(
                        "DeleteFunction",
                        format!("Unable to delete version {version} because an alias points to it"),
                    ));
                }
                let function = functions
                    .get_mut(function_name)
                    .ok_or_else(|| Self::not_found("DeleteFunction", function_name))?;
                function.versions.retain(|v| v != version);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityApi for FakeProvider {
    async fn caller_account_id(&self) -> Result<String, LambdaError> {
        self.record(ProviderCall::GetCallerIdentity).await?;
        Ok(FAKE_ACCOUNT_ID.to_string())
    }
}

#[async_trait]
impl ObjectStore for FakeProvider {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), LambdaError> {
        self.record(ProviderCall::PutObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: body.len(),
        })
        .await
        .map_err(|e| LambdaError::TransportError {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.objects
            .lock()
            .await
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }
}
