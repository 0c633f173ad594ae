use async_trait::async_trait;
use lambda_models::{
    CreateFunctionRequest, FunctionSummary, FunctionVersion, LambdaError, RemoteFunctionState,
    UpdateFunctionCodeRequest, UpdateFunctionConfigurationRequest,
};
use std::collections::BTreeMap;

/// Function management capabilities of the cloud provider.
#[async_trait]
pub trait FunctionApi: Send + Sync {
    /// Current state of `function_name`, or `None` when it does not exist.
    async fn get_function(
        &self,
        function_name: &str,
    ) -> Result<Option<RemoteFunctionState>, LambdaError>;

    async fn create_function(
        &self,
        request: CreateFunctionRequest,
    ) -> Result<FunctionSummary, LambdaError>;

    async fn update_function_code(
        &self,
        request: UpdateFunctionCodeRequest,
    ) -> Result<FunctionSummary, LambdaError>;

    /// Block until the last update of the function has settled. The
    /// provider refuses further changes while one is in progress.
    async fn wait_until_updated(&self, function_name: &str) -> Result<(), LambdaError>;

    async fn update_function_configuration(
        &self,
        request: UpdateFunctionConfigurationRequest,
    ) -> Result<FunctionSummary, LambdaError>;

    async fn put_function_concurrency(
        &self,
        function_name: &str,
        reserved: u32,
    ) -> Result<(), LambdaError>;

    async fn delete_function_concurrency(&self, function_name: &str) -> Result<(), LambdaError>;

    async fn tag_resource(
        &self,
        function_arn: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), LambdaError>;

    async fn untag_resource(&self, function_arn: &str, keys: &[String])
        -> Result<(), LambdaError>;

    /// Every version of the function in provider order, `$LATEST` first.
    async fn list_versions_by_function(
        &self,
        function_name: &str,
    ) -> Result<Vec<FunctionVersion>, LambdaError>;

    /// Delete the function, or only `qualifier` when given.
    async fn delete_function(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<(), LambdaError>;
}

#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Account id of the credentials in use.
    async fn caller_account_id(&self) -> Result<String, LambdaError>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), LambdaError>;
}
