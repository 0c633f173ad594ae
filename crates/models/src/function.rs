use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// VPC attachment sent to the provider. Carries no VPC identifier; the
/// provider derives it from the subnets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcSettings {
    pub subnet_ids: Vec<String>,
    pub security_group_ids: Vec<String>,
}

/// VPC attachment as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVpcConfig {
    pub subnet_ids: Vec<String>,
    pub security_group_ids: Vec<String>,
    pub vpc_id: Option<String>,
}

impl RemoteVpcConfig {
    /// Settings that can be sent back to the provider (drops `vpc_id`).
    pub fn to_settings(&self) -> VpcSettings {
        VpcSettings {
            subnet_ids: self.subnet_ids.clone(),
            security_group_ids: self.security_group_ids.clone(),
        }
    }
}

/// The provider's current view of a function. Read fresh before every
/// update decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteFunctionState {
    pub function_name: String,
    pub function_arn: String,
    pub runtime: Option<String>,
    pub role: Option<String>,
    pub handler: Option<String>,
    pub description: Option<String>,
    pub timeout: Option<u32>,
    pub memory_size: Option<u32>,
    pub environment: BTreeMap<String, String>,
    pub vpc_config: Option<RemoteVpcConfig>,
    pub tags: BTreeMap<String, String>,
    pub reserved_concurrency: Option<u32>,
    pub version: Option<String>,
}

/// Code payload for create and update-code calls.
#[derive(Clone, PartialEq, Eq)]
pub enum FunctionCode {
    ZipFile(Vec<u8>),
    S3 { bucket: String, key: String },
}

impl fmt::Debug for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionCode::ZipFile(bytes) => write!(f, "ZipFile({} bytes)", bytes.len()),
            FunctionCode::S3 { bucket, key } => write!(f, "S3(s3://{bucket}/{key})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateFunctionRequest {
    pub function_name: String,
    pub runtime: String,
    pub role: Option<String>,
    pub handler: String,
    pub code: FunctionCode,
    pub description: String,
    pub timeout: u32,
    pub memory_size: u32,
    pub vpc_config: VpcSettings,
    pub environment: Option<BTreeMap<String, String>>,
    pub tags: Option<BTreeMap<String, String>>,
    pub publish: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateFunctionCodeRequest {
    pub function_name: String,
    pub code: FunctionCode,
    pub publish: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateFunctionConfigurationRequest {
    pub function_name: String,
    pub runtime: String,
    pub role: Option<String>,
    pub handler: String,
    pub description: String,
    pub timeout: u32,
    pub memory_size: u32,
    pub vpc_config: VpcSettings,
    pub environment: Option<BTreeMap<String, String>>,
}

/// Identity of a function returned by create and update calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSummary {
    pub function_name: String,
    pub function_arn: String,
    pub version: Option<String>,
}

/// One entry of a version listing. `$LATEST` is reported as a version too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionVersion {
    pub version: String,
    pub function_arn: Option<String>,
    pub last_modified: Option<String>,
}

impl FunctionVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            function_arn: None,
            last_modified: None,
        }
    }
}
