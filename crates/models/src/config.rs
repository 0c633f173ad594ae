use crate::environment::{deserialize_string_map, resolve_environment, ResolvedEnvironment};
use crate::{EnvironmentVariableValue, LambdaError};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

pub const DEFAULT_RUNTIME: &str = "python3.12";
pub const DEFAULT_ROLE_NAME: &str = "lambda_basic_execution";
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 15;
pub const DEFAULT_MEMORY_MB: u32 = 512;
pub const DEFAULT_DIST_DIRECTORY: &str = "dist";
pub const DEFAULT_S3_KEY_PREFIX: &str = "dist/";

/// Top-level keys read from `config.yaml`. Other keys are ignored.
pub const CONFIG_KEYS: &[&str] = &[
    "function_name",
    "handler",
    "runtime",
    "role",
    "region",
    "description",
    "timeout",
    "memory_size",
    "dist_directory",
    "environment_variables",
    "subnet_ids",
    "security_group_ids",
    "tags",
    "concurrency",
    "bucket_name",
    "s3_key_prefix",
    "build",
    "aws_access_key_id",
    "aws_secret_access_key",
    "profile",
];

/// Keys read from the `build` section.
pub const BUILD_KEYS: &[&str] = &["source_directories"];

/// Deployment parameters for one function, as read from `config.yaml`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProjectConfig {
    pub function_name: String,
    pub handler: String,
    #[serde(default = "default_runtime")]
    pub runtime: String,
    #[serde(default = "default_role", deserialize_with = "deserialize_role")]
    pub role: RoleSetting,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(rename = "timeout", default = "default_timeout")]
    pub timeout_seconds: u32,
    #[serde(rename = "memory_size", default = "default_memory")]
    pub memory_mb: u32,
    #[serde(default = "default_dist_directory")]
    pub dist_directory: String,
    #[serde(default)]
    pub environment_variables: Option<BTreeMap<String, EnvironmentVariableValue>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subnet_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub security_group_ids: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_string_map")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub concurrency: i64,
    #[serde(default)]
    pub bucket_name: Option<String>,
    #[serde(default = "default_s3_key_prefix")]
    pub s3_key_prefix: String,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub aws_access_key_id: Option<String>,
    #[serde(default)]
    pub aws_secret_access_key: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct BuildConfig {
    /// Comma separated list of project subdirectories bundled with the code.
    #[serde(default)]
    pub source_directories: Option<String>,
}

/// Execution role to attach to the function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSetting {
    /// IAM role name, expanded to an ARN with the caller's account id.
    Named(String),
    /// Fully qualified role ARN, used verbatim.
    Arn(String),
    /// No role field is sent at all.
    Disabled,
}

/// Which credential scheme the provider clients use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Profile(String),
    Static {
        access_key_id: String,
        secret_access_key: String,
    },
    DefaultChain,
}

fn default_runtime() -> String {
    DEFAULT_RUNTIME.to_string()
}

fn default_role() -> RoleSetting {
    RoleSetting::Named(DEFAULT_ROLE_NAME.to_string())
}

fn default_timeout() -> u32 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_memory() -> u32 {
    DEFAULT_MEMORY_MB
}

fn default_dist_directory() -> String {
    DEFAULT_DIST_DIRECTORY.to_string()
}

fn default_s3_key_prefix() -> String {
    DEFAULT_S3_KEY_PREFIX.to_string()
}

/// Empty YAML keys (`subnet_ids:`) read as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_role<'de, D>(deserializer: D) -> Result<RoleSetting, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(RoleSetting::from_config_value(raw.as_deref()))
}

impl RoleSetting {
    pub fn from_config_value(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None => RoleSetting::Disabled,
            Some(v) if v.is_empty() || v.eq_ignore_ascii_case("none") => RoleSetting::Disabled,
            Some(v) if v.starts_with("arn:") => RoleSetting::Arn(v.to_string()),
            Some(v) => RoleSetting::Named(v.to_string()),
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            function_name: String::new(),
            handler: String::new(),
            runtime: default_runtime(),
            role: default_role(),
            region: None,
            description: String::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            memory_mb: DEFAULT_MEMORY_MB,
            dist_directory: default_dist_directory(),
            environment_variables: None,
            subnet_ids: Vec::new(),
            security_group_ids: Vec::new(),
            tags: None,
            concurrency: 0,
            bucket_name: None,
            s3_key_prefix: default_s3_key_prefix(),
            build: BuildConfig::default(),
            aws_access_key_id: None,
            aws_secret_access_key: None,
            profile: None,
        }
    }
}

impl ProjectConfig {
    pub fn validate(&self) -> Result<(), LambdaError> {
        if self.function_name.trim().is_empty() {
            return Err(LambdaError::config("function_name must not be empty"));
        }
        if !self.handler.contains('.') {
            return Err(LambdaError::InvalidHandler {
                handler: self.handler.clone(),
            });
        }
        if self.timeout_seconds == 0 {
            return Err(LambdaError::config("timeout must be greater than 0"));
        }
        if self.memory_mb == 0 {
            return Err(LambdaError::config("memory_size must be greater than 0"));
        }
        if self.aws_access_key_id.is_some() != self.aws_secret_access_key.is_some() {
            return Err(LambdaError::config(
                "aws_access_key_id and aws_secret_access_key must be set together",
            ));
        }
        Ok(())
    }

    /// Reserved concurrent executions, or 0 when unset.
    pub fn reserved_concurrency(&self) -> u32 {
        self.concurrency.clamp(0, i64::from(u32::MAX)) as u32
    }

    pub fn source_directories(&self) -> Vec<String> {
        self.build
            .source_directories
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn credentials(&self) -> CredentialSource {
        if let Some(profile) = self.profile.as_ref().filter(|p| !p.is_empty()) {
            return CredentialSource::Profile(profile.clone());
        }
        match (&self.aws_access_key_id, &self.aws_secret_access_key) {
            (Some(key), Some(secret)) => CredentialSource::Static {
                access_key_id: key.clone(),
                secret_access_key: secret.clone(),
            },
            _ => CredentialSource::DefaultChain,
        }
    }

    pub fn bucket(&self) -> Result<&str, LambdaError> {
        self.bucket_name
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| LambdaError::config("bucket_name is required to stage artifacts"))
    }

    /// Resolve the configured environment variables; `None` when the config
    /// has no `environment_variables` section.
    pub fn resolved_environment_with<F>(&self, lookup: F) -> Option<ResolvedEnvironment>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.environment_variables
            .as_ref()
            .map(|values| resolve_environment(values, lookup))
    }

    pub fn resolved_environment(&self) -> Option<ResolvedEnvironment> {
        self.resolved_environment_with(|name| std::env::var(name).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
region: us-east-1
function_name: my_lambda_function
handler: service.handler
role: lambda_basic_execution
description: My first lambda function
runtime: python3.11
timeout: 30
memory_size: 256
concurrency: 5
subnet_ids: [subnet-1, subnet-2]
security_group_ids: [sg-1]
environment_variables:
  env_1: foo
  env_2: ${HOME}
tags:
  team: data
  cost_center: 42
bucket_name: artifacts
s3_key_prefix: builds/
build:
  source_directories: lib, vendor
"#;

    #[test]
    fn parses_full_config() {
        let cfg: ProjectConfig = serde_yaml::from_str(FULL).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.function_name, "my_lambda_function");
        assert_eq!(cfg.runtime, "python3.11");
        assert_eq!(cfg.timeout_seconds, 30);
        assert_eq!(cfg.memory_mb, 256);
        assert_eq!(cfg.reserved_concurrency(), 5);
        assert_eq!(cfg.role, RoleSetting::Named("lambda_basic_execution".into()));
        assert_eq!(cfg.source_directories(), vec!["lib", "vendor"]);
        let tags = cfg.tags.unwrap();
        assert_eq!(tags["cost_center"], "42");
        assert!(cfg.environment_variables.unwrap()["env_2"].is_placeholder());
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg: ProjectConfig =
            serde_yaml::from_str("function_name: f\nhandler: service.handler\n").unwrap();
        assert_eq!(cfg.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(cfg.memory_mb, DEFAULT_MEMORY_MB);
        assert_eq!(cfg.dist_directory, "dist");
        assert_eq!(cfg.runtime, DEFAULT_RUNTIME);
        assert_eq!(cfg.role, RoleSetting::Named(DEFAULT_ROLE_NAME.into()));
        assert_eq!(cfg.s3_key_prefix, DEFAULT_S3_KEY_PREFIX);
        assert!(cfg.tags.is_none());
        assert!(cfg.environment_variables.is_none());
        assert!(cfg.source_directories().is_empty());
        assert_eq!(cfg.credentials(), CredentialSource::DefaultChain);
    }

    #[test]
    fn role_sentinels_disable_role() {
        for yaml in ["role: ~", "role: none", "role: ''", "role: None"] {
            let cfg: ProjectConfig =
                serde_yaml::from_str(&format!("function_name: f\nhandler: a.b\n{yaml}\n")).unwrap();
            assert_eq!(cfg.role, RoleSetting::Disabled, "{yaml}");
        }
        let cfg: ProjectConfig = serde_yaml::from_str(
            "function_name: f\nhandler: a.b\nrole: arn:aws:iam::1:role/x\n",
        )
        .unwrap();
        assert_eq!(cfg.role, RoleSetting::Arn("arn:aws:iam::1:role/x".into()));
    }

    #[test]
    fn negative_concurrency_is_unset() {
        let cfg = ProjectConfig {
            concurrency: -3,
            ..Default::default()
        };
        assert_eq!(cfg.reserved_concurrency(), 0);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let cfg: ProjectConfig = serde_yaml::from_str(
            "function_name: f\nhandler: a.b\nconcurency: 3\nbuild:\n  extra: x\n",
        )
        .unwrap();
        assert_eq!(cfg.reserved_concurrency(), 0);
        assert!(cfg.source_directories().is_empty());
    }

    #[test]
    fn every_key_of_the_full_config_is_known() {
        let value: serde_yaml::Value = serde_yaml::from_str(FULL).unwrap();
        for key in value.as_mapping().unwrap().keys() {
            let key = key.as_str().unwrap();
            assert!(CONFIG_KEYS.contains(&key), "{key} missing from CONFIG_KEYS");
        }
    }

    #[test]
    fn validate_rejects_bad_handler_and_half_credentials() {
        let cfg = ProjectConfig {
            function_name: "f".into(),
            handler: "nodot".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(LambdaError::InvalidHandler { .. })));

        let cfg = ProjectConfig {
            function_name: "f".into(),
            handler: "a.b".into(),
            aws_access_key_id: Some("AKIA".into()),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(LambdaError::ConfigError { .. })));
    }

    #[test]
    fn profile_takes_precedence_over_static_keys() {
        let cfg = ProjectConfig {
            aws_access_key_id: Some("AKIA".into()),
            aws_secret_access_key: Some("secret".into()),
            ..Default::default()
        };
        assert!(matches!(cfg.credentials(), CredentialSource::Static { .. }));

        let cfg = ProjectConfig {
            profile: Some("dev".into()),
            ..cfg
        };
        assert_eq!(cfg.credentials(), CredentialSource::Profile("dev".into()));
    }

    #[test]
    fn resolved_environment_is_none_without_section() {
        let cfg = ProjectConfig::default();
        assert!(cfg.resolved_environment_with(|_| None).is_none());
    }

    #[test]
    fn empty_keys_read_as_defaults() {
        let cfg: ProjectConfig = serde_yaml::from_str(
            "function_name: f\nhandler: a.b\ndescription:\nsubnet_ids:\nsecurity_group_ids:\nconcurrency:\n",
        )
        .unwrap();
        assert!(cfg.description.is_empty());
        assert!(cfg.subnet_ids.is_empty());
        assert!(cfg.security_group_ids.is_empty());
        assert_eq!(cfg.concurrency, 0);
    }
}
