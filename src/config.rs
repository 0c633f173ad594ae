use lambda_models::{LambdaError, ProjectConfig, BUILD_KEYS, CONFIG_KEYS};
use serde_yaml::Value;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

pub const FUNCTION_NAME_ENV: &str = "LAMBDA_FUNCTION_NAME";
pub const BUCKET_NAME_ENV: &str = "S3_BUCKET_NAME";
pub const PROFILE_ENV: &str = "AWS_PROFILE";

/// Values that replace config file settings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub function_name: Option<String>,
    pub bucket_name: Option<String>,
    pub profile: Option<String>,
}

impl ConfigOverrides {
    /// An explicit `--profile` wins over `AWS_PROFILE`.
    pub fn from_env(profile_arg: Option<&str>) -> Self {
        Self::from_lookup(profile_arg, |name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(profile_arg: Option<&str>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |v: String| (!v.trim().is_empty()).then_some(v);
        Self {
            function_name: lookup(FUNCTION_NAME_ENV).and_then(non_empty),
            bucket_name: lookup(BUCKET_NAME_ENV).and_then(non_empty),
            profile: profile_arg
                .map(str::to_string)
                .or_else(|| lookup(PROFILE_ENV))
                .and_then(non_empty),
        }
    }

    pub fn apply(&self, config: &mut ProjectConfig) {
        if let Some(name) = &self.function_name {
            debug!("{} overrides function_name", FUNCTION_NAME_ENV);
            config.function_name = name.clone();
        }
        if let Some(bucket) = &self.bucket_name {
            debug!("{} overrides bucket_name", BUCKET_NAME_ENV);
            config.bucket_name = Some(bucket.clone());
        }
        if let Some(profile) = &self.profile {
            config.profile = Some(profile.clone());
        }
    }
}

/// Keys the config model does not read, `build.` prefixed for the build
/// section.
pub fn unknown_keys(document: &Value) -> Vec<String> {
    let mut unknown = Vec::new();
    let Some(mapping) = document.as_mapping() else {
        return unknown;
    };
    for (key, value) in mapping {
        let Some(key) = key.as_str() else { continue };
        if !CONFIG_KEYS.contains(&key) {
            unknown.push(key.to_string());
        } else if key == "build" {
            if let Some(build) = value.as_mapping() {
                unknown.extend(
                    build
                        .keys()
                        .filter_map(Value::as_str)
                        .filter(|k| !BUILD_KEYS.contains(k))
                        .map(|k| format!("build.{k}")),
                );
            }
        }
    }
    unknown
}

/// Parse a config document. Unknown keys are logged and ignored.
pub fn parse_config(raw: &str) -> Result<ProjectConfig, LambdaError> {
    let document: Value =
        serde_yaml::from_str(raw).map_err(|e| LambdaError::config(e.to_string()))?;
    for key in unknown_keys(&document) {
        warn!(key = %key, "Ignoring unknown config key");
    }
    serde_yaml::from_value(document).map_err(|e| LambdaError::config(e.to_string()))
}

/// Read `<project_dir>/<config_file>`, apply overrides and validate.
pub fn read_config(
    project_dir: &Path,
    config_file: &str,
    overrides: &ConfigOverrides,
) -> Result<ProjectConfig, LambdaError> {
    let path = project_dir.join(config_file);
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| LambdaError::config(format!("cannot read {}: {e}", path.display())))?;

    let mut config = parse_config(&raw)?;
    overrides.apply(&mut config);
    config.validate()?;

    info!(
        function_name = %config.function_name,
        config = %path.display(),
        "Loaded configuration"
    );
    Ok(config)
}
