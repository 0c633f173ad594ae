use crate::archive::ArchiveBuilder;
use crate::installer::{DependencyInstaller, InstallMode, PackageManager};
use crate::zip_handler::ZipHandler;
use chrono::Utc;
use lambda_models::{artifact_path, BuildArtifact, LambdaError, ProjectConfig};
use lambda_telemetry::TracingService;
use std::path::Path;
use tracing::{info, instrument};

/// Prefix of the temporary staging directory.
pub const STAGING_PREFIX: &str = "aws-lambda";

/// Timestamp used in default artifact names.
pub const ARTIFACT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub mode: InstallMode,
    /// Extra local packages installed after the resolved requirements.
    pub local_packages: Vec<String>,
    /// Name of the config file, excluded from the bundle.
    pub config_file_name: String,
    /// Artifact file name; defaults to `<timestamp>-<function_name>.zip`.
    pub output_filename: Option<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            mode: InstallMode::Freeze,
            local_packages: Vec::new(),
            config_file_name: "config.yaml".to_string(),
            output_filename: None,
        }
    }
}

pub fn default_artifact_name(function_name: &str) -> String {
    format!(
        "{}-{}.zip",
        Utc::now().format(ARTIFACT_TIMESTAMP_FORMAT),
        function_name
    )
}

/// Install dependencies into a fresh staging directory, bundle the project
/// sources on top and write the zip into the dist directory. The staging
/// directory is removed when this returns.
#[instrument(skip(config, options, package_manager), fields(function_name = %config.function_name))]
pub async fn build_package(
    config: &ProjectConfig,
    project_dir: &Path,
    options: &BuildOptions,
    package_manager: &dyn PackageManager,
) -> Result<BuildArtifact, LambdaError> {
    let file_name = options
        .output_filename
        .clone()
        .unwrap_or_else(|| default_artifact_name(&config.function_name));
    let output = artifact_path(project_dir, &config.dist_directory, &file_name);

    let staging = tempfile::Builder::new().prefix(STAGING_PREFIX).tempdir()?;
    info!("Staging build in {}", staging.path().display());

    let report = DependencyInstaller::new(package_manager)
        .install(staging.path(), &options.mode, &options.local_packages)
        .await?;
    info!(
        "Installed {} packages ({} namespace fixes)",
        report.installed.len(),
        report.namespace_fixes.len()
    );

    let artifact = ArchiveBuilder::new(&options.config_file_name).build(
        project_dir,
        staging.path(),
        &config.source_directories(),
        &output,
    )?;

    let entries = ZipHandler::process_file(&artifact.path)?.files.len();
    TracingService::log_build_completed(&config.function_name, &artifact, entries);

    Ok(artifact)
}
