use crate::cli::{BuildArgs, Cli, Commands, DeployArgs, ProjectArgs};
use crate::config::{read_config, ConfigOverrides, PROFILE_ENV};
use crate::templates;
use lambda_control::{
    AwsProvider, CodeDelivery, ConcurrencyAction, DeployAction, DeployOptions, DeployOutcome,
    Deployer, PruneReport,
};
use lambda_invoker::{invoke, InvocationResult, InvokeOptions, PythonHandlerLoader};
use lambda_models::{BuildArtifact, LambdaError, ProjectConfig};
use lambda_packaging::{build_package, BuildOptions, InstallMode, PackageManager, PipPackageManager};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// Settings that apply to every command.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub python: String,
    pub verbose: bool,
}

impl From<&Cli> for GlobalOptions {
    fn from(cli: &Cli) -> Self {
        Self {
            python: cli.python.clone(),
            verbose: cli.verbose,
        }
    }
}

pub async fn run(cli: Cli) -> Result<(), LambdaError> {
    let globals = GlobalOptions::from(&cli);
    match cli.command {
        Commands::Init { folder, minimal } => {
            for path in templates::init(&folder, minimal)? {
                println!("📄 Created {}", path.display());
            }
            Ok(())
        }
        Commands::Build(args) => {
            let (_, artifact) = build(&args, &globals).await?;
            println!("📦 Built {} ({} bytes)", artifact.path.display(), artifact.size);
            Ok(())
        }
        Commands::Deploy(args) => deploy(&args, CodeDelivery::Inline, &globals).await,
        Commands::DeployS3(args) => deploy(&args, CodeDelivery::ObjectStorage, &globals).await,
        Commands::Upload(args) => upload(&args, &globals).await,
        Commands::Invoke {
            project,
            event_file,
        } => run_invoke(&project, &event_file, &globals).await,
        Commands::Cleanup { project, keep_last } => cleanup(&project, keep_last).await,
    }
}

fn load_config(project: &ProjectArgs) -> Result<ProjectConfig, LambdaError> {
    let overrides = ConfigOverrides::from_env(project.profile.as_deref());
    read_config(&project.src, &project.config_file, &overrides)
}

pub fn build_options(args: &BuildArgs) -> BuildOptions {
    let mode = match &args.requirements {
        Some(path) => InstallMode::Requirements(path.clone()),
        None => InstallMode::Freeze,
    };
    BuildOptions {
        mode,
        local_packages: args.local_packages.clone(),
        config_file_name: args.project.config_file.clone(),
        output_filename: None,
    }
}

/// Read the project config and build its artifact with the given package
/// manager.
pub async fn build_with(
    args: &BuildArgs,
    package_manager: &dyn PackageManager,
) -> Result<(ProjectConfig, BuildArtifact), LambdaError> {
    let config = load_config(&args.project)?;
    let artifact =
        build_package(&config, &args.project.src, &build_options(args), package_manager).await?;
    Ok((config, artifact))
}

async fn build(
    args: &BuildArgs,
    globals: &GlobalOptions,
) -> Result<(ProjectConfig, BuildArtifact), LambdaError> {
    build_with(args, &PipPackageManager::new(&globals.python)).await
}

/// Clients for the config's credentials. A config without a region takes
/// the one the SDK resolved so role ARNs get the right partition.
async fn connect(config: &mut ProjectConfig) -> AwsProvider {
    let provider = AwsProvider::from_config(config).await;
    if config.region.is_none() {
        config.region = provider.region().map(str::to_string);
        debug!("Using region {:?} from the AWS environment", config.region);
    }
    provider
}

#[instrument(skip_all, fields(delivery = ?delivery))]
async fn deploy(
    args: &DeployArgs,
    delivery: CodeDelivery,
    globals: &GlobalOptions,
) -> Result<(), LambdaError> {
    let (mut config, artifact) = build(&args.build, globals).await?;
    let provider = connect(&mut config).await;

    let outcome = Deployer::new(&provider, &provider, &provider)
        .deploy(
            &config,
            &artifact,
            delivery,
            DeployOptions {
                preserve_vpc: args.preserve_vpc,
            },
        )
        .await?;

    print!("{}", render_outcome(&outcome));
    Ok(())
}

async fn upload(args: &BuildArgs, globals: &GlobalOptions) -> Result<(), LambdaError> {
    let (mut config, artifact) = build(args, globals).await?;
    let provider = connect(&mut config).await;
    let key = Deployer::new(&provider, &provider, &provider)
        .upload(&config, &artifact)
        .await?;
    println!("☁️  Uploaded s3://{}/{}", config.bucket()?, key);
    Ok(())
}

/// Run the handler with the project's resolved environment. The handler
/// process gets `AWS_PROFILE` when a profile is configured.
async fn run_invoke(
    project: &ProjectArgs,
    event_file: &Path,
    globals: &GlobalOptions,
) -> Result<(), LambdaError> {
    let config = load_config(project)?;

    let mut environment = config
        .resolved_environment()
        .map(|env| env.variables)
        .unwrap_or_default();
    if let Some(profile) = &config.profile {
        environment.insert(PROFILE_ENV.to_string(), profile.clone());
    }
    let loader = PythonHandlerLoader::new(&globals.python).with_environment(environment);

    let options = InvokeOptions {
        function_name: config.function_name.clone(),
        timeout: Duration::from_secs(u64::from(config.timeout_seconds)),
        memory_mb: config.memory_mb,
    };
    let event_path = resolve_event_path(&project.src, event_file);

    let outcome = invoke(&project.src, &config.handler, &event_path, &options, &loader).await?;
    print!("{}", render_invocation(&outcome, &options, globals.verbose)?);
    Ok(())
}

async fn cleanup(project: &ProjectArgs, keep_last: i64) -> Result<(), LambdaError> {
    let mut config = load_config(project)?;
    let provider = connect(&mut config).await;
    let report = Deployer::new(&provider, &provider, &provider)
        .cleanup(&config, keep_last)
        .await?;
    print!("{}", render_prune_report(&config.function_name, &report));
    Ok(())
}

/// Relative event paths are looked up inside the project directory.
pub fn resolve_event_path(project_dir: &Path, event_file: &Path) -> PathBuf {
    if event_file.is_absolute() {
        event_file.to_path_buf()
    } else {
        project_dir.join(event_file)
    }
}

pub fn render_outcome(outcome: &DeployOutcome) -> String {
    let mut out = String::new();
    let verb = match outcome.action {
        DeployAction::Created => "Created",
        DeployAction::Updated => "Updated",
    };
    out.push_str(&format!("✅ {} function {}\n", verb, outcome.function_name));
    out.push_str(&format!("   ARN: {}\n", outcome.function_arn));
    if let Some(version) = &outcome.version {
        out.push_str(&format!("   Version: {}\n", version));
    }
    if let Some(key) = &outcome.object_key {
        out.push_str(&format!("   Code: {}\n", key));
    }
    match outcome.concurrency {
        ConcurrencyAction::Unchanged => {}
        ConcurrencyAction::Set(n) => {
            out.push_str(&format!("   Reserved concurrency: {}\n", n));
        }
        ConcurrencyAction::Deleted => out.push_str("   Reserved concurrency: removed\n"),
    }
    if !outcome.tags.removed.is_empty() {
        out.push_str(&format!("   Tags removed: {}\n", outcome.tags.removed.join(", ")));
    }
    if !outcome.tags.applied.is_empty() {
        let applied: Vec<String> = outcome
            .tags
            .applied
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        out.push_str(&format!("   Tags: {}\n", applied.join(", ")));
    }
    out
}

pub fn render_invocation(
    outcome: &InvocationResult,
    options: &InvokeOptions,
    verbose: bool,
) -> Result<String, LambdaError> {
    let mut out = serde_json::to_string_pretty(&outcome.result).map_err(LambdaError::internal)?;
    out.push('\n');
    if verbose {
        out.push_str(&format!(
            "\nexecution time: {:.6}s\nfunction execution timeout: {}s\n",
            outcome.elapsed.as_secs_f64(),
            options.timeout.as_secs()
        ));
    }
    Ok(out)
}

pub fn render_prune_report(function_name: &str, report: &PruneReport) -> String {
    let mut out = String::new();
    for version in &report.deleted {
        out.push_str(&format!("🗑️  Deleted version {} of {}\n", version, function_name));
    }
    for (version, reason) in &report.skipped {
        out.push_str(&format!("⚠️  Skipped version {}: {}\n", version, reason));
    }
    if report.deleted.is_empty() && report.skipped.is_empty() {
        out.push_str(&format!("Nothing to delete for {}\n", function_name));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_control::TagChanges;
    use std::collections::BTreeMap;

    fn outcome() -> DeployOutcome {
        DeployOutcome {
            action: DeployAction::Updated,
            function_name: "orders".into(),
            function_arn: "arn:aws:lambda:us-east-1:123456789012:function:orders".into(),
            version: Some("7".into()),
            object_key: None,
            concurrency: ConcurrencyAction::Deleted,
            tags: TagChanges {
                removed: vec!["old".into()],
                applied: BTreeMap::from([("team".to_string(), "data".to_string())]),
            },
        }
    }

    #[test]
    fn renders_update_outcome() {
        let text = render_outcome(&outcome());
        assert!(text.starts_with("✅ Updated function orders\n"));
        assert!(text.contains("Version: 7"));
        assert!(text.contains("Reserved concurrency: removed"));
        assert!(text.contains("Tags removed: old"));
        assert!(text.contains("Tags: team=data"));
        assert!(!text.contains("Code:"));
    }

    #[test]
    fn verbose_invocation_reports_timing() {
        let result = InvocationResult {
            result: serde_json::json!(5.858),
            elapsed: Duration::from_millis(12),
        };
        let options = InvokeOptions {
            function_name: "orders".into(),
            timeout: Duration::from_secs(15),
            memory_mb: 512,
        };
        assert_eq!(render_invocation(&result, &options, false).unwrap(), "5.858\n");
        let verbose = render_invocation(&result, &options, true).unwrap();
        assert!(verbose.contains("execution time: 0.012000s"));
        assert!(verbose.contains("function execution timeout: 15s"));
    }

    #[test]
    fn empty_prune_report() {
        assert_eq!(
            render_prune_report("orders", &PruneReport::default()),
            "Nothing to delete for orders\n"
        );
    }

    #[test]
    fn event_paths_resolve_against_project() {
        assert_eq!(
            resolve_event_path(Path::new("svc"), Path::new("event.json")),
            PathBuf::from("svc/event.json")
        );
        assert_eq!(
            resolve_event_path(Path::new("svc"), Path::new("/tmp/e.json")),
            PathBuf::from("/tmp/e.json")
        );
    }

    #[test]
    fn requirements_flag_selects_explicit_mode() {
        let args = BuildArgs {
            project: ProjectArgs {
                src: PathBuf::from("."),
                config_file: "config.yaml".into(),
                profile: None,
            },
            requirements: Some(PathBuf::from("requirements.txt")),
            local_packages: vec!["../shared".into()],
        };
        let options = build_options(&args);
        assert_eq!(
            options.mode,
            InstallMode::Requirements(PathBuf::from("requirements.txt"))
        );
        assert_eq!(options.local_packages, vec!["../shared"]);
    }
}
