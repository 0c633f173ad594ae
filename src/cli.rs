use crate::config::DEFAULT_CONFIG_FILE;
use clap::{Args, Parser, Subcommand, ValueEnum};
use lambda_telemetry::LogFormat;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lambda")]
#[command(about = "Package, deploy and locally invoke Python AWS Lambda functions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Python interpreter used for pip and local invocation
    #[arg(long, global = true, env = "LAMBDA_PYTHON", default_value = "python3")]
    pub python: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new function project from the starter templates
    Init {
        /// Folder to initialise
        #[arg(default_value = ".")]
        folder: PathBuf,

        /// Skip the sample event file
        #[arg(long)]
        minimal: bool,
    },

    /// Bundle the project and its dependencies into a zip in the dist directory
    Build(BuildArgs),

    /// Build and deploy, sending the zip inline
    Deploy(DeployArgs),

    /// Build and deploy, staging the zip in S3 first
    #[command(name = "deploy-s3")]
    DeployS3(DeployArgs),

    /// Build and upload the zip to S3 without deploying
    Upload(BuildArgs),

    /// Run the handler locally with an event file
    Invoke {
        #[command(flatten)]
        project: ProjectArgs,

        /// JSON event passed to the handler
        #[arg(long, default_value = "event.json")]
        event_file: PathBuf,
    },

    /// Delete old published versions of the function
    Cleanup {
        #[command(flatten)]
        project: ProjectArgs,

        /// Number of most recent versions to keep
        #[arg(long)]
        keep_last: i64,
    },
}

/// Arguments shared by every command that reads a project.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project directory
    #[arg(default_value = ".")]
    pub src: PathBuf,

    /// Config file name inside the project directory
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: String,

    /// AWS profile; overrides AWS_PROFILE and the config file
    #[arg(long)]
    pub profile: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Install from this requirements file instead of the current environment
    #[arg(long)]
    pub requirements: Option<PathBuf>,

    /// Local package to install alongside the requirements (repeatable)
    #[arg(long = "local-package")]
    pub local_packages: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Keep the function's current VPC settings instead of the configured ones
    #[arg(long)]
    pub preserve_vpc: bool,
}
