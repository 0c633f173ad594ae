use clap::Parser;
use lambda_deploy::{commands, Cli};
use lambda_models::LambdaError;
use lambda_telemetry::TracingService;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    TracingService::init(cli.log_format.into(), cli.verbose)
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    if let Err(e) = commands::run(cli).await {
        TracingService::log_error("command", &e);
        if let LambdaError::HandlerExecutionError(shape) = &e {
            println!("{}", serde_json::to_string_pretty(shape)?);
        } else {
            eprintln!("❌ {}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}
