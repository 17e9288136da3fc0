use http_echo::config::{ConfigError, Startup};
use http_echo::error::{Error, EXIT_CONFIG, EXIT_INTERRUPTED, EXIT_VERSION};
use http_echo::server::{self, ShutdownOutcome};
use http_echo::version::human_version;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Startup::from_env() {
        Ok(Startup::Version) => {
            println!("{}", human_version());
            return ExitCode::from(EXIT_VERSION);
        }
        Ok(Startup::Serve(config)) => config,
        // clap renders usage/help itself and picks its own exit code
        Err(ConfigError::Usage(e)) => e.exit(),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match server::run(&config).await {
        Ok(outcome) => {
            if outcome == ShutdownOutcome::TimedOut {
                info!("forced close of remaining connections");
            }
            // Only a signal gets us here; never report a clean exit
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e @ Error::Listener(_)) => {
            eprintln!("{}", e);
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            error!(error = %e, "fatal server error");
            ExitCode::from(e.exit_code())
        }
    }
}
