use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

use matbot_webhook::cli::Cli;
use matbot_webhook::prompt::StdinPrompt;
use matbot_webhook::redact::Redacting;
use matbot_webhook::version;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // .env first so clap's env fallbacks and the resolver both see it
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let _guard = init_logging();
    info!("🚀 {}", version::as_text());

    let env = |name: &str| std::env::var(name).ok();
    match cli.run(&env, &mut StdinPrompt).await {
        Ok(out) => {
            println!("{out}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_status())
        }
    }
}

/// Log to stderr and to `$LOG_DIR/matbot-webhook.log`, both through the
/// redacting writer. Stdout is reserved for command output.
fn init_logging() -> Option<WorkerGuard> {
    let log_dir = PathBuf::from(std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()));
    let log_file = std::fs::create_dir_all(&log_dir).and_then(|()| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("matbot-webhook.log"))
    });

    let (file_writer, guard, file_error) = match log_file {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            (Some(non_blocking), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Redacting::new(std::io::stderr))
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .with_writer(Redacting::new(writer))
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                )
        }))
        .init();

    if let Some(e) = file_error {
        warn!("File logging disabled, cannot open {}: {e}", log_dir.display());
    }
    guard
}
