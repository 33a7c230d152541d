/// Botchat - terminal client for the chatbot platform
use botchat_core::{cli_app, Config};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Quiet by default so log lines don't interleave with the chat
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn"))
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let result = match Config::from_args(&args) {
        Ok((config, rest)) => cli_app::run(rest, config).await,
        Err(e) => Err(anyhow::anyhow!("Configuration error: {}", e)),
    };

    if let Err(e) = result {
        cli_app::report(&e);
        std::process::exit(1);
    }
}
