use clap::Parser;
use qarag_server::{PipelineConfig, ServerOptions, run_server};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

/// QA test case and Selenium script generation service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file overriding the built-in pipeline settings
    #[arg(short, long, env = "QARAG_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8000", env = "QARAG_BIND")]
    bind: SocketAddr,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = PipelineConfig::load(args.config.as_deref())?;

    run_server(ServerOptions {
        bind: args.bind,
        api_key: args.api_key,
        config,
    })
    .await
}
