use clap::Parser;

use chat_relay::config::resolve_path;
use chat_relay::RunOptions;

#[derive(Parser, Debug)]
#[command(name = "chat-relay", version, about = "Relay chat conversations to Groq, Gemini or OpenAI")]
struct Cli {
    /// Path to the YAML config file (created with defaults if missing)
    #[arg(short, long)]
    config: Option<String>,

    /// Address to bind, overrides the config file
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overrides the config file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chat_relay::init_tracing();

    let cli = Cli::parse();
    let options = RunOptions {
        config_path: cli.config.as_deref().map(resolve_path),
        host: cli.host,
        port: cli.port,
    };

    chat_relay::run(options).await
}
