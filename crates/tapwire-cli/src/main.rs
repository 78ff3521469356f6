//! tapwire — remote input-injection agent.
//!
//! Speaks the line protocol on stdin/stdout; logs go to stderr so they never
//! mix with responses.

use std::path::PathBuf;

use clap::Parser;

use tapwire_agent::{load_config, AgentContext, Dispatcher};

#[derive(Parser)]
#[command(
    name = "tapwire",
    about = "Inject synthetic touch, mouse and keyboard input over a line protocol",
    version
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Touch device spec: virtual[:WxH], file:<path> or disabled.
    #[arg(long)]
    touch: Option<String>,

    /// Mouse device spec: virtual[:abs|rel], file:<path> or disabled.
    #[arg(long)]
    mouse: Option<String>,

    /// Keyboard device spec: virtual, file:<path> or disabled.
    #[arg(long)]
    keyboard: Option<String>,

    /// Run as a privilege-bridge sub-agent.
    #[arg(long)]
    sub_agent: bool,

    /// Log at debug level.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(spec) = cli.touch {
        config.devices.touch = spec;
    }
    if let Some(spec) = cli.mouse {
        config.devices.mouse = spec;
    }
    if let Some(spec) = cli.keyboard {
        config.devices.keyboard = spec;
    }

    let default_filter = if cli.debug {
        "debug".to_string()
    } else {
        config.agent.log_level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(sub_agent = cli.sub_agent, "tapwire agent starting");

    let mut ctx = AgentContext::new(config);
    ctx.open_devices()?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    Dispatcher::new(ctx).run(stdin, stdout).await?;
    Ok(())
}
