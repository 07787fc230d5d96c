use clap::Parser as _;
use gaffer_mcp::config::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    gaffer_mcp::logging::init(&cli.log_level, cli.log_format)?;
    let config = cli.server_config()?;
    gaffer_mcp::serve_stdio(config).await?;
    Ok(())
}
