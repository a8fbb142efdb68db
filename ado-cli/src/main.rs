//! ADO CLI - explore Alpine Drought Observatory data from the command line.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "ado-cli",
    version,
    about = "Alpine Drought Observatory data toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: ado_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    ado_cmd::run(cli.command).await
}
