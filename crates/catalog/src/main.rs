use catalog::setup::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    catalog::run(Cli::parse()).await
}
