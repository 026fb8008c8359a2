use clap::Parser;
use codeartifact_fetch::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let logger = cli.logger();
    if let Err(err) = cli::run(cli).await {
        logger.error(&err.to_string());
        std::process::exit(1);
    }
}
