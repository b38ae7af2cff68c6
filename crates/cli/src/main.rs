use clap::Parser;
use tracing::error;

use chatyuk_cli::{cli::Cli, logging, repl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(err) = repl::launch(cli).await {
        error!(target = "chatyuk", error = %err, "session failed");
        std::process::exit(1);
    }
}
