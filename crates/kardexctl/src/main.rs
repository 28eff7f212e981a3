//! kardexctl - classify work orders and answer questions about them

use clap::Parser;
use kardexctl::cli::Cli;
use kardexctl::{commands, errors, logging, output};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    if let Err(err) = commands::run(cli).await {
        output::display_error(&format!("{:#}", err));
        std::process::exit(errors::exit_code_for(&err));
    }
}
