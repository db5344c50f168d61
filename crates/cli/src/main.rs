mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod output;

use clap::Parser;

use cli::Cli;
use error::CliError;
use output::{OutputFormat, ResultBuilder, print_result};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let format = cli.format;
    let workspace = cli.workspace.clone();

    let coordinator_config = match config::load(workspace.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            handle_error(CliError::Config(err), format);
            std::process::exit(1);
        }
    };

    if let Err(err) = commands::dispatch(cli, coordinator_config).await {
        handle_error(err, format);
        std::process::exit(1);
    }
}

fn handle_error(err: CliError, format: OutputFormat) {
    eprintln!("error: {err}");

    if format != OutputFormat::Text {
        let result: output::CommandResult<()> = ResultBuilder::new("unknown").error(err.code(), err.to_string()).build();
        print_result(&result, format, |_| String::new());
    }
}
