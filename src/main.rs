use std::process;
use std::sync::Arc;

use clap::CommandFactory;
use clap::error::ErrorKind;
use gsprovision::error::{EXIT_SUCCESS, exit_code_for, usage_message};
use gsprovision::executor::RealCommandExecutor;
use gsprovision::fetch::HttpFetcher;
use gsprovision::{cli, init_logging, run, write_completions};
use tracing::error;

fn main() {
    let args = cli::parse_args();

    if let Some(shell) = args.completions {
        write_completions(shell, &mut std::io::stdout());
        return;
    }

    if let Err(e) = init_logging(args.run.log_level) {
        eprintln!("{:#}", e);
        process::exit(1);
    }

    let result = HttpFetcher::new().map_err(anyhow::Error::from).and_then(|fetcher| {
        let executor = Arc::new(RealCommandExecutor {
            dry_run: args.run.dry_run,
        });
        run(&args.run, Arc::new(fetcher), executor)
    });

    match result {
        Ok(()) => process::exit(EXIT_SUCCESS),
        Err(e) => {
            if let Some(message) = usage_message(&e) {
                cli::Cli::command()
                    .error(ErrorKind::ValueValidation, message)
                    .exit();
            }
            error!("{:#}", e);
            process::exit(exit_code_for(&e));
        }
    }
}
