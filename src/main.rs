use clap::Parser;
use tasker::cli::commands::{Cli, Commands};
use tasker::cli::handlers::{self, Context};
use tasker::logging;

fn main() {
    let cli = Cli::parse();

    let ctx = match Context::resolve(cli.data_dir.as_deref(), cli.json) {
        Ok(ctx) => ctx,
        Err(e) => {
            logging::init_stderr("warn");
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    // The play screen owns the terminal, so its logs go to a file.
    let level = ctx.config.log.level.clone();
    match cli.command {
        None | Some(Commands::Play(_)) => {
            if let Err(e) = ctx.ensure_data_dir() {
                logging::init_stderr(&level);
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
            logging::init_file(&level, &ctx.log_path());
        }
        Some(_) => logging::init_stderr(&level),
    }

    if let Err(e) = handlers::dispatch(cli.command, &ctx) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
