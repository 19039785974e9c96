#[cfg(not(feature = "cli"))]
compile_error!("The `ibd-usage` binary requires the `cli` feature. Build with `--features cli`.");

use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::process;

use ibd_usage::cli;
use ibd_usage::cli::app::{Cli, ColorMode, Commands};
use ibd_usage::UsageError;

fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {} // colored auto-detects tty
    }

    let writer_result: Result<Box<dyn Write>, UsageError> = match &cli.output {
        Some(path) => File::create(path)
            .map(|f| Box::new(f) as Box<dyn Write>)
            .map_err(|e| UsageError::FileOpen {
                path: path.clone(),
                source: e,
            }),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Usage {
            path,
            io_wait_threshold,
            io_ops_limit,
            exclude,
        } => cli::usage::execute(
            &cli::usage::UsageOptions {
                path,
                io_wait_threshold,
                io_ops_limit,
                exclude,
                parallel: cli.parallel,
            },
            &mut writer,
        ),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "ibd-usage", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
