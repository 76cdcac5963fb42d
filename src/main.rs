use clap::Parser;
use std::process::ExitCode;

use empathetic::EdError;
use empathetic::cli::{Cli, Command};
use empathetic::commands::{handle_check, handle_dump, handle_show, handle_stats};
use empathetic::config::{load_config, load_config_from, resolve_options};
use empathetic::dataset::default_datapath;

fn run() -> Result<(), EdError> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    let opts = resolve_options(&config, &cli.teacher)?;
    let datapath = cli.datapath.unwrap_or_else(default_datapath);

    match cli.command {
        Command::Stats => handle_stats(&opts, &datapath),
        Command::Dump(args) => handle_dump(&opts, &datapath, &args),
        Command::Show(args) => handle_show(&opts, &datapath, &args),
        Command::Check => handle_check(&opts, &datapath),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("empathetic: {e}");
            ExitCode::from(1)
        }
    }
}
