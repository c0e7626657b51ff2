use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;
use tracing::{debug, error};
use untrash_restore::{model::RestoreState, settings::Settings};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Initialization error")]
    Initialization,
}

#[tokio::main]
async fn main() {
    let logpath = match get_logging_path() {
        Ok(it) => it,
        Err(_) => return,
    };

    let logfile = tracing_appender::rolling::daily(logpath, "log");
    tracing_subscriber::fmt()
        .compact()
        .with_writer(logfile)
        .init();

    debug!("starting restore");

    let mut settings = Settings::default();
    map_args_to_settings(&cli().get_matches(), &mut settings);

    match untrash_restore::run(settings).await {
        Ok(RestoreState::Success) => {
            debug!("closing with restored batch");
        }
        Ok(state) => {
            error!("closing with unrestored batch: {:?}", state);
            std::process::exit(1);
        }
        Err(err) => {
            error!("closing with error: {:?}", err);
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    }
}

fn cli() -> Command {
    Command::new("untrash")
        .about("untrash - restore trashed files back to their recorded locations")
        .args([
            // NOTE: arguments
            Arg::new("trashinfo")
                .action(ArgAction::Append)
                .num_args(1..)
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("metadata file locations to restore, in order"),
            // NOTE: options
            Arg::new("trash-root")
                .long("trash-root")
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("use the given directories as enabled trash roots instead of the defaults"),
            Arg::new("base-path")
                .long("base-path")
                .action(ArgAction::Set)
                .value_parser(value_parser!(PathBuf))
                .help("hand file operations paths relative to this base"),
        ])
}

fn map_args_to_settings(args: &ArgMatches, settings: &mut Settings) {
    settings.items = args
        .get_many::<PathBuf>("trashinfo")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    settings.trash_roots = args
        .get_many::<PathBuf>("trash-root")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    settings.base_path = args.get_one::<PathBuf>("base-path").cloned();
}

fn get_logging_path() -> Result<String, Error> {
    let cache_dir = match dirs::cache_dir() {
        Some(cache_dir) => match cache_dir.to_str() {
            Some(cache_dir_string) => cache_dir_string.to_string(),
            None => return Err(Error::Initialization),
        },
        None => return Err(Error::Initialization),
    };

    Ok(format!("{}{}", cache_dir, "/untrash/logs"))
}
