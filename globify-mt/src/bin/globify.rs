use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Arg, ArgAction, Command, value_parser};
use globify::JsonStorage;
use globify_mt::{
    AppError, Config, ConfigError, DeeplTranslator, MachineTranslator, MockMode, MockTranslator,
    RunSummary, Runner,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("globify")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Keeps locale files in sync with a base locale using machine translation")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Path to the config file (default: ./globify.config.json)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .short('j')
                .help("Maximum number of translation requests in flight")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .short('m')
                .help("Use the mock translator instead of DeepL")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log every reused and translated entry")
                .action(ArgAction::SetTrue),
        )
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>, concurrency: Option<usize>) -> Result<Config, AppError> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => {
            let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
                path: PathBuf::from("."),
                source,
            })?;
            Config::discover(&cwd)?
        }
    };
    if let Some(concurrency) = concurrency {
        config.concurrency = concurrency;
    }
    Ok(config)
}

fn print_summary(summary: &RunSummary) {
    println!("{} source entries", summary.source_entries);
    for locale in &summary.locales {
        println!(
            "{}: {} translated, {} reused, {} failed",
            locale.locale,
            locale.translated,
            locale.reused,
            locale.failures.len()
        );
        for failure in &locale.failures {
            println!("    {}: {}", failure.path, failure.error);
        }
    }
}

async fn run(use_mock: bool, config: Config) -> Result<RunSummary, AppError> {
    let translator: Arc<dyn MachineTranslator> = if use_mock {
        Arc::new(MockTranslator::new(MockMode::Prefix))
    } else {
        Arc::new(DeeplTranslator::from_env()?)
    };
    let runner = Runner::new(config, translator, Arc::new(JsonStorage::new()))?;
    runner.run().await
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let matches = cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    let config = match load_config(
        matches.get_one::<PathBuf>("config"),
        matches.get_one::<usize>("concurrency").copied(),
    ) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(matches.get_flag("mock"), config).await {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
