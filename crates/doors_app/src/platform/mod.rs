mod app;
mod cli;
mod effects;
mod persistence;
mod render;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use doors_core::RunStatus;
use doors_engine::{EngineHandle, EngineSettings, WebDriverFactory, WebDriverSettings};
use doors_logging::doors_info;
use log::LevelFilter;

use cli::Cli;
use effects::EffectRunner;

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    doors_logging::initialize(cli.log.into(), LevelFilter::Info);

    match run_cli(&cli) {
        Ok(RunStatus::Failed) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("doors: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: &Cli) -> Result<RunStatus> {
    let request = cli.request_from_env()?;

    let mut config = persistence::load_config(&cli.config);
    if cli.headless {
        config.headless = true;
    }
    if let Some(url) = &cli.webdriver_url {
        config.webdriver_url = url.clone();
    }
    doors_info!(
        "webdriver {} headless={} threshold={}",
        config.webdriver_url,
        config.headless,
        config.account_length_threshold
    );

    let factory = WebDriverFactory::new(WebDriverSettings::from_config(&config));
    let engine = EngineHandle::new(EngineSettings::new(config), Arc::new(factory));
    Ok(app::run_app(EffectRunner::new(engine), request))
}
