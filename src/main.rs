use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;
use log::info;
use tokio::io::BufReader;

mod api;
mod config;
mod event_bus;
mod logger;
mod models;
mod ui;
mod views;
mod wizard;

use api::HttpCoachApi;
use config::Config;
use event_bus::{EventBus, EventEmitter};
use models::FormAnswers;
use ui::{TerminalUI, UIOptions};
use wizard::Wizard;

#[derive(Parser)]
#[command(name = "life_coach", version, about = "Three questions, a few problems, concrete advice")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<String>,
    /// Base URL of the coaching service
    #[arg(long)]
    api_url: Option<String>,
    /// Answer to "Jak se dnes cítíš?"
    #[arg(long)]
    feeling: Option<String>,
    /// Answer to "Co tě v poslední době trápí?"
    #[arg(long)]
    troubles: Option<String>,
    /// Answer to "Co bys chtěl/a změnit?"
    #[arg(long)]
    changes: Option<String>,
    /// Run without prompts; requires all three answers
    #[arg(long)]
    headless: bool,
    /// Query the service health endpoint and exit
    #[arg(long)]
    health_check: bool,
    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
    /// Debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn answers(&self) -> FormAnswers {
        FormAnswers::new(
            self.feeling.clone().unwrap_or_default(),
            self.troubles.clone().unwrap_or_default(),
            self.changes.clone().unwrap_or_default(),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logger::init(args.verbose, args.debug);

    let mut config = Config::load(&args.config)?;
    config.apply_env();
    config.merge_with_args(args.api_url.as_deref(), args.headless);
    colored::control::set_override(config.ui.colorful && io::stdout().is_terminal());
    info!("Using coaching service at {}", config.api.base_url);

    let api = HttpCoachApi::new(config.api.base_url.clone());

    if args.health_check {
        let status = api.health().await?;
        println!("{}: {}", api.base_url(), status);
        return Ok(());
    }

    let bus = Arc::new(EventBus::new(100));
    let mut wizard = Wizard::new(api);
    wizard.set_event_bus(bus.clone());

    let interactive = !args.headless && io::stdout().is_terminal();
    let options = UIOptions {
        clear_screen: interactive,
        spinner: config.ui.progress_bars && !args.headless,
        summary: !args.headless,
    };
    let mut ui = TerminalUI::new(BufReader::new(tokio::io::stdin()), io::stdout(), options, bus);

    let answers = args.answers();
    if args.headless {
        if !answers.is_complete() {
            bail!("--headless requires --feeling, --troubles and --changes");
        }
        ui.run_headless(&mut wizard, &answers, config.ui.output_format)
            .await
    } else {
        ui.run(&mut wizard, answers).await
    }
}
