use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dompilot::agent::{Agent, AgentStatus};
use dompilot::config::Config;
use dompilot::errors::ActionError;
use dompilot::executors::navigate::navigate;
use dompilot::gateway::ActionGateway;
use dompilot::page::PageDriver;
use dompilot::planner::{ScriptedPlanner, parse_action};
use dompilot::session::GLOBAL_SESSIONS;
use dompilot::snapshot::annotate;
use dompilot::tracker::ActionStateTracker;
use dompilot::webdriver::{Browser, BrowserType};

const EXIT_SUCCESS: i32 = 0;
const EXIT_COMMAND_ERROR: i32 = 1;

#[derive(Parser)]
#[command(name = "dompilot")]
#[command(about = "Execute LLM-planned actions against a live browser page", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to <config_dir>/dompilot/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Browser to drive (firefox or chrome)
    #[arg(short, long, global = true)]
    browser: Option<String>,

    /// Run the browser headless
    #[arg(long, global = true, overrides_with = "no_headless")]
    headless: bool,

    /// Run the browser in visible mode
    #[arg(long = "no-headless", global = true)]
    no_headless: bool,

    /// WebDriver endpoint (defaults to the browser's standard port)
    #[arg(long, global = true)]
    webdriver_url: Option<String>,

    /// Window size (WIDTHxHEIGHT, e.g., 1280x800)
    #[arg(long, global = true)]
    viewport: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a page and print its annotated snapshot
    Snapshot {
        /// URL to open
        url: String,
    },

    /// Open a page and perform one action expression, e.g. 'click(7)'
    Act {
        /// URL to open
        url: String,

        /// Action call expression
        expr: String,
    },

    /// Run the agent loop with canned planner replies
    Run {
        /// URL to start from
        url: String,

        /// Task handed to the planner
        task: String,

        /// File of planner replies separated by lines of '---'
        #[arg(long)]
        responses: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            let exit_code = err
                .downcast_ref::<ActionError>()
                .map(ActionError::exit_code)
                .unwrap_or(EXIT_COMMAND_ERROR);

            // JSON on stdout for callers, human text on stderr
            let error_json = json!({
                "error": true,
                "message": format!("{err:#}"),
                "exit_code": exit_code
            });
            println!(
                "{}",
                serde_json::to_string(&error_json).unwrap_or_else(|_| "{}".to_string())
            );
            eprintln!("Error: {err:#}");
            std::process::exit(exit_code);
        }
    }
}

async fn run() -> Result<i32> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dompilot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let browser = Arc::new(
        Browser::connect(
            config.browser,
            &config.webdriver_url(),
            config.viewport_size()?,
            config.headless,
        )
        .await?,
    );
    let page_load = std::time::Duration::from_secs(config.navigation.timeout_secs);
    if let Err(e) = browser.set_page_load_timeout(page_load).await {
        warn!("{:#}", e);
    }

    let result = execute(cli.command, Arc::clone(&browser), config).await;

    GLOBAL_SESSIONS.close(browser.tab_id());
    if let Err(e) = browser.close().await {
        warn!("Failed to close browser session: {}", e);
    }
    result
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(browser) = &cli.browser {
        config.browser = browser.parse::<BrowserType>()?;
    }
    if cli.headless {
        config.headless = true;
    }
    if cli.no_headless {
        config.headless = false;
    }
    if let Some(url) = &cli.webdriver_url {
        config.webdriver_url = Some(url.clone());
    }
    if let Some(viewport) = &cli.viewport {
        config.viewport = Some(viewport.clone());
    }
    Ok(config)
}

async fn execute(command: Commands, browser: Arc<Browser>, config: Config) -> Result<i32> {
    let page: Arc<dyn PageDriver> = browser;
    let gateway = ActionGateway::new(Arc::clone(&page), config.clone())
        .with_tracker(Arc::new(ActionStateTracker::new(config.tracker_history)));

    match command {
        Commands::Snapshot { url } => {
            navigate(&config.navigation, page.as_ref(), gateway.session(), &url).await?;
            let snapshot = annotate(page.as_ref()).await.map_err(ActionError::from)?;
            println!("{}", snapshot.text);
            Ok(EXIT_SUCCESS)
        }

        Commands::Act { url, expr } => {
            let action = parse_action(&expr).context("Invalid action expression")?;
            let request = action
                .into_request()
                .with_context(|| format!("'{expr}' is not an executable action"))?;

            navigate(&config.navigation, page.as_ref(), gateway.session(), &url).await?;
            annotate(page.as_ref()).await.map_err(ActionError::from)?;

            let result = gateway.perform(request).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(if result.success {
                EXIT_SUCCESS
            } else {
                EXIT_COMMAND_ERROR
            })
        }

        Commands::Run {
            url,
            task,
            responses,
        } => {
            let planner = Arc::new(ScriptedPlanner::from_file(&responses)?);
            navigate(&config.navigation, page.as_ref(), gateway.session(), &url).await?;

            let agent = Agent::new(gateway, planner, config.agent.clone());
            let run = agent.run(&task).await;
            info!(status = ?run.status, steps = run.steps.len(), "Agent run finished");
            println!("{}", serde_json::to_string_pretty(&run)?);
            Ok(match run.status {
                AgentStatus::Completed | AgentStatus::Responded { .. } => EXIT_SUCCESS,
                _ => EXIT_COMMAND_ERROR,
            })
        }
    }
}
