use clap::{Parser, Subcommand};
use std::time::Duration;
use ui_e2e::poll::{wait_for_absence, wait_for_element};
use ui_e2e::{
    capture_failure, AssistantChat, ChromeDriver, Locator, PollOptions, PollOutcome, SuiteConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive the admin UI and wait for it to settle", long_about = None)]
struct Args {
    /// Application root; relative routes are resolved against it
    #[arg(long, env = "E2E_BASE_URL")]
    base_url: Option<String>,

    /// Run Chrome without a window
    #[arg(long)]
    headless: bool,

    /// Disable the Chrome sandbox (Linux CI)
    #[arg(long)]
    no_sandbox: bool,

    /// Chrome executable to launch instead of the downloaded one
    #[arg(long, env = "E2E_CHROME_PATH")]
    chrome_path: Option<String>,

    /// Attach to Chrome started with --remote-debugging-port
    #[arg(long, env = "E2E_DEBUG_PORT")]
    debug_port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a route and wait until an element is visible
    WaitFor {
        /// Route or absolute URL
        #[arg(long)]
        url: String,
        /// Element id, or css=..., xpath=..., text=<css>|<text>
        #[arg(long)]
        locator: String,
        #[arg(long, default_value_t = 5_000)]
        timeout_ms: u64,
    },
    /// Open a route and wait until an element is gone
    WaitGone {
        #[arg(long)]
        url: String,
        #[arg(long)]
        locator: String,
        #[arg(long, default_value_t = 5_000)]
        timeout_ms: u64,
    },
    /// Ask the assistant something and print its reply
    Ask {
        #[arg(long)]
        url: String,
        #[arg(long)]
        message: String,
        #[arg(long, default_value_t = 120_000)]
        timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut config = SuiteConfig::from_env();
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }
    config.headless |= args.headless;
    config.no_sandbox |= args.no_sandbox;
    if args.chrome_path.is_some() {
        config.chrome_path = args.chrome_path.clone();
    }
    if args.debug_port.is_some() {
        config.debug_port = args.debug_port;
    }

    let code = match run(&config, args.command).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            2
        }
    };
    std::process::exit(code);
}

fn resolve(config: &SuiteConfig, url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        config.url(url)
    }
}

/// `Ok(false)` when the awaited condition never held
async fn run(config: &SuiteConfig, command: Command) -> anyhow::Result<bool> {
    let driver = ChromeDriver::from_config(config).await?;

    let outcome = match command {
        Command::WaitFor {
            url,
            locator,
            timeout_ms,
        } => {
            driver.navigate(&resolve(config, &url)).await?;
            let locator = Locator::parse(&locator);
            let options = config
                .poll_options(format!("{} to appear", locator))
                .with_timeout(Duration::from_millis(timeout_ms));
            wait_for_element(&driver, &locator, &options)
                .await?
                .map(|state| format!("{:?}", state))
        }
        Command::WaitGone {
            url,
            locator,
            timeout_ms,
        } => {
            driver.navigate(&resolve(config, &url)).await?;
            let locator = Locator::parse(&locator);
            let options = config
                .poll_options(format!("{} to disappear", locator))
                .with_timeout(Duration::from_millis(timeout_ms));
            wait_for_absence(&driver, &locator, &options)
                .await?
                .map(|()| "gone".to_string())
        }
        Command::Ask {
            url,
            message,
            timeout_ms,
        } => {
            driver.navigate(&resolve(config, &url)).await?;
            let options = PollOptions::llm_round_trip("assistant reply")
                .with_interval(config.poll_interval)
                .with_timeout(Duration::from_millis(timeout_ms));
            AssistantChat::new(&driver).ask(&message, &options).await?
        }
    };

    let succeeded = match &outcome {
        PollOutcome::Succeeded(value) => {
            println!("{}", value);
            true
        }
        PollOutcome::TimedOut(report) | PollOutcome::RecoveryExhausted(report) => {
            eprintln!("❌ {}", report);
            match capture_failure(&driver, report, &config.artifact_dir).await {
                Ok(record) => eprintln!("   artifacts: {}", record.html_path),
                Err(e) => log::warn!("Could not capture failure artifacts: {}", e),
            }
            false
        }
    };

    driver.close().await?;
    Ok(succeeded)
}
