//! E2E test harness entry point
//!
//! This file is the test binary that runs the YAML scenarios against a live
//! PAM instance. Without chromedriver or a reachable PAM it logs why and
//! exits successfully.
//! Run with: cargo test --package pam-e2e --test e2e

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use pam_e2e::driver::{driver_available, DriverConfig};
use pam_e2e::runner::{final_wait_from_secs, ExecutionConfig, RunnerConfig, SuiteResult};
use pam_e2e::webdriver::BrowserOptions;
use pam_e2e::{E2eResult, Settle, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "pam-e2e")]
#[command(about = "E2E test runner for PAM")]
struct Args {
    /// Path to scenarios directory
    #[arg(short, long, default_value = "scenarios")]
    scenarios: PathBuf,

    /// Run only scenarios matching this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific scenario by name
    #[arg(short, long)]
    name: Option<String>,

    /// URL of the PAM instance under test
    #[arg(long, env = "PAM_URL", default_value = pam_e2e::pam::DEFAULT_URL)]
    url: String,

    /// Path to the chromedriver binary
    #[arg(long, env = "CHROMEDRIVER", default_value = "chromedriver")]
    chromedriver: PathBuf,

    /// Use an already running WebDriver endpoint instead of spawning chromedriver
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Seconds to wait after the last step of each scenario
    #[arg(long = "final-timeout", env = "FT", default_value = "0.25")]
    final_timeout: f64,

    /// Launch the browser without the headless option set (also on when
    /// NO_OPTIONS is set to anything)
    #[arg(long)]
    no_options: bool,

    /// Poll for UI transitions instead of sleeping a fixed delay
    #[arg(long)]
    poll: bool,

    /// Pass chromedriver logs through
    #[arg(long)]
    verbose_driver: bool,

    /// Output directory for results
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();

    // Run async main
    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(async_main(args));

    match result {
        Ok(success) => {
            if success {
                std::process::exit(0);
            } else {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn pam_reachable(url: &str) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
    {
        Ok(client) => client,
        Err(_) => return false,
    };
    client.get(url).send().await.is_ok()
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let final_wait = final_wait_from_secs(args.final_timeout)?;

    if args.webdriver_url.is_none() && !driver_available(&args.chromedriver) {
        warn!(
            "Skipping: {} not available (set CHROMEDRIVER or --webdriver-url)",
            args.chromedriver.display()
        );
        return Ok(true);
    }
    if !pam_reachable(&args.url).await {
        warn!("Skipping: PAM is not reachable at {} (set PAM_URL)", args.url);
        return Ok(true);
    }

    let settle = if args.poll {
        Settle::poll()
    } else {
        Settle::default()
    };

    let browser = BrowserOptions::from_env();

    let config = RunnerConfig {
        driver: DriverConfig {
            binary_path: args.chromedriver,
            verbose: args.verbose_driver,
            ..Default::default()
        },
        webdriver_url: args.webdriver_url,
        browser: BrowserOptions {
            headless: browser.headless && !args.no_options,
            ..browser
        },
        execution: ExecutionConfig {
            base_url: args.url,
            settle,
            final_wait,
        },
        scenarios_dir: args.scenarios,
        output_dir: args.output,
    };

    let mut runner = TestRunner::with_config(config);

    // Start chromedriver
    runner.start_driver().await?;

    // Run scenarios
    let results = if let Some(name) = args.name {
        let result = runner.run_named(&name).await?;
        SuiteResult {
            total: 1,
            passed: if result.success { 1 } else { 0 },
            failed: if result.success { 0 } else { 1 },
            skipped: 0,
            duration_ms: result.duration_ms,
            results: vec![result],
        }
    } else if let Some(tag) = args.tag {
        runner.run_tagged(&tag).await?
    } else {
        runner.run_all().await?
    };

    // Write results
    runner.write_results(&results)?;

    Ok(results.all_passed())
}
