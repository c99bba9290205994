//! pagecheck CLI - Main Entry Point
//!
//! Runs layout and dark-theme check suites against rendered pages.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};

use pagecheck_core::playwright::{Browser, PlaywrightConfig, PlaywrightLauncher};
use pagecheck_core::runner::CheckOutcome;
use pagecheck_core::{
    BrowserLauncher, CheckRunner, CheckSpec, CheckSuite, DarkSchemeConfig, Diagnostic, RunnerConfig,
    Viewport,
};

mod output;

/// pagecheck - layout and dark-theme regression checks
#[derive(Parser)]
#[command(name = "pagecheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    browser: BrowserArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BrowserArgs {
    /// Browser engine driven by Playwright
    #[arg(long, default_value = "chromium", global = true)]
    browser: BrowserArg,

    /// Directory holding node_modules/playwright
    #[arg(long, env = "NODE_PATH", global = true)]
    node_path: Option<PathBuf>,

    /// Wait before dark-mode screenshots
    #[arg(long, default_value = "2000", global = true)]
    settle_ms: u64,

    /// Directory holding canonical images and receiving screenshots
    #[arg(long, default_value = ".", global = true)]
    work_dir: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum BrowserArg {
    Chromium,
    Firefox,
    Webkit,
}

#[derive(Subcommand)]
enum Commands {
    /// Run check suites from YAML files
    Run {
        /// Suite file or directory of suites
        #[arg(short, long, default_value = "checks")]
        suite: PathBuf,

        /// Run only suites matching this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Output directory for results
        #[arg(short, long, default_value = "test-results")]
        output: PathBuf,
    },

    /// Run one check against a URL
    Check {
        /// color_scheme, switch_scheme, block_full_screen, semantic_tags,
        /// reset_margins or background_fixed
        name: String,

        #[arg(long)]
        url: String,

        /// Selector for block_full_screen and background_fixed
        #[arg(long)]
        selector: Option<String>,

        /// Comma-separated selectors for semantic_tags and reset_margins
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// List diagnostic ids
    Ids,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(cli)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(cli: Cli) -> anyhow::Result<bool> {
    let launcher: Arc<dyn BrowserLauncher> = Arc::new(PlaywrightLauncher::new(PlaywrightConfig {
        browser: match cli.browser.browser {
            BrowserArg::Chromium => Browser::Chromium,
            BrowserArg::Firefox => Browser::Firefox,
            BrowserArg::Webkit => Browser::Webkit,
        },
        node_path: cli.browser.node_path.clone(),
        ..Default::default()
    }));

    let dark_scheme = dark_scheme_config(&cli.browser);

    match cli.command {
        Commands::Run { suite, tag, output } => {
            let mut suites = if suite.is_dir() {
                CheckSuite::load_all(&suite)?
            } else {
                vec![CheckSuite::from_file(&suite)?]
            };
            if let Some(tag) = tag {
                suites.retain(|s| s.tags.contains(&tag));
            }
            if suites.is_empty() {
                bail!("no suites found in {}", suite.display());
            }

            let runner = CheckRunner::new(
                launcher,
                RunnerConfig {
                    dark_scheme,
                    output_dir: output,
                },
            );
            let reports = runner.run_suites(&suites).await;
            runner.write_results(&reports)?;
            output::print_reports(&reports, cli.format);

            verdict(reports.iter().flat_map(|r| r.results.iter()))
        }
        Commands::Check {
            name,
            url,
            selector,
            tags,
        } => {
            let check = parse_check(&name, selector, tags)?;
            let outcome = run_single(launcher, dark_scheme, &url, &check).await;
            output::print_list(std::slice::from_ref(&outcome), cli.format);
            verdict([&outcome])
        }
        Commands::Ids => {
            for id in Diagnostic::IDS {
                println!("{}", id);
            }
            Ok(true)
        }
    }
}

/// Resolve the dark-scheme image paths against the work directory
fn dark_scheme_config(args: &BrowserArgs) -> DarkSchemeConfig {
    let defaults = DarkSchemeConfig::default();
    let dir = &args.work_dir;
    DarkSchemeConfig {
        settle_delay: Duration::from_millis(args.settle_ms),
        palette_image: dir.join(&defaults.palette_image),
        canonical_palette_image: dir.join(&defaults.canonical_palette_image),
        layout_image: dir.join(&defaults.layout_image),
        canonical_layout_image: dir.join(&defaults.canonical_layout_image),
        layout_output_image: dir.join(&defaults.layout_output_image),
        ..defaults
    }
}

fn parse_check(name: &str, selector: Option<String>, tags: Vec<String>) -> anyhow::Result<CheckSpec> {
    let need_selector = || selector.clone().context(format!("{} needs --selector", name));
    let need_tags = || -> anyhow::Result<Vec<String>> {
        if tags.is_empty() {
            bail!("{} needs --tags", name);
        }
        Ok(tags.clone())
    };

    Ok(match name {
        "color_scheme" => CheckSpec::ColorScheme,
        "switch_scheme" => CheckSpec::SwitchScheme,
        "block_full_screen" => CheckSpec::BlockFullScreen {
            selector: need_selector()?,
        },
        "background_fixed" => CheckSpec::BackgroundFixed {
            selector: need_selector()?,
        },
        "semantic_tags" => CheckSpec::SemanticTags { tags: need_tags()? },
        "reset_margins" => CheckSpec::ResetMargins { tags: need_tags()? },
        other => bail!("unknown check: {}", other),
    })
}

async fn run_single(
    launcher: Arc<dyn BrowserLauncher>,
    dark_scheme: DarkSchemeConfig,
    url: &str,
    check: &CheckSpec,
) -> CheckOutcome {
    let runner = CheckRunner::new(
        launcher,
        RunnerConfig {
            dark_scheme,
            ..Default::default()
        },
    );
    runner.run_check(url, Viewport::default(), check).await
}

/// `Ok(true)` when every check passed, `Ok(false)` on rule violations, and
/// an error when any check could not run.
fn verdict<'a>(outcomes: impl IntoIterator<Item = &'a CheckOutcome>) -> anyhow::Result<bool> {
    let mut passed = true;
    let mut errors = Vec::new();
    for outcome in outcomes {
        if let Some(e) = &outcome.error {
            errors.push(format!("{}: {}", outcome.check, e));
        }
        passed &= outcome.passed;
    }

    if !errors.is_empty() {
        bail!("{} check(s) could not run: {}", errors.len(), errors.join("; "));
    }
    Ok(passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pagecheck_core::{BrowserOptions, BrowserSession, CheckError, CheckResult};

    struct RefusingLauncher;

    #[async_trait]
    impl BrowserLauncher for RefusingLauncher {
        async fn launch(&self, url: &str, _options: &BrowserOptions) -> CheckResult<Box<dyn BrowserSession>> {
            Err(CheckError::Launch(format!("net::ERR_CONNECTION_REFUSED at {}", url)))
        }
    }

    fn outcome(check: &str, diagnostics: Vec<Diagnostic>, error: Option<&str>) -> CheckOutcome {
        CheckOutcome {
            check: check.to_string(),
            passed: diagnostics.is_empty() && error.is_none(),
            diagnostics,
            duration_ms: 1,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_verdict_separates_violations_from_errors() {
        let pass = outcome("color_scheme", vec![], None);
        let fail = outcome("color_scheme", vec![Diagnostic::NotColorScheme], None);
        let broken = outcome("switch_scheme", vec![], Some("Node.js not found"));

        assert!(verdict([&pass]).unwrap());
        assert!(!verdict([&pass, &fail]).unwrap());

        let err = verdict([&fail, &broken]).unwrap_err();
        assert!(err.to_string().contains("switch_scheme: Node.js not found"));
    }

    #[tokio::test]
    async fn test_unreachable_page_is_an_error_for_every_check() {
        for name in ["color_scheme", "switch_scheme"] {
            let check = parse_check(name, None, vec![]).unwrap();
            let outcome = run_single(
                Arc::new(RefusingLauncher),
                DarkSchemeConfig::default(),
                "http://127.0.0.1:1/",
                &check,
            )
            .await;

            assert!(outcome.error.is_some(), "{} should not run", name);
            assert!(verdict([&outcome]).is_err());
        }
    }

    #[test]
    fn test_parse_check_with_tags() {
        let check = parse_check("semantic_tags", None, vec!["header".into(), "footer".into()]).unwrap();
        assert_eq!(
            check,
            CheckSpec::SemanticTags {
                tags: vec!["header".into(), "footer".into()]
            }
        );
    }

    #[test]
    fn test_parse_check_requires_selector() {
        let err = parse_check("block_full_screen", None, vec![]).unwrap_err();
        assert!(err.to_string().contains("--selector"));
    }

    #[test]
    fn test_parse_unknown_check() {
        assert!(parse_check("font_size", None, vec![]).is_err());
    }

    #[test]
    fn test_dark_scheme_paths_follow_work_dir() {
        let args = BrowserArgs {
            browser: BrowserArg::Chromium,
            node_path: None,
            settle_ms: 0,
            work_dir: PathBuf::from("site"),
        };
        let config = dark_scheme_config(&args);
        assert_eq!(config.canonical_palette_image, PathBuf::from("site/layout-canonical-dark.jpg"));
        assert_eq!(config.layout_output_image, PathBuf::from("site/output-dark.jpg"));
        assert_eq!(config.settle_delay, Duration::ZERO);
        assert_eq!(config.tolerance, 35);
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from(["pagecheck", "run", "--suite", "checks/landing.yaml", "--settle-ms", "10"]).unwrap();
        assert_eq!(cli.browser.settle_ms, 10);
        assert!(matches!(cli.command, Commands::Run { tag: None, .. }));
    }
}
