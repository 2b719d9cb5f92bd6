use clap::{Parser, Subcommand};
use dailypost::badges::update_readme;
use dailypost::open_ledger;
use dailypost::workflow::{GenerationRun, RunOutcome};
use dp_config::DailypostConfig;
use dp_usage::{LimitCheck, UsageLedger};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "dailypost",
    version = dailypost::DAILYPOST_VERSION,
    about = "Daily content generation with free-tier API usage accounting"
)]
struct Cli {
    /// Usage ledger file (overrides config and DAILYPOST_USAGE_FILE)
    #[arg(long, global = true)]
    usage_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a run still fits in today's quota
    Check {
        /// Requests to admit (defaults to one run)
        #[arg(long)]
        requests: Option<u64>,
        /// Estimated tokens to admit (defaults to one run)
        #[arg(long)]
        tokens: Option<u64>,
    },
    /// Record usage that has already happened
    Record {
        /// Requests used (defaults to one call)
        #[arg(long)]
        requests: Option<u64>,
        /// Tokens used (defaults to one call)
        #[arg(long)]
        tokens: Option<u64>,
    },
    /// Show today's usage against the daily limits
    Report,
    /// Summarise the last 7 days
    Weekly,
    /// Print today's usage as JSON
    Current,
    /// Generate posts with an external command, charging each call
    Run {
        /// Number of posts to generate
        #[arg(long, default_value_t = 2)]
        posts: u64,
        /// Pause between posts in milliseconds
        #[arg(long, default_value_t = 2000)]
        delay_ms: u64,
        /// Generator command and its arguments
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
    /// Refresh the usage badges in the README
    Badges {
        #[arg(long)]
        readme: Option<PathBuf>,
    },
    /// Print version
    Version,
}

fn exit_rejected(check: &LimitCheck, ledger: &UsageLedger) -> ! {
    if let Some(reason) = &check.reason {
        eprintln!("API limit reached: {}", reason);
    }
    println!("{}", ledger.report());
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dailypost=info,dp_usage=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = DailypostConfig::load()?;
    let ledger = Arc::new(open_ledger(&config, cli.usage_file)?);

    match cli.command {
        Commands::Check { requests, tokens } => {
            let requests = requests.unwrap_or(ledger.operation().requests);
            let tokens = tokens.unwrap_or(ledger.operation().tokens);
            let check = ledger.check_limits(requests, tokens);
            if !check.can_proceed {
                exit_rejected(&check, &ledger);
            }
            println!(
                "Can proceed: {} requests / {} tokens fit today's limits",
                requests, tokens
            );
            println!(
                "Used so far: {} requests, {} tokens",
                check.usage.request_count, check.usage.estimated_tokens
            );
        }

        Commands::Record { requests, tokens } => {
            let requests = requests.unwrap_or(config.call.requests);
            let tokens = tokens.unwrap_or(config.call.tokens);
            ledger.record_usage(requests, tokens);
            let usage = ledger.load_today();
            println!(
                "Recorded {} requests / {} tokens ({} / {} today)",
                requests, tokens, usage.request_count, usage.estimated_tokens
            );
        }

        Commands::Report => {
            println!("{}", ledger.report());
        }

        Commands::Weekly => {
            println!("{}", ledger.weekly_report());
        }

        Commands::Current => {
            println!("{}", serde_json::to_string_pretty(&ledger.current_usage())?);
        }

        Commands::Run {
            posts,
            delay_ms,
            command,
        } => {
            let run = GenerationRun {
                posts,
                call: config.call,
                delay: Duration::from_millis(delay_ms),
                command,
            };
            match run.execute(Arc::clone(&ledger)).await? {
                RunOutcome::Rejected(check) => exit_rejected(&check, &ledger),
                RunOutcome::Completed { posts } => {
                    println!("Daily content generation completed ({} posts)", posts);
                    println!();
                    println!("{}", ledger.report());
                }
            }
        }

        Commands::Badges { readme } => {
            let path = readme.unwrap_or_else(|| config.readme_path.clone());
            update_readme(&path, &ledger)?;
            println!("README badges updated: {}", path.display());
        }

        Commands::Version => {
            println!("dailypost {}", dailypost::DAILYPOST_VERSION);
        }
    }

    Ok(())
}
