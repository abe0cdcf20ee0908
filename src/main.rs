use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rust_decimal::Decimal;
use tracing::debug;

use rd_financing::api::{self, CalculateRequest};
use rd_financing::config::ServiceConfig;
use rd_financing::input::TERM_PRESETS;
use rd_financing::presentation::{self, PREVIEW_ROWS};
use rd_financing::{Commission, compute, format_currency};

/// Vehicle financing quotes
#[derive(Parser)]
#[command(
    name = "rd-financing",
    version,
    about = "Vehicle financing quotes: level payment, amortization schedule and totals",
    long_about = "Quotes vehicle financing with decimal precision. Handles down payment, \
                  prorated commission with optional ITBIS, monthly insurance and balloon \
                  payments, and can serve the same quotes over HTTP."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a financing quote
    Quote(QuoteArgs),
    /// Serve quotes over HTTP
    Serve(ServeArgs),
    /// Print the defaults applied to absent fields
    Defaults,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
    Minimal,
}

#[derive(Args)]
#[command(allow_hyphen_values = true)]
struct QuoteArgs {
    /// Vehicle price
    #[arg(long)]
    price: Option<Decimal>,

    /// Down payment amount (wins over --down-payment-percent)
    #[arg(long)]
    down_payment: Option<Decimal>,

    /// Down payment as a percent of the price (0-80)
    #[arg(long)]
    down_payment_percent: Option<Decimal>,

    /// Number of monthly installments
    #[arg(long, alias = "term")]
    term_months: Option<i64>,

    /// Nominal annual rate in percent (e.g. 22 for 22%)
    #[arg(long, alias = "apr")]
    annual_rate: Option<Decimal>,

    /// Commission as a percent of the price
    #[arg(long, conflicts_with = "commission_flat")]
    commission_percent: Option<Decimal>,

    /// Commission as a flat amount
    #[arg(long)]
    commission_flat: Option<Decimal>,

    /// Insurance charged every month
    #[arg(long)]
    insurance: Option<Decimal>,

    /// Balloon as a percent of the price (0-40)
    #[arg(long)]
    balloon: Option<Decimal>,

    /// Add 18% ITBIS on the commission
    #[arg(long)]
    itbis: bool,

    /// Path to a JSON request (same shape as the HTTP body); overrides flags
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table")]
    output: OutputFormat,

    /// Show every installment instead of the first six
    #[arg(long)]
    all_rows: bool,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on (overrides BIND_ADDR)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rd_financing=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Quote(args) => run_quote(args),
        Commands::Serve(args) => run_serve(args).await,
        Commands::Defaults => run_defaults(),
    };

    if let Err(e) = result {
        eprintln!("{}: {:#}", "error".red().bold(), e);
        process::exit(1);
    }
}

fn run_quote(args: QuoteArgs) -> Result<()> {
    let config = ServiceConfig::from_env()?;
    let request = match &args.input {
        Some(path) => read_request(path)?,
        None => request_from_flags(&args)?,
    };

    let input = request.into_input(&config.defaults)?;
    debug!(?input, "quote input");
    let result = compute(&input)?;

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result.rounded(2))?);
        }
        OutputFormat::Minimal => {
            println!("{}", format_currency(result.monthly_payment));
        }
        OutputFormat::Table => {
            println!("{}", presentation::render_summary(&result));

            let limit = if args.all_rows { result.schedule.len() } else { PREVIEW_ROWS };
            let preview = presentation::preview(&result.schedule, limit);
            println!("{}", presentation::render_schedule(preview.rows));
            if preview.hidden_rows > 0 {
                println!("... {} more installments (use --all-rows)", preview.hidden_rows);
            }
            if !result.balloon_amount.is_zero() {
                println!(
                    "Balloon due at month {}: {}",
                    input.term_months,
                    format_currency(result.balloon_amount)
                );
            }
        }
    }

    Ok(())
}

fn read_request(path: &Path) -> Result<CalculateRequest> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("failed to parse '{}'", path.display()))
}

fn request_from_flags(args: &QuoteArgs) -> Result<CalculateRequest> {
    let price = args
        .price
        .context("--price or --input <file.json> is required")?;

    let commission = match (args.commission_percent, args.commission_flat) {
        (Some(percent), _) => Some(Commission::Percent(percent)),
        (None, Some(amount)) => Some(Commission::Flat(amount)),
        (None, None) => None,
    };

    Ok(CalculateRequest {
        price,
        down_payment: args.down_payment,
        down_payment_percent: args.down_payment_percent,
        term_months: args.term_months,
        annual_rate_percent: args.annual_rate,
        commission,
        monthly_insurance: args.insurance,
        balloon_percent: args.balloon,
        itbis_on_commission: args.itbis.then_some(true),
    })
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = ServiceConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind.parse::<SocketAddr>().context("invalid --bind address")?;
    }
    api::serve(config).await
}

fn run_defaults() -> Result<()> {
    let config = ServiceConfig::from_env()?;
    let value = serde_json::json!({
        "defaults": config.defaults,
        "termPresets": TERM_PRESETS,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
