use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paycheck_recon::{
    controller_from_config, is_valid_zipcode, normalize_detailed, AppConfig, CalculateTaxesRequest,
    RawLine, ReconciliationResult, SourceKind, TaxCategory,
};

#[derive(Parser, Debug)]
#[command(name = "paycheck-recon")]
#[command(about = "Cross-checked paycheck withholding from two tax calculators")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "PAYCHECK_RECON_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query both calculators and reconcile, retrying on disagreement
    Calculate {
        #[arg(long)]
        salary: f64,
        /// Additional federal withholding
        #[arg(long, default_value_t = 0.0)]
        withholding: f64,
        #[arg(long)]
        state: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        zipcode: String,
        /// SINGLE, MARRIED, HEAD_OF_HOUSEHOLD, NONRESIDENT_ALIEN, ...
        #[arg(long)]
        filing_status: String,
    },
    /// Reconcile two saved result captures without calling the calculators
    Reconcile {
        /// Payroll calculator lines (JSON)
        payroll: PathBuf,
        /// Consumer estimate lines (JSON)
        consumer: PathBuf,
        #[arg(long)]
        salary: f64,
    },
}

/// Either a bare array of lines or a worker response body
#[derive(Deserialize)]
#[serde(untagged)]
enum Capture {
    Lines(Vec<RawLine>),
    Response { lines: Vec<RawLine> },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paycheck_recon=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::resolve(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Calculate {
            salary,
            withholding,
            state,
            address,
            city,
            zipcode,
            filing_status,
        } => {
            if !is_valid_zipcode(&zipcode) {
                bail!("Invalid ZIP code {:?}: expected 5 digits or ZIP+4", zipcode);
            }
            let body = CalculateTaxesRequest {
                salary: Some(salary),
                withholding: Some(withholding),
                state: Some(state),
                address: Some(address),
                city: Some(city),
                zipcode: Some(zipcode),
                filing_status: Some(filing_status),
            };
            run_calculate(&config, body)
        }
        Command::Reconcile {
            payroll,
            consumer,
            salary,
        } => run_reconcile(&config, &payroll, &consumer, salary),
    }
}

fn run_calculate(config: &AppConfig, body: CalculateTaxesRequest) -> Result<()> {
    let request = body.validate()?;
    let controller = controller_from_config(config)?;

    println!("Calculating net pay for ${:.2}... Please wait.\n", request.salary);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    match runtime.block_on(controller.acquire_with_retry(&request)) {
        Ok(reconciled) => {
            print_result(&reconciled.result);
            println!("\n✅ Sources agreed on attempt {}", reconciled.attempts);
            Ok(())
        }
        Err(report) => {
            eprintln!("❌ {}", report.summary());
            std::process::exit(1);
        }
    }
}

fn run_reconcile(config: &AppConfig, payroll: &Path, consumer: &Path, salary: f64) -> Result<()> {
    let a = normalize_detailed(
        &load_capture(payroll)?,
        &config.vocabulary.for_source(SourceKind::Payroll),
    );
    let b = normalize_detailed(
        &load_capture(consumer)?,
        &config.vocabulary.for_source(SourceKind::Consumer),
    );

    for (source, normalized) in [(SourceKind::Payroll, &a), (SourceKind::Consumer, &b)] {
        if !normalized.missing.is_empty() {
            println!("⚠️  {}: labels not found {:?}", source.name(), normalized.missing);
        }
    }

    let result = config.engine().reconcile(&a.breakdown, &b.breakdown, salary)?;
    print_result(&result);

    if result.within_threshold {
        println!("\n✅ {}", result.summary());
        Ok(())
    } else {
        println!("\n❌ {}", result.summary());
        std::process::exit(1);
    }
}

fn load_capture(path: &Path) -> Result<Vec<RawLine>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let capture: Capture = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse capture: {}", path.display()))?;
    Ok(match capture {
        Capture::Lines(lines) | Capture::Response { lines } => lines,
    })
}

fn print_result(result: &ReconciliationResult) {
    let merged = &result.merged_breakdown;
    let pct = |category: TaxCategory| result.merged_percentages.get(&category).copied().unwrap_or(0.0);

    println!("Detailed Tax Information:");
    let rows = [
        TaxCategory::FederalWithholding,
        TaxCategory::StateWithholding,
        TaxCategory::LocalTax,
        TaxCategory::Medicare,
        TaxCategory::SocialSecurity,
    ];
    for (index, category) in rows.iter().enumerate() {
        println!(
            "{}. {}: ${:.2} ({:.2}%)",
            index + 1,
            category.label(),
            merged.amount(*category),
            pct(*category)
        );
    }
    println!(
        "{}. Other Taxes: ${:.2} ({:.2}%)",
        rows.len() + 1,
        merged.other(),
        pct(TaxCategory::SDI) + pct(TaxCategory::FLI)
    );

    let net_pay = merged.amount(TaxCategory::NetPay);
    if net_pay > 0.0 {
        println!("\nTake home pay: ${:.2}", net_pay);
    }

    println!("\nSource deviation (percentage points):");
    for deviation in &result.deviations {
        println!(
            "  {}: {:.2} vs {:.2} → {:.2}",
            deviation.category.label(),
            deviation.pct_a,
            deviation.pct_b,
            deviation.deviation
        );
    }
}
