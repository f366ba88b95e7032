//! CLI entry point for the longshort rebalancer.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use longshort_broker::Gateway;
use longshort_broker::alpaca::AlpacaGateway;
use longshort_rebalancer::audit::AuditLog;
use longshort_rebalancer::config::Config;
use longshort_rebalancer::cycle::Rebalancer;
use longshort_rebalancer::error::{self, Error, Result};
use longshort_rebalancer::schedule::{self, Scheduler};

#[derive(Parser)]
#[command(name = "longshort")]
#[command(about = "Long/short equity momentum rebalancer")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebalance every interval while the market is open
    Run,

    /// Run a single rebalance cycle now
    Cycle,

    /// Show current positions
    Positions,

    /// Show account and market clock
    Status,

    /// Cancel open orders and close every position
    Liquidate {
        /// Skip confirmation prompt (for automation/cron)
        #[arg(long)]
        force: bool,
    },
}

fn connect(config: &Config) -> Result<AlpacaGateway> {
    AlpacaGateway::connect(&config.alpaca()?).map_err(error::gateway)
}

fn rebalancer(config: Config) -> Result<Rebalancer<AlpacaGateway>> {
    let gateway = connect(&config)?;
    let audit = AuditLog::open(&config.audit_path())?;
    Ok(Rebalancer::new(gateway, config)?.with_audit(audit))
}

fn show_positions(config: &Config) -> Result<()> {
    let gateway = connect(config)?;
    let positions = gateway.positions().map_err(error::gateway)?;
    if positions.is_empty() {
        println!("No open positions.");
        return Ok(());
    }

    println!("{:8} {:>6} {:>8} {:>14}", "Symbol", "Side", "Qty", "Value");
    let mut total = 0;
    for p in &positions {
        println!(
            "{:8} {:>6} {:>8} {:>14.2}",
            p.symbol.as_str(),
            p.side.to_string(),
            p.qty,
            p.market_value_cents as f64 / 100.0
        );
        total += p.market_value_cents;
    }
    println!("{:8} {:>6} {:>8} {:>14.2}", "Total", "", "", total as f64 / 100.0);
    Ok(())
}

fn check_status(config: &Config) -> Result<()> {
    let gateway = connect(config)?;
    let account = gateway.account().map_err(error::gateway)?;
    let clock = gateway.clock().map_err(error::gateway)?;

    println!("Connected to {}", config.connection.base_url);
    println!(
        "Account {}: ${:.2} equity, ${:.2} cash, ${:.2} buying power",
        account.id,
        account.equity_cents as f64 / 100.0,
        account.cash_cents as f64 / 100.0,
        account.buying_power_cents as f64 / 100.0,
    );
    if clock.is_open {
        println!(
            "Market open, closes {} ({} min)",
            clock.next_close,
            schedule::minutes_to_close(&clock)
        );
    } else {
        println!("Market closed, opens {}", clock.next_open);
    }
    Ok(())
}

fn liquidate(config: Config, force: bool) -> Result<()> {
    if !force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Close every position at market?")
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;
        if !confirmed {
            return Err(Error::Aborted("Aborted.".into()));
        }
    }

    let report = rebalancer(config)?.liquidate_all()?;
    println!(
        "Cancelled {} orders. Closed {} positions.",
        report.cancelled.cancelled,
        report.closed.len()
    );
    for symbol in &report.failed {
        println!("  FAILED to close {symbol}");
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Run => rebalancer(config).and_then(|r| Scheduler::new(r).run()),
        Command::Cycle => rebalancer(config)
            .and_then(|mut r| r.run_cycle())
            .map(|report| print!("{report}")),
        Command::Positions => show_positions(&config),
        Command::Status => check_status(&config),
        Command::Liquidate { force } => liquidate(config, force),
    };

    if let Err(e) = result {
        match &e {
            Error::Connection(msg) => {
                eprintln!("Connection failed: {msg}");
                process::exit(2);
            }
            Error::Aborted(msg) => {
                eprintln!("{msg}");
                process::exit(0);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
