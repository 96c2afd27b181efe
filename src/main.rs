use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use pricefolio::core::log::init_logging;
use pricefolio::core::price::{AssetClass, PriceField};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for pricefolio::AppCommand {
    fn from(cmd: Commands) -> pricefolio::AppCommand {
        match cmd {
            Commands::Price {
                symbol,
                crypto,
                date,
                field,
            } => pricefolio::AppCommand::Price {
                symbol,
                asset_class: if crypto {
                    AssetClass::Crypto
                } else {
                    AssetClass::Stock
                },
                date,
                field,
            },
            Commands::Returns { from, to } => pricefolio::AppCommand::Returns { from, to },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Resolve the price of a single active on a date
    Price {
        /// Ticker symbol, e.g. AAPL or ETH
        symbol: String,
        /// Treat the symbol as a cryptocurrency quoted in USD
        #[arg(long)]
        crypto: bool,
        /// Observation date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Candle value: open, high, low, close, volume or market_cap
        #[arg(short, long, default_value = "close")]
        field: PriceField,
    },
    /// Display overall and annualized returns of each portfolio
    Returns {
        /// Start of the period (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,
        /// End of the period (YYYY-MM-DD), defaults to yesterday
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => pricefolio::cli::setup::setup(),
        Some(cmd) => pricefolio::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
