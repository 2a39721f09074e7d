use chrono::{DateTime, Local};
use clap::{Args, Parser, Subcommand};
use intraday_kit::config::AppConfig;
use intraday_kit::monitor::{FixedAtr, ReplaySource, StopMonitor};
use intraday_kit::risk::{self, CalculatorConfig, PositionCalculator};
use intraday_kit::scheduler::{ClockAlignedScheduler, SchedulerStats, TickHandler};
use intraday_kit::{Result, TradeResult};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "intraday-kit", version, about = "Intraday EMA, stop and position sizing helper")]
struct Cli {
    /// Configuration file (defaults to ./intraday.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the time on every aligned tick, or replay prices through the stop monitor
    Watch {
        /// Minutes between ticks (overrides scheduler.frequency_minutes)
        #[arg(long)]
        every: Option<u32>,
        /// Comma separated prices, one consumed per tick
        #[arg(long, value_delimiter = ',')]
        prices: Vec<f64>,
        /// ATR subtracted from the EMA to place the stop
        #[arg(long, default_value_t = 0.0)]
        atr: f64,
        #[arg(long, default_value = "REPLAY")]
        symbol: String,
    },
    /// Whole shares the capital buys at the entry price
    Shares {
        entry: f64,
        #[command(flatten)]
        calc: CalcArgs,
    },
    /// Gain of a round trip after commissions
    Gain {
        entry: f64,
        exit: f64,
        #[command(flatten)]
        calc: CalcArgs,
    },
    /// Where to put the stop so a loss costs at most 1R
    Stop {
        entry: f64,
        #[command(flatten)]
        calc: CalcArgs,
    },
    /// Capital to commit for a given stop
    Capital {
        entry: f64,
        stop: f64,
        #[command(flatten)]
        calc: CalcArgs,
    },
    /// Full plan from an entry/stop pair
    Plan {
        entry: f64,
        stop: f64,
        /// Optional target to report the gain at
        #[arg(long)]
        target: Option<f64>,
        #[command(flatten)]
        calc: CalcArgs,
    },
    /// Stream prices through an EMA
    Ema {
        #[arg(required = true)]
        prices: Vec<f64>,
        #[arg(long)]
        period: Option<f64>,
        /// Starting value (defaults to the first price)
        #[arg(long)]
        seed: Option<f64>,
    },
    /// Convert a period in days into bars of the given length
    Convert { days: f64, minutes_per_bar: f64 },
    /// Fractional loss going from one price to another
    Loss { from: f64, to: f64 },
    /// Price after losing a fraction of its value
    Drop { price: f64, fraction: f64 },
}

/// Per-invocation overrides of the calculator section
#[derive(Args)]
struct CalcArgs {
    #[arg(long)]
    capital: Option<f64>,
    #[arg(long)]
    commission: Option<f64>,
    /// Risk tolerance (1R)
    #[arg(long)]
    risk: Option<f64>,
}

impl CalcArgs {
    fn resolve(&self, base: CalculatorConfig) -> CalculatorConfig {
        let mut config = base;
        if let Some(capital) = self.capital {
            config = config.with_capital(capital);
        }
        if let Some(commission) = self.commission {
            config = config.with_commission(commission);
        }
        if let Some(risk) = self.risk {
            config = config.with_risk_tolerance(risk);
        }
        config
    }

    fn calculator(&self, base: CalculatorConfig, entry: f64) -> TradeResult<PositionCalculator> {
        self.resolve(base).build()?.with_entry_price(entry)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Watch {
            every,
            prices,
            atr,
            symbol,
        } => watch(&config, every, prices, atr, symbol).await?,
        Command::Shares { entry, calc } => {
            let calculator = calc.calculator(config.calculator, entry)?;
            let count = calculator.num_shares()?;
            println!("{}", calculator);
            println!("  Shares:           {}", count.shares);
            println!("  Adjusted capital: {:.2}", count.adjusted_capital);
        }
        Command::Gain { entry, exit, calc } => {
            let calculator = calc.calculator(config.calculator, entry)?;
            let gain = calculator.gain(exit)?;
            println!("{}", calculator);
            println!("  Shares: {}", gain.shares);
            println!("  Gain:   {:.2}", gain.amount);
        }
        Command::Stop { entry, calc } => {
            let calculator = calc.calculator(config.calculator, entry)?;
            let stop = calculator.risk_stop()?;
            println!("{}", calculator);
            println!("  Stop:           {:.4}", stop.stop_price);
            println!("  Per-share move: {:.4}", stop.per_share_move);
        }
        Command::Capital { entry, stop, calc } => {
            let calculator = calc.calculator(config.calculator, entry)?;
            let capital = calculator.capital_for_stop(stop)?;
            println!("{}", calculator);
            println!("  Required capital: {:.2}", capital);
        }
        Command::Plan {
            entry,
            stop,
            target,
            calc,
        } => {
            let settings = calc.resolve(config.calculator);
            let calculator = PositionCalculator::with_buy_and_stop(
                entry,
                stop,
                settings.risk_tolerance,
                settings.commission,
            )?;
            print_plan(&calculator, stop, target)?;
        }
        Command::Ema {
            prices,
            period,
            seed,
        } => {
            let period = period.unwrap_or(config.ema.period);
            let seed = seed.or(config.ema.seed).unwrap_or(prices[0]);
            let mut ema = intraday_kit::Ema::new(period, seed)?;
            for price in prices {
                println!("{:>12.4} -> {:.4}", price, ema.update(price));
            }
        }
        Command::Convert {
            days,
            minutes_per_bar,
        } => {
            let bars = risk::convert_period(days, minutes_per_bar)?;
            println!("{} days = {:.2} bars of {} minutes", days, bars, minutes_per_bar);
        }
        Command::Loss { from, to } => {
            let fraction = risk::loss_fraction(from, to)?;
            println!("{:.4} ({:.2}%)", fraction, fraction * 100.0);
        }
        Command::Drop { price, fraction } => {
            println!("{:.4}", risk::price_after_loss(price, fraction));
        }
    }

    Ok(())
}

fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("intraday_kit=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_plan(calculator: &PositionCalculator, stop: f64, target: Option<f64>) -> TradeResult<()> {
    let shares = calculator.num_shares()?;
    let realized = calculator.risk_stop()?;

    println!("{}", calculator);
    println!("  Shares:           {}", shares.shares);
    println!("  Adjusted capital: {:.2}", shares.adjusted_capital);
    println!("  Requested stop:   {:.4}", stop);
    println!("  Stop at 1R:       {:.4}", realized.stop_price);
    if let Some(target) = target {
        let gain = calculator.gain(target)?;
        println!("  Gain at {:.4}:   {:.2}", target, gain.amount);
    }
    Ok(())
}

fn display_time(at: DateTime<Local>) -> anyhow::Result<()> {
    println!("{}", at);
    Ok(())
}

async fn watch(
    config: &AppConfig,
    every: Option<u32>,
    prices: Vec<f64>,
    atr: f64,
    symbol: String,
) -> anyhow::Result<()> {
    let frequency = every.unwrap_or(config.scheduler.frequency_minutes);
    let cancel = CancellationToken::new();

    let stats = if prices.is_empty() {
        let mut scheduler = ClockAlignedScheduler::new(frequency, display_time)?;
        run_until_ctrl_c(&mut scheduler, cancel).await
    } else {
        let ema = config.ema(prices[0])?;
        let monitor = StopMonitor::new(
            ReplaySource::new(symbol, prices),
            FixedAtr(atr),
            ema,
            config.calculator()?,
        );
        let mut scheduler = ClockAlignedScheduler::new(frequency, monitor)?;
        run_until_ctrl_c(&mut scheduler, cancel).await
    };

    tracing::info!(
        polls = stats.polls,
        ticks = stats.ticks_fired,
        failures = stats.failures,
        "Watch stopped"
    );
    Ok(())
}

async fn run_until_ctrl_c<H: TickHandler>(
    scheduler: &mut ClockAlignedScheduler<H>,
    cancel: CancellationToken,
) -> SchedulerStats {
    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, shutting down...");
            stop.cancel();
        }
    });

    tracing::info!("Press Ctrl+C to stop");
    scheduler.run(cancel).await
}
