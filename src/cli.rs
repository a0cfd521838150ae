//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::openrouter_adapter::OpenRouterAdapter;
use crate::adapters::ticker_cache::TickerCache;
use crate::adapters::yahoo_adapter::YahooAdapter;
use crate::domain::backtest::{BacktestConfig, DEFAULT_FAST, DEFAULT_SLOW, run_backtest};
use crate::domain::chat::{ChatRequest, ChatService, ChatSettings};
use crate::domain::error::StockchatError;
use crate::domain::settings::Settings;
use crate::domain::snapshot::StockSnapshot;
use crate::domain::technicals::technical_summary;
use crate::ports::market_data_port::MarketDataPort;

#[derive(Parser, Debug)]
#[command(
    name = "stockchat",
    about = "Stock snapshots, technical indicators and an educational chat assistant"
)]
pub struct Cli {
    /// INI config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web server
    Serve,
    /// Print a quote and fundamentals snapshot
    Snapshot { ticker: String },
    /// Print the latest technical indicators
    Technicals {
        ticker: String,
        /// Read history from a CSV file, or `{TICKER}.csv` in a directory
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        period: Option<String>,
        #[arg(long)]
        interval: Option<String>,
    },
    /// Run the toy SMA crossover backtest
    Backtest {
        ticker: String,
        #[arg(long, default_value_t = DEFAULT_FAST)]
        fast: usize,
        #[arg(long, default_value_t = DEFAULT_SLOW)]
        slow: usize,
        /// Read history from a CSV file, or `{TICKER}.csv` in a directory
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        period: Option<String>,
        #[arg(long)]
        interval: Option<String>,
    },
    /// Ask the assistant a question
    Chat {
        message: String,
        #[arg(long)]
        ticker: Option<String>,
        /// Include the toy backtest in the context
        #[arg(long)]
        backtest: bool,
        #[arg(long)]
        no_fundamentals: bool,
        #[arg(long)]
        no_technicals: bool,
        #[arg(long)]
        no_guardrails: bool,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let settings = match load_settings(cli.config.as_ref()) {
        Ok(s) => s,
        Err(code) => return code,
    };

    match cli.command {
        Command::Serve => run_serve(&settings),
        Command::Snapshot { ticker } => run_snapshot(&settings, &ticker),
        Command::Technicals {
            ticker,
            csv,
            period,
            interval,
        } => {
            let window = HistoryWindow::resolve(&settings, period, interval);
            run_technicals(&settings, &ticker, csv.as_ref(), &window)
        }
        Command::Backtest {
            ticker,
            fast,
            slow,
            csv,
            period,
            interval,
        } => {
            let window = HistoryWindow::resolve(&settings, period, interval);
            run_toy_backtest(&settings, &ticker, fast, slow, csv.as_ref(), &window)
        }
        Command::Chat {
            message,
            ticker,
            backtest,
            no_fundamentals,
            no_technicals,
            no_guardrails,
        } => {
            let mut request = ChatRequest::new(message).with_settings(ChatSettings {
                fundamentals: !no_fundamentals,
                technicals: !no_technicals,
                backtest,
                guardrails: !no_guardrails,
            });
            if let Some(ticker) = ticker {
                request = request.with_ticker(ticker);
            }
            run_chat(&settings, &request)
        }
    }
}

pub fn load_settings(path: Option<&PathBuf>) -> Result<Settings, ExitCode> {
    let adapter = match path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            FileConfigAdapter::from_file(path)
        }
        None => Ok(FileConfigAdapter::empty()),
    };
    adapter.and_then(|a| Settings::load(&a)).map_err(report)
}

fn report(err: StockchatError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}

fn require_ticker(ticker: &str) -> Result<String, StockchatError> {
    let ticker = ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(StockchatError::missing("ticker"));
    }
    Ok(ticker)
}

struct HistoryWindow {
    period: String,
    interval: String,
}

impl HistoryWindow {
    fn resolve(settings: &Settings, period: Option<String>, interval: Option<String>) -> Self {
        Self {
            period: period.unwrap_or_else(|| settings.market_data.history_period.clone()),
            interval: interval.unwrap_or_else(|| settings.market_data.history_interval.clone()),
        }
    }
}

fn yahoo(settings: &Settings) -> Result<YahooAdapter, StockchatError> {
    YahooAdapter::new(
        &settings.market_data,
        TickerCache::new(settings.market_data.cache_capacity),
    )
}

fn market_port(
    settings: &Settings,
    csv: Option<&PathBuf>,
) -> Result<Box<dyn MarketDataPort>, StockchatError> {
    match csv {
        Some(path) if path.is_dir() => {
            eprintln!("Reading history from {}/<TICKER>.csv", path.display());
            Ok(Box::new(CsvAdapter::from_dir(path)))
        }
        Some(path) => {
            eprintln!("Reading history from {}", path.display());
            Ok(Box::new(CsvAdapter::from_file(path)))
        }
        None => Ok(Box::new(yahoo(settings)?)),
    }
}

fn run_snapshot(settings: &Settings, ticker: &str) -> ExitCode {
    let result = require_ticker(ticker).and_then(|ticker| {
        let market = yahoo(settings)?;
        Ok(StockSnapshot::fetch(&market, &ticker))
    });
    match result {
        Ok(snapshot) => print_json(&snapshot),
        Err(e) => report(e),
    }
}

fn run_technicals(
    settings: &Settings,
    ticker: &str,
    csv: Option<&PathBuf>,
    window: &HistoryWindow,
) -> ExitCode {
    let result = require_ticker(ticker).and_then(|ticker| {
        let market = market_port(settings, csv)?;
        market.fetch_history(&ticker, &window.period, &window.interval)
    });
    match result {
        Ok(history) => print_json(&technical_summary(&history)),
        Err(e) => report(e),
    }
}

fn run_toy_backtest(
    settings: &Settings,
    ticker: &str,
    fast: usize,
    slow: usize,
    csv: Option<&PathBuf>,
    window: &HistoryWindow,
) -> ExitCode {
    let config = match BacktestConfig::new(fast, slow) {
        Ok(c) => c,
        Err(e) => return report(e),
    };
    let result = require_ticker(ticker).and_then(|ticker| {
        let market = market_port(settings, csv)?;
        market.fetch_history(&ticker, &window.period, &window.interval)
    });
    match result {
        Ok(history) => {
            eprintln!(
                "Running SMA({}) / SMA({}) crossover over {} bars",
                config.fast,
                config.slow,
                history.len()
            );
            print_json(&run_backtest(&history, &config))
        }
        Err(e) => report(e),
    }
}

fn run_chat(settings: &Settings, request: &ChatRequest) -> ExitCode {
    if let Err(e) = request.validate() {
        return report(e);
    }
    let result = yahoo(settings).and_then(|market| {
        let llm = OpenRouterAdapter::new(&settings.llm)?;
        ChatService::new(&market, &llm)
            .with_history_window(
                settings.market_data.history_period.as_str(),
                settings.market_data.history_interval.as_str(),
            )
            .with_generation(settings.llm.temperature, settings.llm.max_tokens)
            .respond(request)
    });
    match result {
        Ok(response) => print_json(&response),
        Err(e) => report(e),
    }
}

fn run_serve(settings: &Settings) -> ExitCode {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, build_router};
        use std::sync::Arc;

        // Blocking clients are built before the runtime exists and held here
        // so their final drop also happens outside it.
        let market = match yahoo(settings) {
            Ok(m) => Arc::new(m),
            Err(e) => return report(e),
        };
        let llm = match OpenRouterAdapter::new(&settings.llm) {
            Ok(l) => Arc::new(l),
            Err(e) => return report(e),
        };
        if !llm.is_configured() {
            tracing::warn!("OPENROUTER_API_KEY is not set; chat replies will be data-only");
        }

        let state = AppState::new(market.clone(), llm.clone())
            .with_history_window(
                settings.market_data.history_period.as_str(),
                settings.market_data.history_interval.as_str(),
            )
            .with_generation(settings.llm.temperature, settings.llm.max_tokens);
        let router = build_router(state);
        let addr = settings.web.listen;

        let runtime = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => return report(e.into()),
        };

        tracing::info!(%addr, model = %settings.llm.model, "starting web server");
        let served = runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    tokio::signal::ctrl_c().await.ok();
                })
                .await
        });
        drop(runtime);

        match served {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => report(e.into()),
        }
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = settings;
        eprintln!("error: web feature is required for serve");
        ExitCode::from(1)
    }
}
