//! dashboard: terminal front end for the financial dashboard.
//!
//! Usage:
//!   cargo run -p dashboard -- quote 2330
//!   cargo run -p dashboard -- compare "Blue Chips" ROE "Net Margin"
//!   cargo run -p dashboard -- formula build
//!
//! Configuration comes from the environment (see `DashboardConfig`), with
//! `.env` loaded first when present.

use anyhow::Result;
use app_state::{AppState, DashboardConfig};
use dashboard::cli::HELP;
use dashboard::{parse_args, BuilderStep, ChartSink, Command, Session, TerminalSink};
use dashboard_core::{DashboardError, ErrorKind};
use market_data::{CacheSettings, FinMindClient, MarketDataService, Providers, YahooClient};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dashboard=info,market_data=warn".into());

    if json_logging {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn build_session(config: &DashboardConfig) -> Session {
    let yahoo = YahooClient::new(config.http_timeout, config.yahoo_rate_limit);
    let finmind = FinMindClient::new(
        config.finmind_token.clone(),
        config.finmind_start_date,
        config.http_timeout,
        config.finmind_rate_limit,
    );

    let settings = CacheSettings {
        price_ttl: config.price_cache_ttl,
        statement_ttl: config.statement_cache_ttl,
        snapshot_ttl: config.snapshot_cache_ttl,
        institutional_lookback_days: config.institutional_lookback_days,
    };
    let service = MarketDataService::new(Providers::live(yahoo, finmind), settings);

    Session::new(AppState::load(&config.state_file), service)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = DashboardConfig::from_env()?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    let invocation = match parse_args(&args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("{}", e.neutral_message());
            std::process::exit(2);
        }
    };

    let mut session = build_session(&config);
    let mut sink = TerminalSink::new(std::io::stdout());

    if let Err(e) = run(&mut session, &mut sink, invocation).await {
        match e.kind() {
            ErrorKind::UserInput => eprintln!("{}", e.neutral_message()),
            _ => {
                tracing::warn!("{}", e);
                eprintln!("{}", e.neutral_message());
            }
        }
    }

    Ok(())
}

async fn run(
    session: &mut Session,
    sink: &mut impl ChartSink,
    invocation: dashboard::Invocation,
) -> Result<(), DashboardError> {
    let market = invocation.market;

    match invocation.command {
        Command::Help => println!("{}", HELP),
        Command::Quote { ticker } => sink.render(&session.quote(&ticker, market).await.chart())?,
        Command::Price { ticker, range } => {
            sink.render(&session.price(&ticker, range, market).await.chart())?
        }
        Command::Statement { ticker } => sink.render(&session.statement(&ticker, market).await)?,
        Command::Trend { ticker, metrics } => {
            sink.render(&session.trend(&ticker, &metrics, market).await.chart())?
        }
        Command::Compare { folder, metrics } => {
            session.select_folder(&folder)?;
            sink.render(&session.compare(&metrics).await?.chart())?;
        }
        Command::Flows { ticker } => sink.render(&session.flows(&ticker, market).await)?,
        Command::Metrics => sink.render(&session.metrics())?,
        Command::Folders => {
            for (name, watchlist) in session.state().watchlists().folders() {
                println!("{}: {}", name, watchlist.tickers().join(", "));
            }
        }
        Command::CreateFolder { name } => {
            if session.create_folder(&name)? {
                println!("Created folder '{}'", name.trim());
            } else {
                println!("Folder '{}' already exists", name.trim());
            }
        }
        Command::DeleteFolder { name } => {
            if session.delete_folder(&name)? {
                println!("Deleted folder '{}'", name.trim());
            } else {
                println!("No folder named '{}'", name.trim());
            }
        }
        Command::AddTicker { folder, ticker, holding } => {
            session.select_folder(&folder)?;
            if !session.add_ticker(&ticker)? {
                println!("{} is already in '{}'", ticker.trim().to_uppercase(), folder.trim());
            }
            if let Some(holding) = holding {
                session.set_holding(&ticker, holding)?;
            }
        }
        Command::RemoveTicker { folder, ticker } => {
            session.select_folder(&folder)?;
            if !session.remove_ticker(&ticker)? {
                println!("{} is not in '{}'", ticker.trim().to_uppercase(), folder.trim());
            }
        }
        Command::Formulas => {
            for (name, expression) in session.state().formulas().list() {
                println!("{} = {}", name, expression);
            }
        }
        Command::AddFormula { name, expression } => {
            session.save_formula(&name, &expression)?;
            println!("Saved '{}'", name.trim());
        }
        Command::DeleteFormula { name } => {
            if !session.delete_formula(&name)? {
                println!("No formula named '{}'", name);
            }
        }
        Command::CheckFormula { name, ticker } => {
            match session.formula_chart(&name, &ticker, market).await {
                Ok(chart) => sink.render(&chart)?,
                // Keep the underlying error visible
                Err(e) if e.kind() == ErrorKind::FormulaEvaluation => {
                    eprintln!("{}: {}", e.neutral_message(), e)
                }
                Err(e) => return Err(e),
            }
        }
        Command::BuildFormula => build_formula(session).await?,
    }

    Ok(())
}

/// Line-oriented formula builder on stdin.
async fn build_formula(session: &mut Session) -> Result<(), DashboardError> {
    println!("Enter a line item or one of + - * / ( ) per line.");
    println!("'<' deletes a character, 'C' clears, 'save <name>' stores, 'quit' exits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match session.builder_input(&line) {
            Ok(BuilderStep::Quit) => break,
            Ok(BuilderStep::Saved(name)) => println!("Saved '{}'", name),
            Ok(BuilderStep::Continue) => {}
            Err(e) => eprintln!("{}", e.neutral_message()),
        }
        println!("> {}", session.builder().buffer());
    }

    Ok(())
}
