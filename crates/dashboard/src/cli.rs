//! Command-line parsing.
//!
//! Usage:
//!   dashboard quote <ticker>
//!   dashboard price <ticker> [--range today|5d|1mo|1y|5y]
//!   dashboard statement <ticker>
//!   dashboard trend <ticker> <metric>...
//!   dashboard compare <folder> <metric>...
//!   dashboard flows <ticker>
//!   dashboard metrics
//!   dashboard folders
//!   dashboard folder create|delete <name>
//!   dashboard folder add <folder> <ticker> [--cost <n>] [--shares <n>]
//!   dashboard folder remove <folder> <ticker>
//!   dashboard formulas
//!   dashboard formula add <name> = <expression...>
//!   dashboard formula delete <name>
//!   dashboard formula check <name> <ticker>
//!   dashboard formula build
//!
//! Single-ticker data commands accept `--market tw|us`; without it the market
//! is inferred from the ticker. `compare` always infers per ticker.
//! Multi-word names (metrics, folders, formulas) are passed as single quoted
//! arguments.

use app_state::Holding;
use dashboard_core::{DashboardError, Market, PriceRange};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Quote { ticker: String },
    Price { ticker: String, range: PriceRange },
    Statement { ticker: String },
    Trend { ticker: String, metrics: Vec<String> },
    Compare { folder: String, metrics: Vec<String> },
    Flows { ticker: String },
    Metrics,
    Folders,
    CreateFolder { name: String },
    DeleteFolder { name: String },
    AddTicker { folder: String, ticker: String, holding: Option<Holding> },
    RemoveTicker { folder: String, ticker: String },
    Formulas,
    AddFormula { name: String, expression: String },
    DeleteFormula { name: String },
    CheckFormula { name: String, ticker: String },
    BuildFormula,
    Help,
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: Command,
    pub market: Option<Market>,
}

fn usage(message: &str) -> DashboardError {
    DashboardError::UserInput(format!("{} (run `dashboard help` for usage)", message))
}

/// Removes `--flag value` from `args` and returns the value.
fn take_option(args: &mut Vec<String>, flag: &str) -> Result<Option<String>, DashboardError> {
    match args.iter().position(|a| a == flag) {
        Some(i) => {
            if i + 1 >= args.len() {
                return Err(usage(&format!("{} needs a value", flag)));
            }
            let value = args.remove(i + 1);
            args.remove(i);
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn take_number(args: &mut Vec<String>, flag: &str) -> Result<Option<f64>, DashboardError> {
    take_option(args, flag)?
        .map(|v| {
            v.parse::<f64>()
                .map_err(|_| usage(&format!("{} must be a number, got '{}'", flag, v)))
        })
        .transpose()
}

fn one(args: &[String], what: &str) -> Result<String, DashboardError> {
    match args {
        [value] => Ok(value.clone()),
        [] => Err(usage(&format!("missing {}", what))),
        _ => Err(usage(&format!("expected a single {}", what))),
    }
}

fn ticker_and_metrics(args: &[String], head: &str) -> Result<(String, Vec<String>), DashboardError> {
    match args.split_first() {
        Some((first, rest)) if !rest.is_empty() => Ok((first.clone(), rest.to_vec())),
        Some(_) => Err(usage("at least one metric is required")),
        None => Err(usage(&format!("missing {}", head))),
    }
}

/// Parse the arguments after the program name.
pub fn parse_args(args: &[String]) -> Result<Invocation, DashboardError> {
    let mut args = args.to_vec();

    let market = take_option(&mut args, "--market")?
        .map(|m| m.parse::<Market>().map_err(|e| usage(&e)))
        .transpose()?;

    let Some((head, rest)) = args.split_first() else {
        return Ok(Invocation { command: Command::Help, market });
    };
    let mut rest = rest.to_vec();

    let command = match head.as_str() {
        "help" | "--help" | "-h" => Command::Help,
        "quote" => Command::Quote { ticker: one(&rest, "ticker")? },
        "price" => {
            let range = take_option(&mut rest, "--range")?
                .map(|r| r.parse::<PriceRange>().map_err(|e| usage(&e)))
                .transpose()?
                .unwrap_or(PriceRange::OneMonth);
            Command::Price { ticker: one(&rest, "ticker")?, range }
        }
        "statement" => Command::Statement { ticker: one(&rest, "ticker")? },
        "trend" => {
            let (ticker, metrics) = ticker_and_metrics(&rest, "ticker")?;
            Command::Trend { ticker, metrics }
        }
        "compare" => {
            let (folder, metrics) = ticker_and_metrics(&rest, "folder")?;
            Command::Compare { folder, metrics }
        }
        "flows" => Command::Flows { ticker: one(&rest, "ticker")? },
        "metrics" => Command::Metrics,
        "folders" => Command::Folders,
        "formulas" => Command::Formulas,
        "folder" => parse_folder(&mut rest)?,
        "formula" => parse_formula(&rest)?,
        other => return Err(usage(&format!("unknown command '{}'", other))),
    };

    Ok(Invocation { command, market })
}

fn parse_folder(args: &mut Vec<String>) -> Result<Command, DashboardError> {
    if args.is_empty() {
        return Err(usage("folder needs create, delete, add or remove"));
    }
    let action = args.remove(0);

    match action.as_str() {
        "create" => Ok(Command::CreateFolder { name: one(args, "folder name")? }),
        "delete" => Ok(Command::DeleteFolder { name: one(args, "folder name")? }),
        "add" => {
            let cost = take_number(args, "--cost")?;
            let shares = take_number(args, "--shares")?;
            let holding = (cost.is_some() || shares.is_some()).then_some(Holding { cost, shares });
            match args.as_slice() {
                [folder, ticker] => Ok(Command::AddTicker {
                    folder: folder.clone(),
                    ticker: ticker.clone(),
                    holding,
                }),
                _ => Err(usage("usage: folder add <folder> <ticker>")),
            }
        }
        "remove" => match args.as_slice() {
            [folder, ticker] => Ok(Command::RemoveTicker {
                folder: folder.clone(),
                ticker: ticker.clone(),
            }),
            _ => Err(usage("usage: folder remove <folder> <ticker>")),
        },
        other => Err(usage(&format!("unknown folder action '{}'", other))),
    }
}

fn parse_formula(args: &[String]) -> Result<Command, DashboardError> {
    match args.split_first() {
        Some((action, rest)) if action == "add" => {
            // Everything before `=` is the name, everything after the expression
            let eq = rest
                .iter()
                .position(|a| a == "=")
                .ok_or_else(|| usage("usage: formula add <name> = <expression>"))?;
            Ok(Command::AddFormula {
                name: rest[..eq].join(" "),
                expression: rest[eq + 1..].join(" "),
            })
        }
        Some((action, rest)) if action == "delete" => Ok(Command::DeleteFormula {
            name: rest.join(" "),
        }),
        Some((action, rest)) if action == "check" => match rest {
            [name, ticker] => Ok(Command::CheckFormula {
                name: name.clone(),
                ticker: ticker.clone(),
            }),
            _ => Err(usage("usage: formula check <name> <ticker>")),
        },
        Some((action, _)) if action == "build" => Ok(Command::BuildFormula),
        Some((other, _)) => Err(usage(&format!("unknown formula action '{}'", other))),
        None => Err(usage("formula needs add, delete, check or build")),
    }
}

pub const HELP: &str = "\
Usage: dashboard [--market tw|us] <command>

Data:
  quote <ticker>                     Price summary and EPS
  price <ticker> [--range R]         Price chart (today, 5d, 1mo, 1y, 5y)
  statement <ticker>                 Income statement by period
  trend <ticker> <metric>...         Metrics over time
  compare <folder> <metric>...       Latest metrics for every ticker in a folder
  flows <ticker>                     Institutional activity
  metrics                            Every metric name trend and compare accept

Watchlists:
  folders
  folder create|delete <name>
  folder add <folder> <ticker> [--cost N] [--shares N]
  folder remove <folder> <ticker>

Formulas:
  formulas
  formula add <name> = <expression>
  formula delete <name>
  formula check <name> <ticker>      Evaluate and report formula errors
  formula build                      Interactive builder";

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn parse(items: &[&str]) -> Result<Invocation, DashboardError> {
        parse_args(&args(items))
    }

    #[test]
    fn test_data_commands() {
        assert_eq!(
            parse(&["price", "2330", "--range", "5d"]).unwrap().command,
            Command::Price { ticker: "2330".into(), range: PriceRange::FiveDays }
        );
        assert_eq!(
            parse(&["price", "TSLA"]).unwrap().command,
            Command::Price { ticker: "TSLA".into(), range: PriceRange::OneMonth }
        );
        assert_eq!(
            parse(&["trend", "AAPL", "Total Revenue", "Net Margin"]).unwrap().command,
            Command::Trend {
                ticker: "AAPL".into(),
                metrics: vec!["Total Revenue".into(), "Net Margin".into()],
            }
        );
        assert!(parse(&["compare", "Blue Chips"]).is_err());
    }

    #[test]
    fn test_market_override_anywhere() {
        let invocation = parse(&["quote", "--market", "tw", "2330"]).unwrap();
        assert_eq!(invocation.market, Some(Market::Taiwan));
        assert_eq!(invocation.command, Command::Quote { ticker: "2330".into() });

        assert!(parse(&["quote", "2330", "--market"]).is_err());
        assert!(parse(&["quote", "2330", "--market", "jp"]).is_err());
    }

    #[test]
    fn test_folder_commands() {
        assert_eq!(
            parse(&["folder", "add", "Semis", "2330", "--cost", "600", "--shares", "1000"])
                .unwrap()
                .command,
            Command::AddTicker {
                folder: "Semis".into(),
                ticker: "2330".into(),
                holding: Some(Holding { cost: Some(600.0), shares: Some(1000.0) }),
            }
        );
        assert_eq!(
            parse(&["folder", "remove", "Semis", "2330"]).unwrap().command,
            Command::RemoveTicker { folder: "Semis".into(), ticker: "2330".into() }
        );
        assert!(parse(&["folder", "add", "Semis", "2330", "--cost", "cheap"]).is_err());
        assert!(parse(&["folder", "rename", "Semis"]).is_err());
    }

    #[test]
    fn test_formula_commands() {
        assert_eq!(
            parse(&["formula", "add", "Net", "Margin", "=", "Net Income", "/", "Total Revenue"])
                .unwrap()
                .command,
            Command::AddFormula {
                name: "Net Margin".into(),
                expression: "Net Income / Total Revenue".into(),
            }
        );
        assert!(parse(&["formula", "add", "Net Margin"]).is_err());
        assert_eq!(parse(&["formula", "build"]).unwrap().command, Command::BuildFormula);
        assert_eq!(
            parse(&["formula", "check", "Net Margin", "2330"]).unwrap().command,
            Command::CheckFormula { name: "Net Margin".into(), ticker: "2330".into() }
        );
        assert!(parse(&["formula", "check", "Net Margin"]).is_err());
    }

    #[test]
    fn test_metrics_command_is_documented() {
        assert_eq!(parse(&["metrics"]).unwrap().command, Command::Metrics);
        assert!(HELP.lines().any(|l| l.trim_start().starts_with("metrics")));
        assert!(HELP.contains("formula check"));
    }

    #[test]
    fn test_no_arguments_is_help() {
        assert_eq!(parse(&[]).unwrap().command, Command::Help);
        assert!(parse(&["frobnicate"]).is_err());
    }
}
