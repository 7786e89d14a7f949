//! Dashboard
//!
//! Resolves metric names against ratio snapshots, saved formulas and statement
//! columns, and turns the results into chart descriptions: trend lines, peer
//! comparisons, statement tables, price charts and institutional activity.
//! A [`Session`] ties these to the durable state and the data service.

pub mod chart;
pub mod cli;
pub mod metrics;
pub mod ratios;
pub mod renderer;
pub mod session;

pub use chart::{Chart, ChartSink, Series, TerminalSink};
pub use cli::{parse_args, Command, Invocation};
pub use renderer::{PeerComparison, PeerData, PeerRow, PriceChart, PriceSummary, TrendChart};
pub use session::{BuilderStep, Session};
