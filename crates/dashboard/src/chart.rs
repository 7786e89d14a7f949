//! Chart descriptions and the sinks that draw them.

use dashboard_core::DashboardError;
use serde::Serialize;
use std::io::Write;

/// One named numeric series of (label, value) points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Chart {
    /// Multi-series time chart; x labels are the union of every series' labels.
    Line { title: String, series: Vec<Series> },
    /// Bars grouped by category, one bar per series.
    GroupedBar {
        title: String,
        categories: Vec<String>,
        series: Vec<Series>,
    },
    Table {
        title: String,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Nothing to draw; the message says why.
    Empty { title: String, message: String },
}

impl Chart {
    pub fn title(&self) -> &str {
        match self {
            Chart::Line { title, .. }
            | Chart::GroupedBar { title, .. }
            | Chart::Table { title, .. }
            | Chart::Empty { title, .. } => title,
        }
    }
}

/// Charting collaborator. Rendering never changes dashboard data.
pub trait ChartSink {
    fn render(&mut self, chart: &Chart) -> Result<(), DashboardError>;
}

/// Number as shown in text output.
pub fn format_number(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else {
        format!("{:.2}", value)
    }
}

/// Draws charts as aligned text tables.
pub struct TerminalSink<W: Write> {
    out: W,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_table(&mut self, columns: &[String], rows: &[Vec<String>]) -> std::io::Result<()> {
        let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (cell, w))| {
                    if i == 0 {
                        format!("{:<w$}", cell, w = *w)
                    } else {
                        format!("{:>w$}", cell, w = *w)
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
        };

        writeln!(self.out, "{}", line(columns))?;
        let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        writeln!(self.out, "{}", "-".repeat(total))?;
        for row in rows {
            writeln!(self.out, "{}", line(row))?;
        }
        Ok(())
    }

    fn write_chart(&mut self, chart: &Chart) -> std::io::Result<()> {
        writeln!(self.out, "== {} ==", chart.title())?;

        match chart {
            Chart::Line { series, .. } => {
                let mut labels: Vec<&str> = series
                    .iter()
                    .flat_map(|s| s.points.iter().map(|(label, _)| label.as_str()))
                    .collect();
                labels.sort();
                labels.dedup();

                let mut columns = vec!["Period".to_string()];
                columns.extend(series.iter().map(|s| s.name.clone()));

                let rows: Vec<Vec<String>> = labels
                    .iter()
                    .map(|label| {
                        let mut row = vec![label.to_string()];
                        row.extend(series.iter().map(|s| {
                            s.points
                                .iter()
                                .find(|(l, _)| l == label)
                                .map(|(_, v)| format_number(*v))
                                .unwrap_or_else(|| "-".to_string())
                        }));
                        row
                    })
                    .collect();
                self.write_table(&columns, &rows)?;
            }
            Chart::GroupedBar {
                categories, series, ..
            } => {
                let mut columns = vec![String::new()];
                columns.extend(series.iter().map(|s| s.name.clone()));

                let rows: Vec<Vec<String>> = categories
                    .iter()
                    .map(|category| {
                        let mut row = vec![category.clone()];
                        row.extend(series.iter().map(|s| {
                            s.points
                                .iter()
                                .find(|(c, _)| c == category)
                                .map(|(_, v)| format_number(*v))
                                .unwrap_or_else(|| "0.00".to_string())
                        }));
                        row
                    })
                    .collect();
                self.write_table(&columns, &rows)?;
            }
            Chart::Table { columns, rows, .. } => self.write_table(columns, rows)?,
            Chart::Empty { message, .. } => writeln!(self.out, "{}", message)?,
        }

        writeln!(self.out)
    }
}

impl<W: Write> ChartSink for TerminalSink<W> {
    fn render(&mut self, chart: &Chart) -> Result<(), DashboardError> {
        self.write_chart(chart)?;
        Ok(())
    }
}
