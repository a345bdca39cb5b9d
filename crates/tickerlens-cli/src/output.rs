use std::io::{self, Write};

use serde_json::Value;
use tickerlens_core::{Card, Envelope};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Titled text table shown by `--format table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableBlock {
    pub fn new(title: impl Into<String>, header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            title: title.into(),
            header,
            rows,
        }
    }

    /// One row per card: label, value, delta.
    pub fn cards<'a>(title: impl Into<String>, cards: impl IntoIterator<Item = &'a Card>) -> Self {
        let rows = cards
            .into_iter()
            .map(|card| {
                vec![
                    card.label.clone(),
                    card.value.clone(),
                    card.delta.clone().unwrap_or_default(),
                ]
            })
            .collect();
        Self::new(
            title,
            ["metric", "value", "delta"].map(String::from).to_vec(),
            rows,
        )
    }
}

/// Command result ready for rendering.
pub struct CommandOutput {
    pub envelope: Envelope<Value>,
    pub blocks: Vec<TableBlock>,
}

pub fn render(output: &CommandOutput, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(&output.envelope)?
            } else {
                serde_json::to_string(&output.envelope)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Table => write_table(&mut out, output)?,
    }

    Ok(())
}

fn write_table<W: Write>(out: &mut W, output: &CommandOutput) -> io::Result<()> {
    let meta = &output.envelope.meta;
    writeln!(out, "request_id  : {}", meta.request_id)?;
    writeln!(out, "generated_at: {}", meta.generated_at)?;
    writeln!(out, "source      : {}", meta.source)?;
    writeln!(out, "latency_ms  : {}", meta.latency_ms)?;

    for block in &output.blocks {
        writeln!(out)?;
        writeln!(out, "{}", block.title)?;
        write_grid(out, &block.header, &block.rows)?;
    }

    if !meta.warnings.is_empty() {
        writeln!(out)?;
        writeln!(out, "warnings:")?;
        for warning in &meta.warnings {
            writeln!(out, "  - {warning}")?;
        }
    }

    if !output.envelope.errors.is_empty() {
        writeln!(out)?;
        writeln!(out, "errors:")?;
        for error in &output.envelope.errors {
            match &error.symbol {
                Some(symbol) => writeln!(out, "  - [{symbol}] {}: {}", error.code, error.message)?,
                None => writeln!(out, "  - {}: {}", error.code, error.message)?,
            }
        }
    }

    Ok(())
}

fn write_grid<W: Write>(out: &mut W, header: &[String], rows: &[Vec<String>]) -> io::Result<()> {
    let mut widths: Vec<usize> = header.iter().map(|cell| cell.chars().count()).collect();
    for row in rows {
        for (column, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(column) {
                Some(width) => *width = (*width).max(len),
                None => widths.push(len),
            }
        }
    }

    write_line(out, header, &widths)?;
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    write_line(out, &rule, &widths)?;
    if rows.is_empty() {
        writeln!(out, "(no rows)")?;
    }
    for row in rows {
        write_line(out, row, &widths)?;
    }
    Ok(())
}

fn write_line<W: Write>(out: &mut W, cells: &[String], widths: &[usize]) -> io::Result<()> {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(out, "{}", line.trim_end())
}
