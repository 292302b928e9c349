//! Output helpers shared by the commands.

use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};
use tabwriter::TabWriter;

/// Output format for listings and summaries.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned table for reading in a terminal
    #[default]
    Table,
    /// One pretty-printed JSON array
    Json,
    /// One JSON object per line
    Jsonl,
    /// Comma-separated values with a header row
    Csv,
}

impl OutputFormat {
    pub fn is_machine_readable(&self) -> bool {
        matches!(self, Self::Json | Self::Jsonl | Self::Csv)
    }
}

/// Rows that can be printed in any [`OutputFormat`].
pub trait TableRow: Serialize {
    fn header() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

pub fn write_rows<T: TableRow, W: Write>(
    rows: &[T],
    format: OutputFormat,
    writer: &mut W,
) -> io::Result<()> {
    match format {
        OutputFormat::Table => write_table(rows, writer),
        OutputFormat::Json => write_json(&rows, writer, true),
        OutputFormat::Jsonl => write_jsonl(rows, writer),
        OutputFormat::Csv => write_csv(rows, writer),
    }
}

pub fn write_table<T: TableRow, W: Write>(rows: &[T], writer: &mut W) -> io::Result<()> {
    let mut tw = TabWriter::new(writer);
    writeln!(tw, "{}", T::header().join("\t"))?;
    for row in rows {
        writeln!(tw, "{}", row.cells().join("\t"))?;
    }
    tw.flush()
}

pub fn write_json<W: Write, T: Serialize>(data: &T, writer: &mut W, pretty: bool) -> io::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, data).map_err(io::Error::other)?;
    } else {
        serde_json::to_writer(&mut *writer, data).map_err(io::Error::other)?;
    }
    writeln!(writer)?;
    Ok(())
}

pub fn write_jsonl<W: Write, T: Serialize>(data: &[T], writer: &mut W) -> io::Result<()> {
    for item in data {
        serde_json::to_writer(&mut *writer, item).map_err(io::Error::other)?;
        writeln!(writer)?;
    }
    Ok(())
}

pub fn write_csv<W: Write, T: Serialize>(data: &[T], writer: &mut W) -> io::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for item in data {
        csv.serialize(item).map_err(io::Error::other)?;
    }
    csv.flush()
}
