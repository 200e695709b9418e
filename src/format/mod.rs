//! Output format module implementation

mod csv;
mod json;
mod text;

pub use self::csv::*;
pub use self::json::*;
pub use self::text::*;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Serialize;

use crate::line::{Annotations, DataKind, FullInstruction};
use crate::strategy::{Disassembler, HaltReason, Listing, Tracer};
use crate::symbols::Symbol;
use crate::{DisassemblyError, InstructionLike};

/// Supported output formats for listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Assembler source (default)
    #[default]
    Text,
    /// JSON format (hierarchical)
    Json,
    /// JSON Lines format (one JSON object per line)
    JsonLines,
    /// CSV format (comma-separated values)
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonLines => write!(f, "jsonl"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "asm" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "jsonlines" => Ok(OutputFormat::JsonLines),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl OutputFormat {
    /// Get all available output formats
    pub fn available_formats() -> &'static [Self] {
        &[
            OutputFormat::Text,
            OutputFormat::Json,
            OutputFormat::JsonLines,
            OutputFormat::Csv,
        ]
    }

    /// Get a formatter for this output format
    pub fn get_formatter(&self) -> Box<dyn ListingFormatter> {
        match self {
            OutputFormat::Text => Box::new(TextFormatter::default()),
            OutputFormat::Json => Box::new(JsonFormatter),
            OutputFormat::JsonLines => Box::new(JsonLinesFormatter),
            OutputFormat::Csv => Box::new(CsvFormatter),
        }
    }
}

/// Renders individual listing lines; one method per line variant.
///
/// [`InstructionLike::disassemble`](crate::InstructionLike::disassemble)
/// dispatches here, handing over the disassembler for symbol lookups.
pub trait Dialect {
    fn instruction(
        &self,
        address: u16,
        instruction: &FullInstruction,
        notes: &Annotations,
        dis: &Disassembler<'_>,
    ) -> String;

    fn data(&self, address: u16, kind: DataKind, bytes: &[u8], notes: &Annotations, dis: &Disassembler<'_>)
        -> String;

    fn pc_assignment(&self, address: u16) -> String;

    fn symbol_definition(&self, symbol: &Symbol) -> String;

    fn blank(&self, notes: &Annotations) -> String;
}

/// Formatter trait for whole listings
pub trait ListingFormatter {
    /// Format a listing produced from `dis`'s file
    fn format(&self, listing: &Listing, dis: &Disassembler<'_>) -> Result<String, DisassemblyError>;
}

/// Format listings as assembler source
#[derive(Debug, Default)]
pub struct TextFormatter {
    pub dialect: TextDialect,
}

/// Format listings in JSON
pub struct JsonFormatter;

/// Format listings in JSON Lines
pub struct JsonLinesFormatter;

/// Format listings in CSV
pub struct CsvFormatter;

impl ListingFormatter for TextFormatter {
    fn format(&self, listing: &Listing, dis: &Disassembler<'_>) -> Result<String, DisassemblyError> {
        let mut output = String::new();
        for line in &listing.lines {
            let rendered = line.disassemble(&self.dialect, dis);
            let executed = match line {
                InstructionLike::Instruction { address, .. } | InstructionLike::Data { address, .. } => {
                    listing.is_executed(*address)
                }
                _ => false,
            };
            for (i, text) in rendered.lines().enumerate() {
                // mark the instruction row, not its label rows
                let last = i + 1 == rendered.lines().count();
                output.push_str(if executed && last { "> " } else { "  " });
                output.push_str(text);
                output.push('\n');
            }
        }
        if let Some(report) = &listing.report {
            output.push_str(&format!(
                "\n; trace: {} steps, {} threads, {} executed, {} read, {} written{}\n",
                report.steps,
                report.threads,
                report.executed.len(),
                report.read.len(),
                report.written.len(),
                if report.complete { "" } else { " (incomplete)" }
            ));
        }
        Ok(output)
    }
}

/// Address in listing notation.
pub(crate) fn hex_address(address: u16) -> String {
    format!("${:04x}", address)
}

pub(crate) fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Serializable summary of a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceReport {
    pub steps: usize,
    pub threads: usize,
    /// No thread was left running.
    pub complete: bool,
    pub executed: Vec<String>,
    pub read: Vec<String>,
    pub written: Vec<String>,
    pub halts: Vec<ThreadReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadReport {
    pub id: usize,
    pub parent: Option<usize>,
    pub pc: String,
    pub reason: Option<HaltReason>,
}

impl TraceReport {
    pub fn from_tracer(tracer: &Tracer<'_>) -> Self {
        let hex = |set: BTreeSet<u16>| -> Vec<String> { set.into_iter().map(hex_address).collect() };
        Self {
            steps: tracer.steps(),
            threads: tracer.threads().len(),
            complete: !tracer.running(),
            executed: hex(tracer.executed_addresses()),
            read: hex(tracer.get_read()),
            written: hex(tracer.get_written()),
            halts: tracer
                .threads()
                .iter()
                .map(|t| ThreadReport {
                    id: t.id(),
                    parent: t.parent(),
                    pc: hex_address(t.pc()),
                    reason: t.halt_reason(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, DisassemblyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
