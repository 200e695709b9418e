//! JSON and JSON Lines output formatters

use std::collections::BTreeMap;

use serde::Serialize;

use crate::line::{DataKind, InstructionLike};
use crate::strategy::{Disassembler, Listing};
use crate::DisassemblyError;

use super::{hex_address, hex_bytes, ListingFormatter, TextDialect, TraceReport};

/// Serializable listing line, shared by the structured formatters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineRecord {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub size: usize,
    pub bytes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand: Option<String>,
    pub labels: Vec<String>,
    pub comments: Vec<String>,
    /// `None` when no trace was run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed: Option<bool>,
}

impl LineRecord {
    pub fn new(line: &InstructionLike, listing: &Listing, dis: &Disassembler<'_>) -> Self {
        let dialect = TextDialect::default();
        let notes = line.notes().cloned().unwrap_or_default();
        let (kind, mnemonic, operand, labels) = match line {
            InstructionLike::Instruction { address, instruction, .. } => {
                let operand = dialect.operand(*address, instruction, dis);
                (
                    "instruction",
                    Some(instruction.op().mnemonic().to_lowercase()),
                    (!operand.is_empty()).then_some(operand),
                    notes.labels,
                )
            }
            InstructionLike::Data { kind, .. } => (data_kind(*kind), None, None, notes.labels),
            InstructionLike::PcAssignment { .. } => ("pc", None, None, notes.labels),
            InstructionLike::SymbolDefinition(symbol) => ("symbol", None, None, vec![symbol.name.clone()]),
            InstructionLike::Blank { .. } => ("blank", None, None, notes.labels),
        };
        let executed = match (line, &listing.executed) {
            (
                InstructionLike::Instruction { address, .. } | InstructionLike::Data { address, .. },
                Some(executed),
            ) => Some(executed.contains(address)),
            (_, Some(_)) => Some(false),
            (_, None) => None,
        };
        Self {
            kind,
            address: line.address().map(hex_address),
            size: line.len(),
            bytes: hex_bytes(line.bytes()),
            mnemonic,
            operand,
            labels,
            comments: notes.comments,
            executed,
        }
    }
}

fn data_kind(kind: DataKind) -> &'static str {
    match kind {
        DataKind::Bytes => "bytes",
        DataKind::Words => "words",
        DataKind::Text => "text",
        DataKind::Signature => "signature",
    }
}

/// Serializable listing for JSON output
#[derive(Serialize)]
struct ListingJson<'a> {
    file: &'a str,
    base_address: String,
    lines: Vec<LineRecord>,
    stats: &'a BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<&'a TraceReport>,
}

impl ListingFormatter for super::JsonFormatter {
    fn format(&self, listing: &Listing, dis: &Disassembler<'_>) -> Result<String, DisassemblyError> {
        let result = ListingJson {
            file: dis.source_name(),
            base_address: hex_address(dis.segment_base_address()),
            lines: listing.lines.iter().map(|l| LineRecord::new(l, listing, dis)).collect(),
            stats: dis.stats(),
            trace: listing.report.as_ref(),
        };
        Ok(serde_json::to_string_pretty(&result)?)
    }
}

impl ListingFormatter for super::JsonLinesFormatter {
    fn format(&self, listing: &Listing, dis: &Disassembler<'_>) -> Result<String, DisassemblyError> {
        let mut output = String::new();
        for line in &listing.lines {
            output.push_str(&serde_json::to_string(&LineRecord::new(line, listing, dis))?);
            output.push('\n');
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Mos6502Decoder;
    use crate::format::{JsonFormatter, JsonLinesFormatter};
    use crate::memory::{Endian, Memory};
    use crate::parser::CartParser;
    use crate::strategy::{Strategy, TracerOptions};
    use crate::MetaParser;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn cartridge() -> Vec<u8> {
        // vectors, CBM80, SEI / JMP $8009 at $8009
        let mut cart = vec![0x09, 0x80, 0x09, 0x80, 0xC3, 0xC2, 0xCD, 0x38, 0x30];
        cart.extend([0x78, 0x4C, 0x09, 0x80]);
        cart
    }

    #[test]
    fn test_json_listing() {
        let bytes = cartridge();
        let meta = CartParser::c64().parse(&bytes).unwrap();
        let file = Memory::from_bytes("cart.bin", bytes, Endian::Little);
        let listing = Strategy::Trace
            .run(&file, &meta, Mos6502Decoder::documented(), TracerOptions::default())
            .unwrap();
        let mut dis = Disassembler::new(&file, &meta);
        dis.by_ref().for_each(drop);

        let json: Value = serde_json::from_str(&JsonFormatter.format(&listing, &dis).unwrap()).unwrap();
        assert_eq!(json["base_address"], "$8000");
        let lines = json["lines"].as_array().unwrap();
        assert_eq!(lines[0]["type"], "pc");
        assert_eq!(lines[1]["type"], "words");
        assert_eq!(lines[1]["labels"][0], "vectors");
        assert_eq!(lines[2]["type"], "signature");
        assert_eq!(lines[3]["mnemonic"], "sei");
        assert_eq!(lines[3]["executed"], true);
        assert_eq!(lines[4]["operand"], "$8009");
        assert_eq!(json["stats"]["edicts"], 2);
        assert_eq!(json["trace"]["complete"], true);
    }

    #[test]
    fn test_json_lines_one_object_per_line() {
        let bytes = cartridge();
        let meta = CartParser::c64().parse(&bytes).unwrap();
        let file = Memory::from_bytes("cart.bin", bytes, Endian::Little);
        let listing = Strategy::Linear
            .run(&file, &meta, Mos6502Decoder::documented(), TracerOptions::default())
            .unwrap();
        let dis = Disassembler::new(&file, &meta);
        let output = JsonLinesFormatter.format(&listing, &dis).unwrap();
        let rows: Vec<Value> = output.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(rows.len(), listing.lines.len());
        assert!(rows.iter().all(|r| r.get("executed").is_none()));
        assert_eq!(rows[3]["bytes"], "78");
    }
}
