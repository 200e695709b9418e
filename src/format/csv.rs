//! CSV output formatter

use serde::Serialize;

use crate::strategy::{Disassembler, Listing};
use crate::DisassemblyError;

use super::{LineRecord, ListingFormatter};

/// Flat row; list fields are joined with `|`.
#[derive(Serialize)]
struct CsvRow<'a> {
    file: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    address: String,
    size: usize,
    bytes: String,
    mnemonic: String,
    operand: String,
    labels: String,
    comments: String,
    executed: Option<bool>,
}

impl<'a> CsvRow<'a> {
    fn new(file: &'a str, record: LineRecord) -> Self {
        Self {
            file,
            kind: record.kind,
            address: record.address.unwrap_or_default(),
            size: record.size,
            bytes: record.bytes,
            mnemonic: record.mnemonic.unwrap_or_default(),
            operand: record.operand.unwrap_or_default(),
            labels: record.labels.join("|"),
            comments: record.comments.join("|"),
            executed: record.executed,
        }
    }
}

impl ListingFormatter for super::CsvFormatter {
    fn format(&self, listing: &Listing, dis: &Disassembler<'_>) -> Result<String, DisassemblyError> {
        let mut writer = ::csv::Writer::from_writer(Vec::new());
        for line in &listing.lines {
            let row = CsvRow::new(dis.source_name(), LineRecord::new(line, listing, dis));
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| DisassemblyError::Serialization(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| DisassemblyError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Mos6502Decoder;
    use crate::format::CsvFormatter;
    use crate::memory::{Endian, Memory};
    use crate::parser::PrgParser;
    use crate::strategy::{Strategy, TracerOptions};
    use crate::MetaParser;

    #[test]
    fn test_csv_rows() {
        // LDA #$2C / STA $D020, followed by an illegal byte
        let bytes = vec![0x00, 0xC0, 0xA9, 0x2C, 0x8D, 0x20, 0xD0, 0x02];
        let meta = PrgParser::c64().parse(&bytes).unwrap();
        let file = Memory::from_bytes("border.prg", bytes, Endian::Little);
        let listing = Strategy::Trace
            .run(&file, &meta, Mos6502Decoder::documented(), TracerOptions::default())
            .unwrap();
        let dis = Disassembler::new(&file, &meta);
        let output = CsvFormatter.format(&listing, &dis).unwrap();
        let rows: Vec<&str> = output.lines().collect();

        assert_eq!(
            rows[0],
            "file,type,address,size,bytes,mnemonic,operand,labels,comments,executed"
        );
        assert_eq!(rows[1], "border.prg,symbol,$d020,0,,,,EXTCOL,,false");
        assert_eq!(rows[3], "border.prg,instruction,$c000,2,a9 2c,lda,#$2c,start,,true");
        assert_eq!(rows[5], "border.prg,bytes,$c005,1,02,,,,illegal opcode,true");
        assert_eq!(rows.len(), 6);
    }
}
