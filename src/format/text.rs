//! Assembler-style rendering of listing lines.

use crate::isa::AddressingMode;
use crate::line::{Annotations, DataKind, FullInstruction};
use crate::strategy::Disassembler;
use crate::symbols::Symbol;

use super::{hex_address, hex_bytes, Dialect};

/// Data values per `.byte`/`.word` row.
const VALUES_PER_ROW: usize = 8;

/// 64tass-flavoured source: `addr  bytes  mnemonic operand ; comment`.
#[derive(Debug, Clone)]
pub struct TextDialect {
    /// Emit lowercase mnemonics.
    pub lowercase: bool,
    /// Show the address and raw bytes in front of each row.
    pub show_bytes: bool,
}

impl Default for TextDialect {
    fn default() -> Self {
        Self {
            lowercase: true,
            show_bytes: true,
        }
    }
}

impl TextDialect {
    fn mnemonic(&self, mnemonic: &str) -> String {
        if self.lowercase {
            mnemonic.to_lowercase()
        } else {
            mnemonic.to_uppercase()
        }
    }

    /// Symbol name for `address`, or the address itself.
    fn reference(&self, address: u16, dis: &Disassembler<'_>) -> String {
        dis.get_symbol(address)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| hex_address(address))
    }

    pub(crate) fn operand(&self, address: u16, instruction: &FullInstruction, dis: &Disassembler<'_>) -> String {
        let mode = instruction.mode();
        let value = match mode {
            AddressingMode::Implied | AddressingMode::Accumulator => String::new(),
            AddressingMode::Immediate => format!("${:02x}", instruction.operand()),
            AddressingMode::Relative => match instruction.target(address) {
                Some(target) => self.reference(target, dis),
                None => String::new(),
            },
            _ if mode.operand_bytes() == 1 => match dis.get_symbol(instruction.operand()) {
                Some(symbol) => symbol.name.clone(),
                None => format!("${:02x}", instruction.operand()),
            },
            _ => self.reference(instruction.operand(), dis),
        };
        mode.render(&value)
    }

    /// Prefix, labels and trailing comments around one rendered row.
    fn row(&self, address: u16, bytes: &[u8], body: &str, notes: &Annotations) -> String {
        let mut out = String::new();
        for label in &notes.labels {
            out.push_str(label);
            out.push('\n');
        }
        if self.show_bytes {
            let shown = &bytes[..bytes.len().min(3)];
            let more = if bytes.len() > 3 { "+" } else { "" };
            out.push_str(&format!("{:04x}  {:<9} ", address, format!("{}{}", hex_bytes(shown), more)));
        }
        out.push_str("    ");
        out.push_str(body);
        if !notes.comments.is_empty() {
            out.push_str(" ; ");
            out.push_str(&notes.comments.join("; "));
        }
        out
    }

    /// Directive rows for a data line, each with the number of bytes it covers.
    fn values(&self, kind: DataKind, bytes: &[u8]) -> Vec<(String, usize)> {
        match kind {
            DataKind::Words => {
                let whole = bytes.len() - bytes.len() % 2;
                let mut rows: Vec<(String, usize)> = bytes[..whole]
                    .chunks(2 * VALUES_PER_ROW)
                    .map(|row| {
                        let words: Vec<String> = row
                            .chunks_exact(2)
                            .map(|pair| format!("${:04x}", u16::from_le_bytes([pair[0], pair[1]])))
                            .collect();
                        (format!(".word {}", words.join(", ")), row.len())
                    })
                    .collect();
                if let [odd] = &bytes[whole..] {
                    rows.push((format!(".byte ${:02x}", odd), 1));
                }
                rows
            }
            DataKind::Text if bytes.iter().all(|&b| (0x20..0x7F).contains(&b) && b != b'"') => {
                vec![(format!(".text \"{}\"", String::from_utf8_lossy(bytes)), bytes.len())]
            }
            _ => bytes
                .chunks(VALUES_PER_ROW)
                .map(|row| {
                    let values: Vec<String> = row.iter().map(|b| format!("${:02x}", b)).collect();
                    (format!(".byte {}", values.join(", ")), row.len())
                })
                .collect(),
        }
    }
}

impl Dialect for TextDialect {
    fn instruction(
        &self,
        address: u16,
        instruction: &FullInstruction,
        notes: &Annotations,
        dis: &Disassembler<'_>,
    ) -> String {
        let mnemonic = self.mnemonic(instruction.op().mnemonic());
        let operand = self.operand(address, instruction, dis);
        let body = if operand.is_empty() {
            mnemonic
        } else {
            format!("{} {}", mnemonic, operand)
        };
        self.row(address, instruction.bytes(), &body, notes)
    }

    fn data(&self, address: u16, kind: DataKind, bytes: &[u8], notes: &Annotations, _dis: &Disassembler<'_>) -> String {
        let rows = self.values(kind, bytes);
        let mut out = Vec::with_capacity(rows.len());
        let mut at = 0usize;
        for (i, (body, covered)) in rows.iter().enumerate() {
            // labels and comments go on the first row only
            let row_notes = if i == 0 { notes.clone() } else { Annotations::default() };
            let end = at + covered;
            out.push(self.row(address.wrapping_add(at as u16), &bytes[at..end], body, &row_notes));
            at = end;
        }
        out.join("\n")
    }

    fn pc_assignment(&self, address: u16) -> String {
        format!("* = {}", hex_address(address))
    }

    fn symbol_definition(&self, symbol: &Symbol) -> String {
        let mut out = format!("{:<8} = {}", symbol.name, hex_address(symbol.address));
        if !symbol.description.is_empty() {
            out.push_str(" ; ");
            out.push_str(&symbol.description);
        }
        out
    }

    fn blank(&self, notes: &Annotations) -> String {
        let mut out: Vec<String> = notes.labels.clone();
        out.extend(notes.comments.iter().map(|c| format!("; {}", c)));
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Endian, Memory};
    use crate::meta::DisassemblyMeta;
    use crate::symbols::SymbolTable;
    use crate::InstructionLike;

    fn render_all(content: &[u8]) -> Vec<String> {
        let mut bytes = vec![0x00, 0xC0];
        bytes.extend_from_slice(content);
        let meta = DisassemblyMeta::new(0xC000, 2, bytes.len(), SymbolTable::c64_kernal());
        let file = Memory::from_bytes("t", bytes, Endian::Little);
        let mut dis = Disassembler::new(&file, &meta);
        let lines: Vec<InstructionLike> = dis.by_ref().collect();
        let dialect = TextDialect {
            show_bytes: false,
            ..TextDialect::default()
        };
        lines.iter().map(|l| l.disassemble(&dialect, &dis)).collect()
    }

    #[test]
    fn test_operand_rendering() {
        let rendered = render_all(&[
            0xA9, 0x0F, // lda #$0f
            0x8D, 0x20, 0xD0, // sta EXTCOL
            0xB1, 0xFB, // lda ($fb),y
            0x6C, 0x14, 0x03, // jmp ($0314)
            0xD0, 0xF4, // bne $c000
            0x0A, // asl a
        ]);
        assert_eq!(rendered[0], "* = $c000");
        assert_eq!(rendered[1].trim(), "lda #$0f");
        assert_eq!(rendered[2].trim(), "sta EXTCOL");
        assert_eq!(rendered[3].trim(), "lda ($fb),y");
        assert_eq!(rendered[4].trim(), "jmp ($0314)");
        assert_eq!(rendered[5].trim(), "bne $c000");
        assert_eq!(rendered[6].trim(), "asl a");
    }

    #[test]
    fn test_illegal_bytes_render_as_byte_directive() {
        let rendered = render_all(&[0x02, 0x03]);
        assert_eq!(rendered[1].trim(), ".byte $02, $03 ; 2 illegal opcodes");
    }

    #[test]
    fn test_word_and_text_values() {
        let dialect = TextDialect::default();
        let bodies = |kind, bytes: &[u8]| -> Vec<String> {
            dialect.values(kind, bytes).into_iter().map(|(body, _)| body).collect()
        };
        assert_eq!(bodies(DataKind::Words, &[0x09, 0x80, 0x0C, 0x80]), vec![".word $8009, $800c"]);
        assert_eq!(bodies(DataKind::Text, b"HELLO"), vec![".text \"HELLO\""]);
        assert_eq!(bodies(DataKind::Text, &[0xC3, 0xC2]), vec![".byte $c3, $c2"]);
        assert_eq!(bodies(DataKind::Words, &[0x01, 0x02, 0x03]), vec![".word $0201", ".byte $03"]);
    }

    #[test]
    fn test_odd_word_tail_row_shows_its_byte() {
        let meta = DisassemblyMeta::new(0x8000, 0, 5, SymbolTable::default());
        let file = Memory::from_bytes("cart", vec![0x09, 0x80, 0x0C, 0x80, 0xC3], Endian::Little);
        let dis = Disassembler::new(&file, &meta);
        let dialect = TextDialect::default();
        let rendered = dialect.data(
            0x8000,
            DataKind::Words,
            &[0x09, 0x80, 0x0C, 0x80, 0xC3],
            &Annotations::label("vectors"),
            &dis,
        );
        let rows: Vec<&str> = rendered.lines().collect();
        assert_eq!(rows[0], "vectors");
        assert!(rows[1].starts_with("8000  09 80 0c+"));
        assert_eq!(rows[2], "8004  c3            .byte $c3");
    }

    #[test]
    fn test_symbol_definition_line() {
        let dialect = TextDialect::default();
        let symbol = SymbolTable::c64_kernal().symbol_at(0xFFD2).cloned().unwrap();
        assert_eq!(dialect.symbol_definition(&symbol), "CHROUT   = $ffd2 ; output character");
    }
}
