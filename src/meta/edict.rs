//! Offset-keyed overrides forcing a fixed interpretation of a byte range.

use crate::line::{Annotations, DataKind, InstructionLike};

/// Forces `[offset, offset + length)` of the file to be read as `kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edict {
    offset: usize,
    length: usize,
    kind: DataKind,
    notes: Annotations,
}

impl Edict {
    /// Zero lengths are widened to one byte so the edict always consumes input.
    pub fn new(offset: usize, length: usize, kind: DataKind, notes: Annotations) -> Self {
        Self {
            offset,
            length: length.max(1),
            kind,
            notes,
        }
    }

    pub fn bytes(offset: usize, length: usize, notes: Annotations) -> Self {
        Self::new(offset, length, DataKind::Bytes, notes)
    }

    /// `count` little-endian words (vectors).
    pub fn words(offset: usize, count: usize, notes: Annotations) -> Self {
        Self::new(offset, count * 2, DataKind::Words, notes)
    }

    pub fn text(offset: usize, length: usize, notes: Annotations) -> Self {
        Self::new(offset, length, DataKind::Text, notes)
    }

    pub fn signature(offset: usize, length: usize, notes: Annotations) -> Self {
        Self::new(offset, length, DataKind::Signature, notes)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes covered; never zero.
    pub fn length(&self) -> usize {
        self.length
    }

    /// One past the last byte covered.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn kind(&self) -> DataKind {
        self.kind
    }

    pub fn notes(&self) -> &Annotations {
        &self.notes
    }

    /// True if this edict fits within a file of `len` bytes.
    pub fn fits(&self, len: usize) -> bool {
        self.end() <= len
    }

    /// Build the forced line for `file`, placed at `address`.
    ///
    /// Returns `None` when the edict runs past the end of the file; the caller
    /// decides how to consume what is left.
    pub fn create(&self, file: &[u8], address: u16, extra: &Annotations) -> Option<InstructionLike> {
        if !self.fits(file.len()) {
            return None;
        }
        let bytes = &file[self.offset..self.end()];
        let mut notes = extra.clone();
        notes.merge(&self.notes);
        Some(InstructionLike::Data {
            address,
            kind: self.kind,
            bytes: bytes.to_vec(),
            notes,
        })
    }

    /// Comment explaining why this edict could not be applied.
    pub fn overflow_comment(&self, available: usize) -> String {
        format!(
            "{:?} edict of {} bytes at offset {} truncated: only {} bytes remain",
            self.kind, self.length, self.offset, available
        )
        .to_lowercase()
    }
}
