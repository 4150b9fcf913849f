// Mon Oct 19 2026 - Alex

use crate::pattern::{PatternError, SkipTable};
use std::fmt;

pub const MASK_WILDCARD: u8 = 0x00;
pub const MASK_EXACT: u8 = 0xFF;

/// A pre-built masked byte pattern, ready to be compiled.
///
/// Positions `0..trimmed_size` are compared; the remaining trailing
/// positions only widen the scan window. Expected bytes are stored
/// already ANDed with their mask.
#[derive(Debug, Clone)]
pub struct Pattern {
    bytes: Vec<u8>,
    masks: Vec<u8>,
    trimmed_size: usize,
    skip_table: Option<Box<SkipTable>>,
    skip_index: usize,
    name: Option<String>,
}

impl Pattern {
    pub fn new(bytes: Vec<u8>, masks: Vec<u8>, trimmed_size: usize) -> Result<Self, PatternError> {
        if bytes.len() != masks.len() {
            return Err(PatternError::LengthMismatch {
                bytes: bytes.len(),
                masks: masks.len(),
            });
        }

        if trimmed_size > bytes.len() {
            return Err(PatternError::TrimmedSizeOutOfRange {
                trimmed: trimmed_size,
                size: bytes.len(),
            });
        }

        let bytes = bytes
            .iter()
            .zip(masks.iter())
            .map(|(&byte, &mask)| byte & mask)
            .collect();

        Ok(Self {
            bytes,
            masks,
            trimmed_size,
            skip_table: None,
            skip_index: 0,
            name: None,
        })
    }

    pub fn with_skip_table(self, table: SkipTable, skip_index: usize) -> Result<Self, PatternError> {
        if skip_index >= self.bytes.len() {
            return Err(PatternError::SkipIndexOutOfRange {
                index: skip_index,
                size: self.bytes.len(),
            });
        }

        if self.masks[skip_index] != MASK_EXACT {
            return Err(PatternError::SkipIndexNotExact(skip_index));
        }

        if let Some(byte) = (0..=255u8).find(|&b| table.get(b) == 0) {
            return Err(PatternError::ZeroSkip(byte));
        }

        // current <= end - full_size, so a bounded advance cannot wrap.
        let size = self.full_size();
        if let Some(byte) = (0..=255u8).find(|&b| table.get(b) > size) {
            return Err(PatternError::SkipTooLong {
                byte,
                distance: table.get(byte),
                size,
            });
        }

        Ok(self.with_skip_table_unchecked(table, skip_index))
    }

    /// Attaches `table` without validating it.
    pub(crate) fn with_skip_table_unchecked(mut self, table: SkipTable, skip_index: usize) -> Self {
        self.skip_table = Some(Box::new(table));
        self.skip_index = skip_index;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn masks(&self) -> &[u8] {
        &self.masks
    }

    pub fn full_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn trimmed_size(&self) -> usize {
        self.trimmed_size
    }

    pub fn is_degenerate(&self) -> bool {
        self.trimmed_size == 0
    }

    pub fn skip_table(&self) -> Option<&SkipTable> {
        self.skip_table.as_deref()
    }

    pub fn skip_index(&self) -> usize {
        self.skip_index
    }

    /// Checks a single alignment the same way the compiled routine does.
    pub fn matches(&self, data: &[u8]) -> bool {
        if data.len() < self.full_size() {
            return false;
        }

        (0..self.trimmed_size).rev().all(|i| {
            let mask = self.masks[i];
            mask == MASK_WILDCARD || data[i] & mask == self.bytes[i]
        })
    }

    pub fn compared_byte_count(&self) -> usize {
        self.masks[..self.trimmed_size]
            .iter()
            .filter(|&&m| m != MASK_WILDCARD)
            .count()
    }

    pub fn to_hex_string(&self) -> String {
        self.bytes
            .iter()
            .zip(self.masks.iter())
            .map(|(b, &m)| match m {
                MASK_WILDCARD => "??".to_string(),
                MASK_EXACT => format!("{:02X}", b),
                _ => format!("{:02X}&{:02X}", b, m),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref name) = self.name {
            write!(f, "{}: ", name)?;
        }
        write!(f, "{}", self.to_hex_string())
    }
}
