// Mon Oct 19 2026 - Alex

use crate::emit::{EmitError, TargetWidth};
use std::fmt;
use std::ops::Index;

/// Bad-character advance distances, one slot per byte value.
#[derive(Clone, PartialEq, Eq)]
pub struct SkipTable {
    entries: [usize; 256],
}

impl SkipTable {
    pub fn new(entries: [usize; 256]) -> Self {
        Self { entries }
    }

    pub fn filled(distance: usize) -> Self {
        Self { entries: [distance; 256] }
    }

    pub fn from_entries<I>(default: usize, entries: I) -> Self
    where
        I: IntoIterator<Item = (u8, usize)>,
    {
        let mut table = Self::filled(default);
        for (byte, distance) in entries {
            table.entries[byte as usize] = distance;
        }
        table
    }

    pub fn get(&self, byte: u8) -> usize {
        self.entries[byte as usize]
    }

    pub fn min_skip(&self) -> usize {
        self.entries.iter().copied().min().unwrap_or(0)
    }

    pub fn max_skip(&self) -> usize {
        self.entries.iter().copied().max().unwrap_or(0)
    }

    /// Lays the table out as native-endian slots of the target's entry width.
    pub fn to_bytes(&self, target: TargetWidth) -> Result<Vec<u8>, EmitError> {
        let mut out = Vec::with_capacity(256 * target.pointer_bytes());

        for (byte, &distance) in self.entries.iter().enumerate() {
            match target {
                TargetWidth::Bits64 => {
                    out.extend_from_slice(&(distance as u64).to_ne_bytes());
                }
                TargetWidth::Bits32 => {
                    let slot = u32::try_from(distance).map_err(|_| EmitError::SkipTooLarge {
                        byte: byte as u8,
                        distance,
                    })?;
                    out.extend_from_slice(&slot.to_ne_bytes());
                }
            }
        }

        Ok(out)
    }
}

impl Index<u8> for SkipTable {
    type Output = usize;

    fn index(&self, byte: u8) -> &usize {
        &self.entries[byte as usize]
    }
}

impl fmt::Debug for SkipTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipTable")
            .field("min", &self.min_skip())
            .field("max", &self.max_skip())
            .finish()
    }
}
