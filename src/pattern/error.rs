// Mon Oct 19 2026 - Alex

use crate::emit::EmitError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Pattern bytes and masks differ in length: {bytes} bytes, {masks} masks")]
    LengthMismatch { bytes: usize, masks: usize },
    #[error("Trimmed size {trimmed} exceeds pattern size {size}")]
    TrimmedSizeOutOfRange { trimmed: usize, size: usize },
    #[error("Skip index {index} outside pattern of {size} bytes")]
    SkipIndexOutOfRange { index: usize, size: usize },
    #[error("Skip index {0} does not address an exact-match byte")]
    SkipIndexNotExact(usize),
    #[error("Skip table entry for byte {0:#04X} is zero")]
    ZeroSkip(u8),
    #[error("Skip distance {distance} for byte {byte:#04X} exceeds pattern size {size}")]
    SkipTooLong { byte: u8, distance: usize, size: usize },
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Pattern has no bytes to compare")]
    DegeneratePattern,
    #[error("Emit failed: {0}")]
    Emit(#[from] EmitError),
}
