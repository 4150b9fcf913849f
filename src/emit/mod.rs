// Mon Oct 19 2026 - Alex

//! Code emission backends for compiled scanners.
//!
//! The pattern compiler drives a [`CodeEmitter`], which sees the scan routine
//! as a small register machine: a `current` cursor, an `end` bound, byte
//! compares against `current + offset`, labels and branches. Two backends
//! implement it:
//!
//! - [`CraneliftEmitter`] lowers to Cranelift IR and native code.
//! - [`ProgramEmitter`] records a [`Program`] that runs over a byte slice
//!   without executable memory.

pub mod cranelift;
pub mod reference;

pub use self::cranelift::CraneliftEmitter;
pub use reference::{Outcome, Program, ProgramEmitter, ProgramFault};

use crate::pattern::SkipTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Address width of the generated routine.
///
/// Selects the skip-table slot size: pointer-width (8 byte) slots on
/// 64-bit targets, 4 byte slots on 32-bit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetWidth {
    Bits32,
    Bits64,
}

impl TargetWidth {
    pub fn host() -> Self {
        if cfg!(target_pointer_width = "64") {
            TargetWidth::Bits64
        } else {
            TargetWidth::Bits32
        }
    }

    pub fn pointer_bytes(&self) -> usize {
        match self {
            TargetWidth::Bits32 => 4,
            TargetWidth::Bits64 => 8,
        }
    }

    /// log2 of the skip-table slot size, used as the index scale.
    pub fn entry_shift(&self) -> u8 {
        match self {
            TargetWidth::Bits32 => 2,
            TargetWidth::Bits64 => 3,
        }
    }
}

impl fmt::Display for TargetWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetWidth::Bits32 => write!(f, "32-bit"),
            TargetWidth::Bits64 => write!(f, "64-bit"),
        }
    }
}

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("Offset {0} not encodable by this backend")]
    OffsetOutOfRange(usize),
    #[error("Skip distance {distance} for byte {byte:#04X} does not fit a 32-bit slot")]
    SkipTooLarge { byte: u8, distance: usize },
    #[error("Label {0} used but never bound")]
    UnboundLabel(usize),
    #[error("Label {0} bound twice")]
    LabelRebound(usize),
    #[error("Routine does not end in a return or jump")]
    Unterminated,
    #[error("Label {0} bound past the last instruction")]
    LabelAtEnd(usize),
    #[error("Unsupported target: {0}")]
    UnsupportedTarget(String),
    #[error("Module error: {0}")]
    Module(String),
}

/// Instruction sink used by [`crate::pattern::PatternCompiler`].
///
/// The routine owns two cursors: `current` (first argument) and `end`
/// (second argument). Conditional operations branch to their label when the
/// condition holds and fall through otherwise.
pub trait CodeEmitter {
    type Label: Copy;

    fn target(&self) -> TargetWidth;

    fn new_label(&mut self) -> Self::Label;

    /// Places `label` at the current position. Falls through from the
    /// preceding instruction if it was not a jump or return.
    fn bind(&mut self, label: Self::Label) -> Result<(), EmitError>;

    fn jump(&mut self, label: Self::Label) -> Result<(), EmitError>;

    /// `end -= amount`, branching to `underflow` if `end < amount`.
    fn sub_end(&mut self, amount: usize, underflow: Self::Label) -> Result<(), EmitError>;

    /// Branches to `label` if `current > end` (unsigned).
    fn jump_if_past_end(&mut self, label: Self::Label) -> Result<(), EmitError>;

    /// Branches to `on_mismatch` if `[current + offset] != expected`.
    fn cmp_byte(&mut self, offset: usize, expected: u8, on_mismatch: Self::Label) -> Result<(), EmitError>;

    /// Branches to `on_mismatch` if `[current + offset] & mask != expected`.
    fn cmp_masked_byte(
        &mut self,
        offset: usize,
        expected: u8,
        mask: u8,
        on_mismatch: Self::Label,
    ) -> Result<(), EmitError>;

    fn advance(&mut self, amount: usize) -> Result<(), EmitError>;

    /// `current += table[[current + probe]]`, with slots sized by [`Self::target`].
    fn advance_by_table(&mut self, probe: usize, table: &SkipTable) -> Result<(), EmitError>;

    fn return_current(&mut self) -> Result<(), EmitError>;

    fn return_null(&mut self) -> Result<(), EmitError>;
}
