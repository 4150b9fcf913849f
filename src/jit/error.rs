// Mon Oct 19 2026 - Alex

use crate::emit::EmitError;
use crate::pattern::CompileError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JitError {
    #[error("Invalid config: {0}")]
    Config(String),
    #[error("ISA setup failed: {0}")]
    Isa(String),
    #[error("Compilation failed: {0}")]
    Compile(#[from] CompileError),
    #[error("Emit failed: {0}")]
    Emit(#[from] EmitError),
    #[error("Codegen error: {0}")]
    Codegen(String),
    #[error("Module error: {0}")]
    Module(String),
}

impl JitError {
    pub fn is_degenerate(&self) -> bool {
        matches!(self, JitError::Compile(CompileError::DegeneratePattern))
    }
}
