// Mon Oct 19 2026 - Alex

pub mod error;
pub mod runtime;
pub mod scanner;
pub mod jit_pattern;

pub use error::JitError;
pub use runtime::JitRuntime;
pub use scanner::{CompiledScanner, FindAll, ScannerFn};
pub use jit_pattern::JitPattern;
