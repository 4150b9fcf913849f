// Mon Oct 19 2026 - Alex

pub mod pattern;
pub mod skip_table;
pub mod compiler;
pub mod error;

pub use pattern::{Pattern, MASK_EXACT, MASK_WILDCARD};
pub use skip_table::SkipTable;
pub use compiler::PatternCompiler;
pub use error::{CompileError, PatternError};
