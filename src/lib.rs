// Mon Oct 19 2026 - Alex

//! Compiles masked byte patterns into native scan routines.
//!
//! A [`Pattern`] carries the expected bytes, a mask per byte (`0xFF` exact,
//! `0x00` wildcard, anything else ANDed before comparing), the trimmed
//! compare length and an optional bad-character skip table. A
//! [`JitRuntime`] turns it into a [`CompiledScanner`]: a native
//! `fn(start, end) -> *const u8` returning the first match or null.
//!
//! ```rust,ignore
//! let runtime = JitRuntime::new()?;
//! let pattern = Pattern::new(vec![0x4D, 0x00, 0x5A], vec![0xFF, 0x00, 0xFF], 3)?;
//!
//! if let Some(scanner) = runtime.compile(&pattern) {
//!     let offset = scanner.scan(image);
//! }
//! ```

pub mod config;
pub mod emit;
pub mod jit;
pub mod pattern;

pub use config::Config;
pub use emit::{CodeEmitter, Program, TargetWidth};
pub use jit::{CompiledScanner, JitError, JitPattern, JitRuntime};
pub use pattern::{Pattern, PatternCompiler, PatternError, SkipTable};
