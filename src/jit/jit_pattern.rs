// Mon Oct 19 2026 - Alex

use crate::jit::{CompiledScanner, JitRuntime};
use crate::pattern::Pattern;

/// A pattern compiled on construction. Holds no scanner if compilation
/// failed or the pattern was all wildcards, in which case every scan
/// misses.
#[derive(Debug)]
pub struct JitPattern<'rt> {
    scanner: Option<CompiledScanner<'rt>>,
}

impl<'rt> JitPattern<'rt> {
    pub fn new(runtime: &'rt JitRuntime, pattern: &Pattern) -> Self {
        Self {
            scanner: runtime.compile(pattern),
        }
    }

    /// Compiles against [`JitRuntime::global`].
    pub fn global(pattern: &Pattern) -> JitPattern<'static> {
        JitPattern {
            scanner: JitRuntime::global().and_then(|runtime| runtime.compile(pattern)),
        }
    }

    pub fn is_compiled(&self) -> bool {
        self.scanner.is_some()
    }

    pub fn scan(&self, data: &[u8]) -> Option<usize> {
        self.scanner.as_ref()?.scan(data)
    }

    /// # Safety
    ///
    /// Every byte in `[start, end)` must be readable.
    pub unsafe fn scan_raw(&self, start: *const u8, end: *const u8) -> *const u8 {
        match &self.scanner {
            Some(scanner) => scanner.scan_raw(start, end),
            None => std::ptr::null(),
        }
    }

    pub fn scanner(&self) -> Option<&CompiledScanner<'rt>> {
        self.scanner.as_ref()
    }

    /// Moves the scanner out, leaving this pattern empty.
    pub fn take(&mut self) -> Option<CompiledScanner<'rt>> {
        self.scanner.take()
    }

    pub fn into_scanner(self) -> Option<CompiledScanner<'rt>> {
        self.scanner
    }
}

impl<'rt> From<CompiledScanner<'rt>> for JitPattern<'rt> {
    fn from(scanner: CompiledScanner<'rt>) -> Self {
        Self { scanner: Some(scanner) }
    }
}
