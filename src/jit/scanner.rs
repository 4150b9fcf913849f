// Mon Oct 19 2026 - Alex

use cranelift_jit::JITModule;
use std::fmt;

use crate::jit::JitRuntime;
use crate::pattern::Pattern;

/// Native entry point: `(start, end_exclusive) -> match or null`.
pub type ScannerFn = unsafe extern "C" fn(*const u8, *const u8) -> *const u8;

/// A compiled scan routine, uniquely owned.
///
/// Dropping the scanner frees its code. It cannot be cloned; moving it
/// moves ownership.
pub struct CompiledScanner<'rt> {
    runtime: &'rt JitRuntime,
    module: Option<JITModule>,
    entry: ScannerFn,
    full_size: usize,
    code_size: usize,
    name: Option<String>,
}

// SAFETY: the module is only touched on drop; the code it holds is
// immutable after finalization and keeps no state between calls.
unsafe impl Send for CompiledScanner<'_> {}
unsafe impl Sync for CompiledScanner<'_> {}

impl<'rt> CompiledScanner<'rt> {
    /// # Safety
    ///
    /// `code` must be a finalized function in `module` with the
    /// [`ScannerFn`] signature, compiled from `pattern`.
    pub(crate) unsafe fn from_raw(
        runtime: &'rt JitRuntime,
        module: JITModule,
        code: *const u8,
        pattern: &Pattern,
        code_size: usize,
    ) -> Self {
        Self {
            runtime,
            module: Some(module),
            entry: std::mem::transmute::<*const u8, ScannerFn>(code),
            full_size: pattern.full_size(),
            code_size,
            name: pattern.name().map(str::to_string),
        }
    }

    /// Runs the routine over `[start, end)`. Returns null when nothing matches.
    ///
    /// # Safety
    ///
    /// Every byte in `[start, end)` must be readable.
    pub unsafe fn scan_raw(&self, start: *const u8, end: *const u8) -> *const u8 {
        (self.entry)(start, end)
    }

    pub fn scan(&self, data: &[u8]) -> Option<usize> {
        let range = data.as_ptr_range();
        // SAFETY: the range is exactly the slice.
        let found = unsafe { self.scan_raw(range.start, range.end) };

        if found.is_null() {
            None
        } else {
            Some(found as usize - range.start as usize)
        }
    }

    /// Offsets of every match in `data`, by re-running the scanner one byte
    /// past each hit.
    pub fn find_all<'s>(&'s self, data: &'s [u8]) -> FindAll<'s, 'rt> {
        FindAll {
            scanner: self,
            data,
            position: 0,
        }
    }

    pub fn as_fn_ptr(&self) -> *const u8 {
        self.entry as *const u8
    }

    pub fn full_size(&self) -> usize {
        self.full_size
    }

    pub fn code_size(&self) -> usize {
        self.code_size
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn runtime(&self) -> &'rt JitRuntime {
        self.runtime
    }

    pub fn release(self) {
        let runtime = self.runtime;
        runtime.release(self);
    }
}

impl Drop for CompiledScanner<'_> {
    fn drop(&mut self) {
        if let Some(module) = self.module.take() {
            // SAFETY: `self` is the only holder of `entry`, and it is going away.
            unsafe { module.free_memory() };
            self.runtime.note_released();
            log::trace!("Released scanner {}", self.name.as_deref().unwrap_or("<unnamed>"));
        }
    }
}

impl fmt::Debug for CompiledScanner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledScanner")
            .field("runtime", &self.runtime.id())
            .field("entry", &self.as_fn_ptr())
            .field("full_size", &self.full_size)
            .field("code_size", &self.code_size)
            .field("name", &self.name)
            .finish()
    }
}

pub struct FindAll<'s, 'rt> {
    scanner: &'s CompiledScanner<'rt>,
    data: &'s [u8],
    position: usize,
}

impl Iterator for FindAll<'_, '_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let rest = self.data.get(self.position..)?;
        let found = self.position + self.scanner.scan(rest)?;
        self.position = found + 1;
        Some(found)
    }
}
