// Mon Oct 19 2026 - Alex

use crate::emit::{CodeEmitter, Program, ProgramEmitter, TargetWidth};
use crate::pattern::pattern::{MASK_EXACT, MASK_WILDCARD};
use crate::pattern::{CompileError, Pattern};

/// Lowers a [`Pattern`] into a scan routine on any [`CodeEmitter`].
///
/// Generated routine, with `current` and `end` as its two arguments:
///
/// ```text
///         end -= full_size          ; below full_size -> NotFound
///         jmp ScanLoop
/// Next:   current += skip[byte [current + skip_index]]   ; or += 1
/// ScanLoop:
///         cmp current, end
///         ja NotFound
///         cmp byte [current + n-1], bytes[n-1] ; jne Next
///         ...
///         cmp byte [current + 0], bytes[0]     ; jne Next
///         ret current
/// NotFound:
///         ret 0
/// ```
pub struct PatternCompiler {
    use_skip_table: bool,
}

impl PatternCompiler {
    pub fn new() -> Self {
        Self { use_skip_table: true }
    }

    /// With skip tables disabled every mismatch advances by one byte.
    pub fn set_skip_table(mut self, enabled: bool) -> Self {
        self.use_skip_table = enabled;
        self
    }

    pub fn emit<E: CodeEmitter>(&self, pattern: &Pattern, e: &mut E) -> Result<(), CompileError> {
        let trimmed_size = pattern.trimmed_size();

        if trimmed_size == 0 {
            return Err(CompileError::DegeneratePattern);
        }

        let bytes = pattern.bytes();
        let masks = pattern.masks();

        let scan_loop = e.new_label();
        let next = e.new_label();
        let not_found = e.new_label();

        e.sub_end(pattern.full_size(), not_found)?;
        e.jump(scan_loop)?;

        e.bind(next)?;
        match pattern.skip_table().filter(|_| self.use_skip_table) {
            Some(table) => e.advance_by_table(pattern.skip_index(), table)?,
            None => e.advance(1)?,
        }

        e.bind(scan_loop)?;
        e.jump_if_past_end(not_found)?;

        for i in (0..trimmed_size).rev() {
            match masks[i] {
                MASK_WILDCARD => {}
                MASK_EXACT => e.cmp_byte(i, bytes[i], next)?,
                mask => e.cmp_masked_byte(i, bytes[i] & mask, mask, next)?,
            }
        }

        e.return_current()?;

        e.bind(not_found)?;
        e.return_null()?;

        Ok(())
    }

    /// Compiles into the software backend.
    pub fn compile_program(&self, pattern: &Pattern, target: TargetWidth) -> Result<Program, CompileError> {
        let mut emitter = ProgramEmitter::new(target);
        self.emit(pattern, &mut emitter)?;
        Ok(emitter.finish()?)
    }
}

impl Default for PatternCompiler {
    fn default() -> Self {
        Self::new()
    }
}
