// Mon Oct 19 2026 - Alex

use cranelift_codegen::isa::OwnedTargetIsa;
use cranelift_codegen::ir::{AbiParam, Function, Signature};
use cranelift_codegen::settings::{self, Configurable};
use cranelift_frontend::FunctionBuilderContext;
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::Module;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::config::Config;
use crate::emit::{CraneliftEmitter, TargetWidth};
use crate::jit::{CompiledScanner, JitError};
use crate::pattern::{CompileError, Pattern, PatternCompiler};

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

static GLOBAL_RUNTIME: Lazy<Option<JitRuntime>> = Lazy::new(|| match JitRuntime::new() {
    Ok(runtime) => Some(runtime),
    Err(e) => {
        log::error!("Failed to create global JIT runtime: {}", e);
        None
    }
});

/// Owns the code generator and hands out [`CompiledScanner`]s.
///
/// Every scanner borrows the runtime that produced it, so the runtime
/// outlives all of its scanners. Each scanner gets its own `JITModule`;
/// releasing one frees exactly that scanner's code and skip table.
pub struct JitRuntime {
    id: u64,
    isa: OwnedTargetIsa,
    target: TargetWidth,
    config: Config,
    compiler: PatternCompiler,
    builder_ctx: Mutex<FunctionBuilderContext>,
    live: AtomicUsize,
    compiled: AtomicUsize,
}

impl JitRuntime {
    pub fn new() -> Result<Self, JitError> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self, JitError> {
        config.validate().map_err(JitError::Config)?;

        let mut flag_builder = settings::builder();
        flag_builder
            .set("opt_level", config.opt_level.as_cranelift())
            .map_err(|e| JitError::Isa(e.to_string()))?;
        flag_builder
            .set("enable_verifier", if config.verify_ir { "true" } else { "false" })
            .map_err(|e| JitError::Isa(e.to_string()))?;

        let isa = cranelift_codegen::isa::lookup(target_lexicon::Triple::host())
            .map_err(|e| JitError::Isa(e.to_string()))?
            .finish(settings::Flags::new(flag_builder))
            .map_err(|e| JitError::Isa(e.to_string()))?;

        let target = config.effective_width();
        if target.pointer_bytes() > isa.pointer_bytes() as usize {
            return Err(JitError::Config(format!("{} tables not supported on {}", target, isa.triple())));
        }

        let id = NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!("JIT runtime {} ready for {} ({} tables)", id, isa.triple(), target);

        Ok(Self {
            id,
            isa,
            target,
            compiler: PatternCompiler::new().set_skip_table(config.use_skip_tables),
            config,
            builder_ctx: Mutex::new(FunctionBuilderContext::new()),
            live: AtomicUsize::new(0),
            compiled: AtomicUsize::new(0),
        })
    }

    /// Process-wide runtime with the default config, created on first use.
    pub fn global() -> Option<&'static JitRuntime> {
        GLOBAL_RUNTIME.as_ref()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn target(&self) -> TargetWidth {
        self.target
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn live_scanners(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    pub fn compiled_count(&self) -> usize {
        self.compiled.load(Ordering::Relaxed)
    }

    /// Compiles `pattern`, returning `None` when no scanner is available.
    pub fn compile(&self, pattern: &Pattern) -> Option<CompiledScanner<'_>> {
        match self.try_compile(pattern) {
            Ok(scanner) => Some(scanner),
            Err(e) if e.is_degenerate() => {
                log::debug!("Skipping all-wildcard pattern {}", pattern);
                None
            }
            Err(e) => {
                log::warn!("Failed to compile {}: {}", pattern, e);
                None
            }
        }
    }

    pub fn try_compile(&self, pattern: &Pattern) -> Result<CompiledScanner<'_>, JitError> {
        if pattern.is_degenerate() {
            return Err(CompileError::DegeneratePattern.into());
        }

        let mut module = JITModule::new(JITBuilder::with_isa(
            self.isa.clone(),
            cranelift_module::default_libcall_names(),
        ));

        match self.build(&mut module, pattern) {
            Ok((code, code_size)) => {
                self.compiled.fetch_add(1, Ordering::Relaxed);
                self.live.fetch_add(1, Ordering::AcqRel);

                log::debug!(
                    "Compiled {} ({} of {} bytes compared, {}, {} bytes of code)",
                    pattern,
                    pattern.compared_byte_count(),
                    pattern.full_size(),
                    if pattern.skip_table().is_some() && self.config.use_skip_tables {
                        "skip table"
                    } else {
                        "linear"
                    },
                    code_size
                );

                // SAFETY: `code` was finalized in `module` with the scanner signature.
                Ok(unsafe { CompiledScanner::from_raw(self, module, code, pattern, code_size) })
            }
            Err(e) => {
                // SAFETY: nothing from this module escaped.
                unsafe { module.free_memory() };
                Err(e)
            }
        }
    }

    fn build(&self, module: &mut JITModule, pattern: &Pattern) -> Result<(*const u8, usize), JitError> {
        let sig = scanner_signature(module);
        let func_id = module
            .declare_anonymous_function(&sig)
            .map_err(|e| JitError::Module(e.to_string()))?;

        let mut ctx = module.make_context();
        ctx.func.signature = sig;

        {
            let mut fbc = self.builder_ctx.lock();
            let emitted = self.emit_into(&mut ctx.func, &mut fbc, module, pattern);
            if emitted.is_err() {
                // An abandoned builder leaves the context half-filled.
                *fbc = FunctionBuilderContext::new();
            }
            emitted?;
        }

        if self.config.dump_ir {
            log::trace!("IR for {}:\n{}", pattern, ctx.func.display());
        }

        module
            .define_function(func_id, &mut ctx)
            .map_err(|e| JitError::Codegen(format!("{e:?}")))?;

        let code_size = ctx
            .compiled_code()
            .map(|code| code.code_buffer().len())
            .unwrap_or(0);

        module.clear_context(&mut ctx);
        module
            .finalize_definitions()
            .map_err(|e| JitError::Module(e.to_string()))?;

        Ok((module.get_finalized_function(func_id), code_size))
    }

    fn emit_into(
        &self,
        func: &mut Function,
        fbc: &mut FunctionBuilderContext,
        module: &mut JITModule,
        pattern: &Pattern,
    ) -> Result<(), JitError> {
        let mut emitter = CraneliftEmitter::new(func, fbc, module, self.target)?;
        self.compiler.emit(pattern, &mut emitter)?;
        emitter.finish()?;
        Ok(())
    }

    /// Frees a scanner's code. Accepts `None` as a no-op.
    pub fn release<'rt>(&self, scanner: impl Into<Option<CompiledScanner<'rt>>>) {
        if let Some(scanner) = scanner.into() {
            if scanner.runtime().id() != self.id {
                log::error!(
                    "Scanner from runtime {} released through runtime {}",
                    scanner.runtime().id(),
                    self.id
                );
            }
            drop(scanner);
        }
    }

    pub(crate) fn note_released(&self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/// `fn(start: *const u8, end: *const u8) -> *const u8`
fn scanner_signature(module: &JITModule) -> Signature {
    let ptr_type = module.target_config().pointer_type();
    let mut sig = module.make_signature();
    sig.params.push(AbiParam::new(ptr_type)); // start
    sig.params.push(AbiParam::new(ptr_type)); // end
    sig.returns.push(AbiParam::new(ptr_type)); // match or null
    sig
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(bytes: &[u8]) -> Pattern {
        Pattern::new(bytes.to_vec(), vec![0xFF; bytes.len()], bytes.len()).unwrap()
    }

    #[test]
    fn test_compile_and_release_tracks_live_scanners() {
        let runtime = JitRuntime::new().unwrap();
        let a = runtime.compile(&exact(&[0x4D, 0x5A])).unwrap();
        let b = runtime.compile(&exact(&[0x50, 0x45])).unwrap();

        assert_eq!(runtime.live_scanners(), 2);
        assert_eq!(runtime.compiled_count(), 2);

        runtime.release(a);
        assert_eq!(runtime.live_scanners(), 1);

        drop(b);
        assert_eq!(runtime.live_scanners(), 0);
        assert_eq!(runtime.compiled_count(), 2);
    }

    #[test]
    fn test_release_none_is_noop() {
        let runtime = JitRuntime::new().unwrap();
        runtime.release(None);
        assert_eq!(runtime.live_scanners(), 0);
    }

    #[test]
    fn test_degenerate_pattern_yields_none() {
        let runtime = JitRuntime::new().unwrap();
        let pattern = Pattern::new(vec![0; 4], vec![0; 4], 0).unwrap();

        assert!(runtime.compile(&pattern).is_none());
        assert!(runtime.try_compile(&pattern).unwrap_err().is_degenerate());
        assert_eq!(runtime.compiled_count(), 0);
    }

    #[test]
    fn test_runtimes_are_isolated() {
        let first = JitRuntime::new().unwrap();
        let second = JitRuntime::new().unwrap();
        assert_ne!(first.id(), second.id());

        let scanner = first.compile(&exact(&[0xCC])).unwrap();
        assert_eq!(first.live_scanners(), 1);
        assert_eq!(second.live_scanners(), 0);

        // Misrouted release is logged; the scanner still returns to its owner.
        second.release(scanner);
        assert_eq!(first.live_scanners(), 0);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_failed_compile_frees_module_and_recovers() {
        use crate::emit::EmitError;
        use crate::pattern::SkipTable;

        let runtime = JitRuntime::with_config(Config::new().with_target_width(TargetWidth::Bits32)).unwrap();
        let oversized = SkipTable::from_entries(1, [(b'A', u32::MAX as usize + 1)]);
        let pattern = exact(b"AB").with_skip_table_unchecked(oversized, 1);

        let err = runtime.try_compile(&pattern).unwrap_err();
        assert!(matches!(
            err,
            JitError::Compile(CompileError::Emit(EmitError::SkipTooLarge { byte: b'A', .. }))
        ));
        assert!(runtime.compile(&pattern).is_none());
        assert_eq!(runtime.live_scanners(), 0);
        assert_eq!(runtime.compiled_count(), 0);

        // The shared builder context is usable again after the abandoned emit.
        let scanner = runtime.compile(&exact(b"AB")).unwrap();
        assert_eq!(scanner.scan(b"xAB"), Some(1));
        assert_eq!(runtime.live_scanners(), 1);
    }

    #[test]
    fn test_global_runtime() {
        let runtime = JitRuntime::global().unwrap();
        let scanner = runtime.compile(&exact(&[0x0F, 0x05])).unwrap();

        assert_eq!(scanner.scan(&[0x90, 0x0F, 0x05]), Some(1));
        assert_eq!(runtime.target(), TargetWidth::host());
    }
}
