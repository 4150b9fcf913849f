// Mon Oct 19 2026 - Alex

//! Native backend: lowers the scan routine into Cranelift IR.
//!
//! Labels are Cranelift blocks. A conditional branch always continues in a
//! fresh block, so the compiler can keep emitting linearly the way it would
//! against an assembler. The skip table is defined as read-only data in the
//! same `JITModule` as the function and is freed with it.

use cranelift_codegen::ir::condcodes::IntCC;
use cranelift_codegen::ir::{types, Block, Function, InstBuilder, MemFlags, Type, Value};
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext, Variable};
use cranelift_jit::JITModule;
use cranelift_module::{DataDescription, Module};

use crate::emit::{CodeEmitter, EmitError, TargetWidth};
use crate::pattern::SkipTable;

pub struct CraneliftEmitter<'a> {
    builder: FunctionBuilder<'a>,
    module: &'a mut JITModule,
    target: TargetWidth,
    ptr_type: Type,
    current: Variable,
    end: Variable,
    labels: Vec<(Block, bool)>,
    terminated: bool,
}

impl<'a> CraneliftEmitter<'a> {
    /// Starts emitting into `func`, whose signature must already be
    /// `(ptr, ptr) -> ptr`.
    pub fn new(
        func: &'a mut Function,
        fbc: &'a mut FunctionBuilderContext,
        module: &'a mut JITModule,
        target: TargetWidth,
    ) -> Result<Self, EmitError> {
        let ptr_type = module.target_config().pointer_type();

        if target.pointer_bytes() > ptr_type.bytes() as usize {
            return Err(EmitError::UnsupportedTarget(format!(
                "{} tables on a {}-bit host",
                target,
                ptr_type.bits()
            )));
        }

        let mut builder = FunctionBuilder::new(func, fbc);

        let current = Variable::from_u32(0);
        let end = Variable::from_u32(1);
        builder.declare_var(current, ptr_type);
        builder.declare_var(end, ptr_type);

        let entry = builder.create_block();
        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);
        builder.seal_block(entry);

        let start_arg = builder.block_params(entry)[0];
        let end_arg = builder.block_params(entry)[1];
        builder.def_var(current, start_arg);
        builder.def_var(end, end_arg);

        Ok(Self {
            builder,
            module,
            target,
            ptr_type,
            current,
            end,
            labels: Vec::new(),
            terminated: false,
        })
    }

    pub fn finish(mut self) -> Result<(), EmitError> {
        if !self.terminated {
            return Err(EmitError::Unterminated);
        }

        if let Some(index) = self.labels.iter().position(|&(_, bound)| !bound) {
            return Err(EmitError::UnboundLabel(index));
        }

        self.builder.seal_all_blocks();
        self.builder.finalize();
        Ok(())
    }

    fn block(&self, label: usize) -> Block {
        self.labels[label].0
    }

    // Code after an unconditional jump needs a block of its own.
    fn ensure_open(&mut self) {
        if self.terminated {
            let block = self.builder.create_block();
            self.builder.switch_to_block(block);
            self.terminated = false;
        }
    }

    fn branch_if(&mut self, cond: Value, label: usize) {
        let taken = self.block(label);
        let fallthrough = self.builder.create_block();
        self.builder.ins().brif(cond, taken, &[], fallthrough, &[]);
        self.builder.switch_to_block(fallthrough);
    }

    fn offset(offset: usize) -> Result<i32, EmitError> {
        i32::try_from(offset).map_err(|_| EmitError::OffsetOutOfRange(offset))
    }

    fn load_byte(&mut self, offset: usize) -> Result<Value, EmitError> {
        let offset = Self::offset(offset)?;
        let current = self.builder.use_var(self.current);
        Ok(self
            .builder
            .ins()
            .uload8(types::I32, MemFlags::trusted(), current, offset))
    }
}

impl<'a> CodeEmitter for CraneliftEmitter<'a> {
    type Label = usize;

    fn target(&self) -> TargetWidth {
        self.target
    }

    fn new_label(&mut self) -> usize {
        let block = self.builder.create_block();
        self.labels.push((block, false));
        self.labels.len() - 1
    }

    fn bind(&mut self, label: usize) -> Result<(), EmitError> {
        let (block, bound) = self.labels[label];
        if bound {
            return Err(EmitError::LabelRebound(label));
        }

        if !self.terminated {
            self.builder.ins().jump(block, &[]);
        }

        self.builder.switch_to_block(block);
        self.labels[label].1 = true;
        self.terminated = false;
        Ok(())
    }

    fn jump(&mut self, label: usize) -> Result<(), EmitError> {
        self.ensure_open();
        let block = self.block(label);
        self.builder.ins().jump(block, &[]);
        self.terminated = true;
        Ok(())
    }

    fn sub_end(&mut self, amount: usize, underflow: usize) -> Result<(), EmitError> {
        self.ensure_open();
        let end = self.builder.use_var(self.end);
        let amount = self.builder.ins().iconst(self.ptr_type, amount as i64);

        let wraps = self.builder.ins().icmp(IntCC::UnsignedLessThan, end, amount);
        self.branch_if(wraps, underflow);

        let adjusted = self.builder.ins().isub(end, amount);
        self.builder.def_var(self.end, adjusted);
        Ok(())
    }

    fn jump_if_past_end(&mut self, label: usize) -> Result<(), EmitError> {
        self.ensure_open();
        let current = self.builder.use_var(self.current);
        let end = self.builder.use_var(self.end);
        let past = self.builder.ins().icmp(IntCC::UnsignedGreaterThan, current, end);
        self.branch_if(past, label);
        Ok(())
    }

    fn cmp_byte(&mut self, offset: usize, expected: u8, on_mismatch: usize) -> Result<(), EmitError> {
        self.ensure_open();
        let byte = self.load_byte(offset)?;
        let differs = self.builder.ins().icmp_imm(IntCC::NotEqual, byte, expected as i64);
        self.branch_if(differs, on_mismatch);
        Ok(())
    }

    fn cmp_masked_byte(&mut self, offset: usize, expected: u8, mask: u8, on_mismatch: usize) -> Result<(), EmitError> {
        self.ensure_open();
        let byte = self.load_byte(offset)?;
        let masked = self.builder.ins().band_imm(byte, mask as i64);
        let differs = self.builder.ins().icmp_imm(IntCC::NotEqual, masked, expected as i64);
        self.branch_if(differs, on_mismatch);
        Ok(())
    }

    fn advance(&mut self, amount: usize) -> Result<(), EmitError> {
        self.ensure_open();
        let current = self.builder.use_var(self.current);
        let next = self.builder.ins().iadd_imm(current, amount as i64);
        self.builder.def_var(self.current, next);
        Ok(())
    }

    fn advance_by_table(&mut self, probe: usize, table: &SkipTable) -> Result<(), EmitError> {
        self.ensure_open();

        let image = table.to_bytes(self.target)?;
        let mut data = DataDescription::new();
        data.define(image.into_boxed_slice());
        data.set_align(self.target.pointer_bytes() as u64);

        let data_id = self
            .module
            .declare_anonymous_data(false, false)
            .map_err(|e| EmitError::Module(e.to_string()))?;
        self.module
            .define_data(data_id, &data)
            .map_err(|e| EmitError::Module(e.to_string()))?;
        let table_gv = self.module.declare_data_in_func(data_id, self.builder.func);

        let probe = Self::offset(probe)?;
        let current = self.builder.use_var(self.current);
        let key = self
            .builder
            .ins()
            .uload8(self.ptr_type, MemFlags::trusted(), current, probe);

        let base = self.builder.ins().global_value(self.ptr_type, table_gv);
        let scaled = self.builder.ins().ishl_imm(key, self.target.entry_shift() as i64);
        let slot = self.builder.ins().iadd(base, scaled);

        let entry_type = match self.target {
            TargetWidth::Bits64 => types::I64,
            TargetWidth::Bits32 => types::I32,
        };
        let mut flags = MemFlags::trusted();
        flags.set_readonly();
        let mut distance = self.builder.ins().load(entry_type, flags, slot, 0);
        if entry_type != self.ptr_type {
            distance = self.builder.ins().uextend(self.ptr_type, distance);
        }

        let next = self.builder.ins().iadd(current, distance);
        self.builder.def_var(self.current, next);
        Ok(())
    }

    fn return_current(&mut self) -> Result<(), EmitError> {
        self.ensure_open();
        let current = self.builder.use_var(self.current);
        self.builder.ins().return_(&[current]);
        self.terminated = true;
        Ok(())
    }

    fn return_null(&mut self) -> Result<(), EmitError> {
        self.ensure_open();
        let null = self.builder.ins().iconst(self.ptr_type, 0);
        self.builder.ins().return_(&[null]);
        self.terminated = true;
        Ok(())
    }
}
