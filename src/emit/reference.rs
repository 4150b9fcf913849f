// Mon Oct 19 2026 - Alex

//! Software backend: records the emitted routine and interprets it over a
//! byte slice. Addresses are slice offsets, reads are bounds-checked.

use crate::emit::{CodeEmitter, EmitError, TargetWidth};
use crate::pattern::SkipTable;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Op<T> {
    SubEnd { amount: usize, underflow: T },
    Jump(T),
    JumpIfPastEnd(T),
    CmpByte { offset: usize, expected: u8, target: T },
    CmpMasked { offset: usize, expected: u8, mask: u8, target: T },
    Advance(usize),
    AdvanceByTable { probe: usize, table: usize },
    ReturnCurrent,
    ReturnNull,
}

impl<T: Copy> Op<T> {
    fn map_target<U, F>(&self, f: F) -> Result<Op<U>, EmitError>
    where
        F: Fn(T) -> Result<U, EmitError>,
    {
        Ok(match *self {
            Op::SubEnd { amount, underflow } => Op::SubEnd { amount, underflow: f(underflow)? },
            Op::Jump(t) => Op::Jump(f(t)?),
            Op::JumpIfPastEnd(t) => Op::JumpIfPastEnd(f(t)?),
            Op::CmpByte { offset, expected, target } => Op::CmpByte { offset, expected, target: f(target)? },
            Op::CmpMasked { offset, expected, mask, target } => Op::CmpMasked {
                offset,
                expected,
                mask,
                target: f(target)?,
            },
            Op::Advance(n) => Op::Advance(n),
            Op::AdvanceByTable { probe, table } => Op::AdvanceByTable { probe, table },
            Op::ReturnCurrent => Op::ReturnCurrent,
            Op::ReturnNull => Op::ReturnNull,
        })
    }

    fn is_terminator(&self) -> bool {
        matches!(self, Op::Jump(_) | Op::ReturnCurrent | Op::ReturnNull)
    }
}

pub struct ProgramEmitter {
    target: TargetWidth,
    ops: Vec<Op<Label>>,
    bindings: Vec<Option<usize>>,
    tables: Vec<Vec<usize>>,
}

impl ProgramEmitter {
    pub fn new(target: TargetWidth) -> Self {
        Self {
            target,
            ops: Vec::new(),
            bindings: Vec::new(),
            tables: Vec::new(),
        }
    }

    /// Resolves labels into instruction indices.
    pub fn finish(self) -> Result<Program, EmitError> {
        match self.ops.last() {
            Some(op) if op.is_terminator() => {}
            _ => return Err(EmitError::Unterminated),
        }

        // A label bound after the last instruction would jump off the end.
        let len = self.ops.len();
        let bindings = &self.bindings;
        let resolve = |label: Label| match bindings[label.0] {
            Some(pc) if pc < len => Ok(pc),
            Some(_) => Err(EmitError::LabelAtEnd(label.0)),
            None => Err(EmitError::UnboundLabel(label.0)),
        };

        let ops = self
            .ops
            .iter()
            .map(|op| op.map_target(resolve))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Program {
            target: self.target,
            ops,
            tables: self.tables,
        })
    }

    fn push(&mut self, op: Op<Label>) -> Result<(), EmitError> {
        self.ops.push(op);
        Ok(())
    }
}

impl CodeEmitter for ProgramEmitter {
    type Label = Label;

    fn target(&self) -> TargetWidth {
        self.target
    }

    fn new_label(&mut self) -> Label {
        self.bindings.push(None);
        Label(self.bindings.len() - 1)
    }

    fn bind(&mut self, label: Label) -> Result<(), EmitError> {
        let slot = &mut self.bindings[label.0];
        if slot.is_some() {
            return Err(EmitError::LabelRebound(label.0));
        }
        *slot = Some(self.ops.len());
        Ok(())
    }

    fn jump(&mut self, label: Label) -> Result<(), EmitError> {
        self.push(Op::Jump(label))
    }

    fn sub_end(&mut self, amount: usize, underflow: Label) -> Result<(), EmitError> {
        self.push(Op::SubEnd { amount, underflow })
    }

    fn jump_if_past_end(&mut self, label: Label) -> Result<(), EmitError> {
        self.push(Op::JumpIfPastEnd(label))
    }

    fn cmp_byte(&mut self, offset: usize, expected: u8, on_mismatch: Label) -> Result<(), EmitError> {
        self.push(Op::CmpByte { offset, expected, target: on_mismatch })
    }

    fn cmp_masked_byte(&mut self, offset: usize, expected: u8, mask: u8, on_mismatch: Label) -> Result<(), EmitError> {
        self.push(Op::CmpMasked { offset, expected, mask, target: on_mismatch })
    }

    fn advance(&mut self, amount: usize) -> Result<(), EmitError> {
        self.push(Op::Advance(amount))
    }

    fn advance_by_table(&mut self, probe: usize, table: &SkipTable) -> Result<(), EmitError> {
        // Read back through the slot layout so 32-bit tables truncate and
        // reject exactly like the native ones.
        let image = table.to_bytes(self.target)?;
        let slots = match self.target {
            TargetWidth::Bits64 => image
                .chunks_exact(8)
                .map(|c| u64::from_ne_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as usize)
                .collect(),
            TargetWidth::Bits32 => image
                .chunks_exact(4)
                .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]) as usize)
                .collect(),
        };

        self.tables.push(slots);
        let table = self.tables.len() - 1;
        self.push(Op::AdvanceByTable { probe, table })
    }

    fn return_current(&mut self) -> Result<(), EmitError> {
        self.push(Op::ReturnCurrent)
    }

    fn return_null(&mut self) -> Result<(), EmitError> {
        self.push(Op::ReturnNull)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramFault {
    #[error("Read of offset {0} outside the scanned buffer")]
    OutOfBounds(usize),
    #[error("Range {start}..{end} outside the scanned buffer of {len} bytes")]
    BadRange { start: usize, end: usize, len: usize },
    #[error("Step limit of {0} loop iterations exceeded")]
    StepLimit(u64),
    #[error("Cursor {current} overflows when advanced by {distance}")]
    CursorOverflow { current: usize, distance: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub found: Option<usize>,
    /// Number of candidate positions visited by the scan loop.
    pub iterations: u64,
}

/// A label-resolved scan routine that runs without executable memory.
#[derive(Debug, Clone)]
pub struct Program {
    target: TargetWidth,
    ops: Vec<Op<usize>>,
    tables: Vec<Vec<usize>>,
}

impl Program {
    pub fn target(&self) -> TargetWidth {
        self.target
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of compare instructions in the routine.
    pub fn compare_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::CmpByte { .. } | Op::CmpMasked { .. }))
            .count()
    }

    pub fn scan(&self, data: &[u8]) -> Result<Option<usize>, ProgramFault> {
        self.run(data, 0, data.len(), None).map(|outcome| outcome.found)
    }

    /// Runs the routine with `current = start` and `end = end_exclusive`.
    ///
    /// With `limit` set, faults once the scan loop has visited more than
    /// `limit` candidate positions.
    pub fn run(
        &self,
        data: &[u8],
        start: usize,
        end_exclusive: usize,
        limit: Option<u64>,
    ) -> Result<Outcome, ProgramFault> {
        if start > data.len() || end_exclusive > data.len() {
            return Err(ProgramFault::BadRange {
                start,
                end: end_exclusive,
                len: data.len(),
            });
        }

        let read = |current: usize, offset: usize| {
            let at = current.checked_add(offset).ok_or(ProgramFault::OutOfBounds(usize::MAX))?;
            data.get(at).copied().ok_or(ProgramFault::OutOfBounds(at))
        };
        let advance = |current: usize, distance: usize| {
            current
                .checked_add(distance)
                .ok_or(ProgramFault::CursorOverflow { current, distance })
        };

        let mut current = start;
        let mut end = end_exclusive;
        let mut iterations = 0u64;
        let mut pc = 0usize;

        loop {
            let mut next = pc + 1;

            match &self.ops[pc] {
                Op::SubEnd { amount, underflow } => {
                    if end < *amount {
                        next = *underflow;
                    } else {
                        end -= amount;
                    }
                }
                Op::Jump(target) => next = *target,
                Op::JumpIfPastEnd(target) => {
                    if current > end {
                        next = *target;
                    } else {
                        iterations += 1;
                        if limit.is_some_and(|l| iterations > l) {
                            return Err(ProgramFault::StepLimit(iterations - 1));
                        }
                    }
                }
                Op::CmpByte { offset, expected, target } => {
                    if read(current, *offset)? != *expected {
                        next = *target;
                    }
                }
                Op::CmpMasked { offset, expected, mask, target } => {
                    if read(current, *offset)? & mask != *expected {
                        next = *target;
                    }
                }
                Op::Advance(n) => current = advance(current, *n)?,
                Op::AdvanceByTable { probe, table } => {
                    let key = read(current, *probe)?;
                    current = advance(current, self.tables[*table][key as usize])?;
                }
                Op::ReturnCurrent => {
                    return Ok(Outcome { found: Some(current), iterations });
                }
                Op::ReturnNull => {
                    return Ok(Outcome { found: None, iterations });
                }
            }

            pc = next;
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pc, op) in self.ops.iter().enumerate() {
            write!(f, "{:4}: ", pc)?;
            match op {
                Op::SubEnd { amount, underflow } => writeln!(f, "sub end, {}  ; jb {}", amount, underflow)?,
                Op::Jump(t) => writeln!(f, "jmp {}", t)?,
                Op::JumpIfPastEnd(t) => writeln!(f, "cmp cur, end ; ja {}", t)?,
                Op::CmpByte { offset, expected, target } => {
                    writeln!(f, "cmp byte [cur+{}], {:#04X} ; jne {}", offset, expected, target)?
                }
                Op::CmpMasked { offset, expected, mask, target } => writeln!(
                    f,
                    "and byte [cur+{}], {:#04X} ; cmp {:#04X} ; jne {}",
                    offset, mask, expected, target
                )?,
                Op::Advance(n) => writeln!(f, "add cur, {}", n)?,
                Op::AdvanceByTable { probe, table } => writeln!(
                    f,
                    "add cur, table{}[byte [cur+{}]] ; {} slots",
                    table, probe, self.target
                )?,
                Op::ReturnCurrent => writeln!(f, "ret cur")?,
                Op::ReturnNull => writeln!(f, "ret 0")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_loop(target: TargetWidth) -> ProgramEmitter {
        // Finds the first 0x90, one byte at a time.
        let mut e = ProgramEmitter::new(target);
        let scan = e.new_label();
        let next = e.new_label();
        let not_found = e.new_label();

        e.sub_end(1, not_found).unwrap();
        e.jump(scan).unwrap();
        e.bind(next).unwrap();
        e.advance(1).unwrap();
        e.bind(scan).unwrap();
        e.jump_if_past_end(not_found).unwrap();
        e.cmp_byte(0, 0x90, next).unwrap();
        e.return_current().unwrap();
        e.bind(not_found).unwrap();
        e.return_null().unwrap();
        e
    }

    #[test]
    fn test_program_runs_hand_built_loop() {
        let program = counting_loop(TargetWidth::Bits64).finish().unwrap();

        assert_eq!(program.scan(&[0xCC, 0xCC, 0x90, 0x90]).unwrap(), Some(2));
        assert_eq!(program.scan(&[0xCC, 0xCC]).unwrap(), None);
        assert_eq!(program.scan(&[]).unwrap(), None);
        assert_eq!(program.compare_count(), 1);

        let outcome = program.run(&[0xCC, 0xCC, 0x90], 0, 3, None).unwrap();
        assert_eq!(outcome, Outcome { found: Some(2), iterations: 3 });
    }

    #[test]
    fn test_step_limit() {
        let program = counting_loop(TargetWidth::Bits64).finish().unwrap();
        let data = [0u8; 64];

        let err = program.run(&data, 0, data.len(), Some(10)).unwrap_err();
        assert_eq!(err, ProgramFault::StepLimit(10));
    }

    #[test]
    fn test_bad_range() {
        let program = counting_loop(TargetWidth::Bits64).finish().unwrap();
        let err = program.run(&[0u8; 4], 0, 5, None).unwrap_err();
        assert_eq!(err, ProgramFault::BadRange { start: 0, end: 5, len: 4 });
    }

    #[test]
    fn test_unbound_label_rejected() {
        let mut e = ProgramEmitter::new(TargetWidth::Bits64);
        let dangling = e.new_label();
        e.jump(dangling).unwrap();

        assert!(matches!(e.finish(), Err(EmitError::UnboundLabel(0))));
    }

    #[test]
    fn test_unterminated_rejected() {
        let mut e = ProgramEmitter::new(TargetWidth::Bits64);
        e.advance(1).unwrap();
        assert!(matches!(e.finish(), Err(EmitError::Unterminated)));

    }

    #[test]
    fn test_label_past_last_instruction_rejected() {
        let mut e = ProgramEmitter::new(TargetWidth::Bits64);
        let tail = e.new_label();
        e.jump(tail).unwrap();
        e.bind(tail).unwrap();
        assert!(matches!(e.finish(), Err(EmitError::LabelAtEnd(0))));
    }

    #[test]
    fn test_table_advance_overflow_is_a_fault() {
        // Same loop as `counting_loop`, advancing by an unvalidated table.
        let mut e = ProgramEmitter::new(TargetWidth::Bits64);
        let scan = e.new_label();
        let next = e.new_label();
        let not_found = e.new_label();

        e.sub_end(2, not_found).unwrap();
        e.jump(scan).unwrap();
        e.bind(next).unwrap();
        e.advance_by_table(1, &SkipTable::from_entries(1, [(b'x', usize::MAX)])).unwrap();
        e.bind(scan).unwrap();
        e.jump_if_past_end(not_found).unwrap();
        e.cmp_byte(1, b'B', next).unwrap();
        e.cmp_byte(0, b'A', next).unwrap();
        e.return_current().unwrap();
        e.bind(not_found).unwrap();
        e.return_null().unwrap();
        let program = e.finish().unwrap();

        let err = program.run(b"?Ax?B?", 0, 6, Some(100)).unwrap_err();
        assert_eq!(
            err,
            ProgramFault::CursorOverflow {
                current: 1,
                distance: usize::MAX
            }
        );
        assert_eq!(program.scan(b"??AB").unwrap(), Some(2));
    }

    #[test]
    fn test_rebind_rejected() {
        let mut e = ProgramEmitter::new(TargetWidth::Bits64);
        let l = e.new_label();
        e.bind(l).unwrap();
        assert!(matches!(e.bind(l), Err(EmitError::LabelRebound(0))));
    }

    #[test]
    fn test_listing() {
        let program = counting_loop(TargetWidth::Bits32).finish().unwrap();
        let listing = program.to_string();

        assert!(listing.contains("cmp byte [cur+0], 0x90"));
        assert!(listing.contains("ret 0"));
        assert_eq!(listing.lines().count(), program.len());
    }
}
