//! Checksum execution
//!
//! Two evaluators produce identical results: [`ValueProgram`] walks its
//! operation list directly, while [`CompiledProgram`] resolves every
//! operation once into register indices and an operator function so the
//! per-word loop does no matching at all.

use super::formula::{Operation, Operator, ValueProgram};
use crate::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Something that can run one pass of operations over the register file
pub trait Evaluate {
    /// Initial register file `[A, B, C, S]` for the given MPQ hash code
    fn initial_registers(&self, hash_code: u32) -> [u32; 4];

    /// Run every operation once, in order; `None` signals a zero divisor
    fn evaluate(&self, registers: &mut [u32; 4]) -> Option<()>;
}

impl Evaluate for ValueProgram {
    fn initial_registers(&self, hash_code: u32) -> [u32; 4] {
        ValueProgram::initial_registers(self, hash_code)
    }

    fn evaluate(&self, registers: &mut [u32; 4]) -> Option<()> {
        for op in &self.ops {
            let value = op
                .op
                .apply(registers[op.lhs.index()], registers[op.rhs.index()])?;
            registers[op.dest.index()] = value;
        }
        Some(())
    }
}

type OpFn = fn(u32, u32) -> Option<u32>;

#[derive(Clone, Copy)]
struct Step {
    dest: usize,
    lhs: usize,
    rhs: usize,
    apply: OpFn,
}

fn resolve(op: Operator) -> OpFn {
    match op {
        Operator::Add => |a: u32, b: u32| Some(a.wrapping_add(b)),
        Operator::Sub => |a: u32, b: u32| Some(a.wrapping_sub(b)),
        Operator::Mul => |a: u32, b: u32| Some(a.wrapping_mul(b)),
        Operator::Div => |a: u32, b: u32| a.checked_div(b),
        Operator::Xor => |a: u32, b: u32| Some(a ^ b),
        Operator::Or => |a: u32, b: u32| Some(a | b),
        Operator::And => |a: u32, b: u32| Some(a & b),
    }
}

impl Step {
    fn from_operation(op: &Operation) -> Self {
        Step {
            dest: op.dest.index(),
            lhs: op.lhs.index(),
            rhs: op.rhs.index(),
            apply: resolve(op.op),
        }
    }
}

/// A value program with its operations pre-resolved
#[derive(Clone)]
pub struct CompiledProgram {
    seeds: [u32; 3],
    steps: Box<[Step]>,
}

impl CompiledProgram {
    /// Resolve a parsed program
    pub fn compile(program: &ValueProgram) -> Self {
        CompiledProgram {
            seeds: [program.seed_a, program.seed_b, program.seed_c],
            steps: program.ops.iter().map(Step::from_operation).collect(),
        }
    }

    /// Number of operations run per word
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the program has no operations
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl std::fmt::Debug for CompiledProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("seeds", &self.seeds)
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl Evaluate for CompiledProgram {
    fn initial_registers(&self, hash_code: u32) -> [u32; 4] {
        [self.seeds[0] ^ hash_code, self.seeds[1], self.seeds[2], 0]
    }

    #[inline]
    fn evaluate(&self, registers: &mut [u32; 4]) -> Option<()> {
        for step in self.steps.iter() {
            registers[step.dest] = (step.apply)(registers[step.lhs], registers[step.rhs])?;
        }
        Some(())
    }
}

/// Register state of one checksum run
///
/// Data is fed in chunks of whole little-endian words; the state never
/// touches the program beyond calling [`Evaluate::evaluate`], so runs over
/// a shared program are independent.
#[derive(Debug)]
pub struct ChecksumPass<'p, E: Evaluate + ?Sized> {
    program: &'p E,
    registers: [u32; 4],
    words: usize,
}

impl<'p, E: Evaluate + ?Sized> ChecksumPass<'p, E> {
    /// Start a run with A pre-mixed with the MPQ hash code
    pub fn new(program: &'p E, hash_code: u32) -> Self {
        ChecksumPass {
            program,
            registers: program.initial_registers(hash_code),
            words: 0,
        }
    }

    /// Process a chunk of data
    pub fn feed(&mut self, data: &[u8]) -> Result<()> {
        if data.len() % 4 != 0 {
            return Err(Error::MisalignedData(data.len()));
        }

        for word in data.chunks_exact(4) {
            self.registers[3] = LittleEndian::read_u32(word);
            self.program
                .evaluate(&mut self.registers)
                .ok_or(Error::DivisionByZero { word: self.words })?;
            self.words += 1;
        }

        Ok(())
    }

    /// Number of words processed so far
    pub fn words(&self) -> usize {
        self.words
    }

    /// Current register file `[A, B, C, S]`
    pub fn registers(&self) -> [u32; 4] {
        self.registers
    }

    /// Final checksum: register C reinterpreted as signed
    pub fn finish(self) -> i32 {
        self.registers[2] as i32
    }
}
