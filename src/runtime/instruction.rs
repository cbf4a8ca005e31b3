//! Instruction representation consumed by the interpreter
//!
//! Function bodies are flat instruction sequences. Structured instructions
//! (`block`, `loop`, `if`, `else`) carry the offsets of their matching `else`
//! and `end`, resolved once by [`link`] so that branching never has to scan
//! the body.

use super::store::{FuncAddr, GlobalAddr, MemoryAddr};
use super::value::ValueType;
use std::fmt;
use std::rc::Rc;

/// Offset of an instruction within a function body
pub type InstructionPointer = usize;

/// Function signature
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionType {
    pub params: Vec<ValueType>,
    pub results: Vec<ValueType>,
}

impl FunctionType {
    pub fn new(params: Vec<ValueType>, results: Vec<ValueType>) -> Self {
        FunctionType { params, results }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let join = |types: &[ValueType]| types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(" ");
        write!(f, "[{}] -> [{}]", join(&self.params), join(&self.results))
    }
}

/// Block signature
///
/// Only the arities matter during execution; operand types were checked by
/// validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// No parameters, no results
    Empty,
    /// No parameters, a single result
    Value(ValueType),
    /// Multi-value block
    Arity { params: usize, results: usize },
}

impl BlockType {
    pub fn params(&self) -> usize {
        match self {
            BlockType::Empty | BlockType::Value(_) => 0,
            BlockType::Arity { params, .. } => *params,
        }
    }

    pub fn results(&self) -> usize {
        match self {
            BlockType::Empty => 0,
            BlockType::Value(_) => 1,
            BlockType::Arity { results, .. } => *results,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // Control
    Unreachable,
    Nop,
    Block {
        block_type: BlockType,
        end: InstructionPointer,
    },
    Loop {
        block_type: BlockType,
    },
    If {
        block_type: BlockType,
        else_ip: Option<InstructionPointer>,
        end: InstructionPointer,
    },
    Else {
        end: InstructionPointer,
    },
    End,
    Br {
        label_idx: u32,
    },
    BrIf {
        label_idx: u32,
    },
    BrTable {
        labels: Vec<u32>,
        default: u32,
    },
    Return,
    Call {
        func: FuncAddr,
    },

    // Parametric
    Drop,
    Select,

    // Variable
    LocalGet {
        local_idx: u32,
    },
    LocalSet {
        local_idx: u32,
    },
    LocalTee {
        local_idx: u32,
    },
    GlobalGet {
        global: GlobalAddr,
    },
    GlobalSet {
        global: GlobalAddr,
    },

    // Memory
    I32Load {
        memory: MemoryAddr,
        offset: u32,
    },
    I64Load {
        memory: MemoryAddr,
        offset: u32,
    },
    I32Store {
        memory: MemoryAddr,
        offset: u32,
    },
    I64Store {
        memory: MemoryAddr,
        offset: u32,
    },
    MemorySize {
        memory: MemoryAddr,
    },
    MemoryGrow {
        memory: MemoryAddr,
    },

    // Numeric
    I32Const {
        value: i32,
    },
    I64Const {
        value: i64,
    },
    F32Const {
        value: f32,
    },
    F64Const {
        value: f64,
    },
    I32Eqz,
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32GeS,
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,
    I64Eqz,
    I64Eq,
    I64LtS,
    I64GtS,
    I64Add,
    I64Sub,
    I64Mul,
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,
}

impl Instruction {
    /// `block` with its `end` left for [`link`] to resolve
    pub fn block(block_type: BlockType) -> Self {
        Instruction::Block { block_type, end: 0 }
    }

    pub fn loop_(block_type: BlockType) -> Self {
        Instruction::Loop { block_type }
    }

    /// `if` with its `else`/`end` left for [`link`] to resolve
    pub fn if_(block_type: BlockType) -> Self {
        Instruction::If {
            block_type,
            else_ip: None,
            end: 0,
        }
    }

    pub fn else_() -> Self {
        Instruction::Else { end: 0 }
    }

    /// Text-format mnemonic
    pub fn name(&self) -> &'static str {
        use Instruction::*;
        match self {
            Unreachable => "unreachable",
            Nop => "nop",
            Block { .. } => "block",
            Loop { .. } => "loop",
            If { .. } => "if",
            Else { .. } => "else",
            End => "end",
            Br { .. } => "br",
            BrIf { .. } => "br_if",
            BrTable { .. } => "br_table",
            Return => "return",
            Call { .. } => "call",
            Drop => "drop",
            Select => "select",
            LocalGet { .. } => "local.get",
            LocalSet { .. } => "local.set",
            LocalTee { .. } => "local.tee",
            GlobalGet { .. } => "global.get",
            GlobalSet { .. } => "global.set",
            I32Load { .. } => "i32.load",
            I64Load { .. } => "i64.load",
            I32Store { .. } => "i32.store",
            I64Store { .. } => "i64.store",
            MemorySize { .. } => "memory.size",
            MemoryGrow { .. } => "memory.grow",
            I32Const { .. } => "i32.const",
            I64Const { .. } => "i64.const",
            F32Const { .. } => "f32.const",
            F64Const { .. } => "f64.const",
            I32Eqz => "i32.eqz",
            I32Eq => "i32.eq",
            I32Ne => "i32.ne",
            I32LtS => "i32.lt_s",
            I32LtU => "i32.lt_u",
            I32GtS => "i32.gt_s",
            I32GtU => "i32.gt_u",
            I32LeS => "i32.le_s",
            I32GeS => "i32.ge_s",
            I32Add => "i32.add",
            I32Sub => "i32.sub",
            I32Mul => "i32.mul",
            I32DivS => "i32.div_s",
            I32DivU => "i32.div_u",
            I32RemS => "i32.rem_s",
            I32RemU => "i32.rem_u",
            I32And => "i32.and",
            I32Or => "i32.or",
            I32Xor => "i32.xor",
            I32Shl => "i32.shl",
            I32ShrS => "i32.shr_s",
            I32ShrU => "i32.shr_u",
            I64Eqz => "i64.eqz",
            I64Eq => "i64.eq",
            I64LtS => "i64.lt_s",
            I64GtS => "i64.gt_s",
            I64Add => "i64.add",
            I64Sub => "i64.sub",
            I64Mul => "i64.mul",
            F64Add => "f64.add",
            F64Sub => "f64.sub",
            F64Mul => "f64.mul",
            F64Div => "f64.div",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("end at offset {0} closes no block")]
    UnmatchedEnd(InstructionPointer),
    #[error("else at offset {0} does not belong to an if")]
    MisplacedElse(InstructionPointer),
    #[error("block opened at offset {0} is never closed")]
    UnterminatedBlock(InstructionPointer),
}

enum Structure {
    Open,
    Else,
    End,
    Plain,
}

/// Resolve the `else`/`end` offsets of every structured instruction
///
/// The body of a function is not terminated by its own `end`; execution of a
/// frame finishes when the instruction pointer runs off the end of the body.
pub fn link(mut instructions: Vec<Instruction>) -> Result<Rc<[Instruction]>, LinkError> {
    let mut open: Vec<InstructionPointer> = Vec::new();

    for ip in 0..instructions.len() {
        let structure = match &instructions[ip] {
            Instruction::Block { .. } | Instruction::Loop { .. } | Instruction::If { .. } => Structure::Open,
            Instruction::Else { .. } => Structure::Else,
            Instruction::End => Structure::End,
            _ => Structure::Plain,
        };

        match structure {
            Structure::Open => open.push(ip),
            Structure::Else => {
                let opener = *open.last().ok_or(LinkError::MisplacedElse(ip))?;
                match &mut instructions[opener] {
                    Instruction::If { else_ip, .. } if else_ip.is_none() => *else_ip = Some(ip),
                    _ => return Err(LinkError::MisplacedElse(ip)),
                }
            }
            Structure::End => {
                let opener = open.pop().ok_or(LinkError::UnmatchedEnd(ip))?;
                let else_ip = match &mut instructions[opener] {
                    Instruction::Block { end, .. } => {
                        *end = ip;
                        None
                    }
                    Instruction::If { end, else_ip, .. } => {
                        *end = ip;
                        *else_ip
                    }
                    _ => None,
                };
                if let Some(else_ip) = else_ip {
                    if let Instruction::Else { end } = &mut instructions[else_ip] {
                        *end = ip;
                    }
                }
            }
            Structure::Plain => {}
        }
    }

    if let Some(&unclosed) = open.last() {
        return Err(LinkError::UnterminatedBlock(unclosed));
    }

    Ok(instructions.into())
}
