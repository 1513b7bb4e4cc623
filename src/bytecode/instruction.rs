// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use std::fmt;

use super::cursor::{AuxEntry, Bytecode, Cursor, DecodeError};
use super::opcode::{OpcodeTable, OperandKind};

/// Names of the opcodes which transfer control within a procedure.
/// These are the only opcodes for which a branch target is recorded.
pub const JUMP_INSTRUCTIONS: &[&str] = &[
    "jump1",
    "jump4",
    "jumpTrue1",
    "jumpTrue4",
    "jumpFalse1",
    "jumpFalse4",
];

// ============================================================================
// Operands
// ============================================================================

/// A resolved aux record, with every local-variable index already
/// translated to the matching name.
#[derive(Clone, Debug, PartialEq)]
pub enum AuxValue {
    /// One list of loop-variable names per value list.
    Foreach(Vec<Vec<String>>),
}

/// A fully resolved operand value.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// A signed or unsigned fixed-width integer.
    Int(i64),
    /// The name of a local variable.
    Local(String),
    /// A resolved aux record.
    Aux(AuxValue),
}

impl Operand {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Operand::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_local(&self) -> Option<&str> {
        match self {
            Operand::Local(n) => Some(n),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Int(i) => write!(f, "{}", i),
            Operand::Local(n) => write!(f, "%{}", n),
            Operand::Aux(AuxValue::Foreach(lists)) => write!(f, "ForeachInfo{:?}", lists),
        }
    }
}

// ============================================================================
// Instructions
// ============================================================================

/// A single decoded instruction: where it sits in the byte buffer,
/// which opcode it is, and its resolved operand values.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    /// Byte offset of this instruction within the procedure body.
    pub loc: usize,
    /// Opcode mnemonic, from the metadata table.
    pub name: String,
    /// Resolved operand values, in declaration order.
    pub ops: Vec<Operand>,
    /// Absolute byte offset of the branch target, for the jump
    /// opcodes only.
    pub target_loc: Option<usize>,
}

impl Instruction {
    /// Decode the next instruction under the cursor, resolving its
    /// operands against the side tables.
    pub fn decode(cursor: &mut Cursor, table: &OpcodeTable) -> Result<Instruction, DecodeError> {
        let loc = cursor.offset();
        let byte = cursor.peek_opcode()?;
        let info = match table.get(byte) {
            Some(info) => info,
            None => {
                return Err(DecodeError::UnknownOpcode {
                    offset: loc,
                    opcode: byte,
                });
            }
        };
        let bytes = cursor.advance(info.num_bytes)?;
        // Pull each operand off the encoding in turn.
        let mut rest = &bytes[1..];
        let mut ops = Vec::new();
        for kind in &info.operands {
            let width = kind.width();
            if rest.len() < width {
                return Err(DecodeError::UnexpectedEnd {
                    offset: loc,
                    wanted: width,
                });
            }
            let raw = &rest[..width];
            rest = &rest[width..];
            //
            let op = match kind {
                OperandKind::None => {
                    return Err(DecodeError::InvalidOperandKind { offset: loc });
                }
                OperandKind::Int1 => Operand::Int(raw[0] as i8 as i64),
                OperandKind::Uint1 => Operand::Int(raw[0] as i64),
                OperandKind::Int4 | OperandKind::Idx4 => {
                    Operand::Int(i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64)
                }
                OperandKind::Uint4 => {
                    Operand::Int(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64)
                }
                OperandKind::Lvt1 => Operand::Local(cursor.local(raw[0] as usize)?.to_string()),
                OperandKind::Lvt4 => {
                    let idx = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
                    Operand::Local(cursor.local(idx)?.to_string())
                }
                OperandKind::Aux4 => {
                    let idx = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
                    Operand::Aux(resolve_aux(cursor, idx)?)
                }
            };
            ops.push(op);
        }
        // Record the absolute branch target for jump opcodes.
        let target_loc = if JUMP_INSTRUCTIONS.contains(&info.name.as_str()) {
            let delta = match ops.first().and_then(|op| op.as_int()) {
                Some(delta) => delta,
                None => {
                    return Err(DecodeError::InvalidOperandKind { offset: loc });
                }
            };
            let target = loc as i64 + delta;
            if target < 0 {
                return Err(DecodeError::InvalidJumpTarget { offset: loc });
            }
            Some(target as usize)
        } else {
            None
        };
        //
        Ok(Instruction {
            loc,
            name: info.name.clone(),
            ops,
            target_loc,
        })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{}: {}", self.loc, self.name)?;
        for op in &self.ops {
            write!(f, " {}", op)?;
        }
        write!(f, ">")
    }
}

/// Resolve an aux operand, remapping any local-variable indices in
/// its payload to the matching names.
fn resolve_aux(cursor: &Cursor, idx: usize) -> Result<AuxValue, DecodeError> {
    match cursor.aux(idx)? {
        AuxEntry::Foreach(lists) => {
            let mut names = Vec::new();
            for list in lists {
                let mut vars = Vec::new();
                for v in list {
                    vars.push(cursor.local(*v)?.to_string());
                }
                names.push(vars);
            }
            Ok(AuxValue::Foreach(names))
        }
        AuxEntry::Unknown(tag) => Err(DecodeError::UnknownAuxTag(tag.clone())),
    }
}

// ============================================================================
// Disassemble
// ============================================================================

/// A trait for converting something (e.g. a procedure body) into a
/// flat sequence of decoded instructions.
pub trait Disassemble {
    fn disassemble(&self, table: &OpcodeTable) -> Result<Vec<Instruction>, DecodeError>;
}

impl Disassemble for Bytecode {
    fn disassemble(&self, table: &OpcodeTable) -> Result<Vec<Instruction>, DecodeError> {
        let mut cursor = self.cursor();
        let mut insts = Vec::new();
        //
        while cursor.remaining() > 0 {
            insts.push(Instruction::decode(&mut cursor, table)?);
        }
        // Done
        Ok(insts)
    }
}
