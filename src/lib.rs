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
/// Functionality related to compiled procedure bodies.  This covers
/// the raw byte buffer and its side tables (literals, local-variable
/// names, aux records), the opcode metadata table describing how each
/// opcode is laid out, and the decoder which turns the buffer into a
/// flat instruction sequence.
pub mod bytecode;
/// The pipeline which lifts an instruction sequence back into source
/// text: basic-block partitioning, iterative reduction of stack
/// effects, structural recovery of control flow, and the fixpoint
/// driver tying them together.
pub mod decompile;
/// The intermediate representation produced by reduction.  This
/// includes the node tree itself, basic blocks holding a mixture of
/// nodes and undecoded instructions, and the literal quoting rules
/// used when rendering nodes back into source text.
pub mod ir;

pub use bytecode::{
    AuxEntry, AuxValue, Bytecode, Cursor, DecodeError, Disassemble, Instruction, Opcode,
    OpcodeTable, Operand, OperandKind,
};
pub use decompile::{
    decompile, decompile_steps, partition, Change, ChangeLoc, Error, Snapshot, StepChange,
};
pub use ir::{quote, BasicBlock, BlockItem, ExprOp, Jump, Node, Value, ValueKind};
