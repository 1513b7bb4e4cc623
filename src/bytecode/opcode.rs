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

// ============================================================================
// Operand Kinds
// ============================================================================

/// The kinds of operand which can follow an opcode byte.  Each kind
/// determines both the width of the encoded operand and how it is
/// resolved: plain integers are kept as-is, `Lvt` operands index the
/// local-variable table and `Aux4` operands index the aux table.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum OperandKind {
    /// Should never be present in a table entry.
    None,
    /// One byte, big-endian signed.
    Int1,
    /// Four bytes, big-endian signed.
    Int4,
    /// One byte, big-endian unsigned.
    Uint1,
    /// Four bytes, big-endian unsigned.
    Uint4,
    /// Four bytes, big-endian signed index.
    Idx4,
    /// One byte, unsigned index into the local-variable table.
    Lvt1,
    /// Four bytes, unsigned index into the local-variable table.
    Lvt4,
    /// Four bytes, unsigned index into the aux table.
    Aux4,
}

impl OperandKind {
    /// Width (in bytes) of the encoded operand.
    pub fn width(&self) -> usize {
        match self {
            OperandKind::None => 0,
            OperandKind::Int1 | OperandKind::Uint1 | OperandKind::Lvt1 => 1,
            _ => 4,
        }
    }
}

// ============================================================================
// Opcode Metadata
// ============================================================================

/// Metadata for a single opcode: its mnemonic, the total encoded
/// length (opcode byte included) and the kinds of its operands.
#[derive(Clone, Debug, PartialEq)]
pub struct Opcode {
    pub name: String,
    pub num_bytes: usize,
    pub operands: Vec<OperandKind>,
}

/// An indexable table of opcode metadata, keyed by opcode byte.  The
/// table is supplied by the host; [`OpcodeTable::standard`] carries
/// the stock Tcl 8.5 instruction set.
#[derive(Clone, Debug)]
pub struct OpcodeTable {
    entries: Vec<Option<Opcode>>,
}

impl OpcodeTable {
    /// Construct a table with no entries.
    pub fn empty() -> Self {
        let mut entries = Vec::with_capacity(256);
        entries.resize(256, None);
        OpcodeTable { entries }
    }

    /// Define (or redefine) the metadata for a given opcode byte.
    pub fn define(&mut self, byte: u8, name: &str, num_bytes: usize, operands: &[OperandKind]) {
        self.entries[byte as usize] = Some(Opcode {
            name: name.to_string(),
            num_bytes,
            operands: operands.to_vec(),
        });
    }

    /// Look up the metadata for a given opcode byte.
    pub fn get(&self, byte: u8) -> Option<&Opcode> {
        self.entries[byte as usize].as_ref()
    }

    /// Reverse lookup of an opcode byte from its mnemonic.
    pub fn opcode_of(&self, name: &str) -> Option<u8> {
        for (i, e) in self.entries.iter().enumerate() {
            match e {
                Some(op) if op.name == name => {
                    return Some(i as u8);
                }
                _ => {}
            }
        }
        None
    }

    /// The stock Tcl 8.5 instruction table.
    pub fn standard() -> Self {
        let mut table = OpcodeTable::empty();
        for (i, (name, num_bytes, operands)) in STANDARD.iter().enumerate() {
            table.define(i as u8, name, *num_bytes, operands);
        }
        table
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        OpcodeTable::standard()
    }
}

// ============================================================================
// Standard Table
// ============================================================================

use OperandKind::{Aux4, Idx4, Int1, Int4, Lvt1, Lvt4, Uint1, Uint4};

/// The Tcl 8.5 instruction set, in opcode order.  Mnemonics and
/// operand layouts follow the compiler's own instruction table.
#[rustfmt::skip]
const STANDARD: &[(&str, usize, &[OperandKind])] = &[
    // 0s: stack and invocation
    ("done", 1, &[]),
    ("push1", 2, &[Uint1]),
    ("push4", 5, &[Uint4]),
    ("pop", 1, &[]),
    ("dup", 1, &[]),
    ("concat1", 2, &[Uint1]),
    ("invokeStk1", 2, &[Uint1]),
    ("invokeStk4", 5, &[Uint4]),
    ("evalStk", 1, &[]),
    ("exprStk", 1, &[]),
    // 10s: variable loads
    ("loadScalar1", 2, &[Lvt1]),
    ("loadScalar4", 5, &[Lvt4]),
    ("loadScalarStk", 1, &[]),
    ("loadArray1", 2, &[Lvt1]),
    ("loadArray4", 5, &[Lvt4]),
    ("loadArrayStk", 1, &[]),
    ("loadStk", 1, &[]),
    // variable stores
    ("storeScalar1", 2, &[Lvt1]),
    ("storeScalar4", 5, &[Lvt4]),
    ("storeScalarStk", 1, &[]),
    ("storeArray1", 2, &[Lvt1]),
    ("storeArray4", 5, &[Lvt4]),
    ("storeArrayStk", 1, &[]),
    ("storeStk", 1, &[]),
    // increments
    ("incrScalar1", 2, &[Lvt1]),
    ("incrScalarStk", 1, &[]),
    ("incrArray1", 2, &[Lvt1]),
    ("incrArrayStk", 1, &[]),
    ("incrStk", 1, &[]),
    ("incrScalar1Imm", 3, &[Lvt1, Int1]),
    ("incrScalarStkImm", 2, &[Int1]),
    ("incrArray1Imm", 3, &[Lvt1, Int1]),
    ("incrArrayStkImm", 2, &[Int1]),
    ("incrStkImm", 2, &[Int1]),
    // jumps
    ("jump1", 2, &[Int1]),
    ("jump4", 5, &[Int4]),
    ("jumpTrue1", 2, &[Int1]),
    ("jumpTrue4", 5, &[Int4]),
    ("jumpFalse1", 2, &[Int1]),
    ("jumpFalse4", 5, &[Int4]),
    // logic and arithmetic
    ("lor", 1, &[]),
    ("land", 1, &[]),
    ("bitor", 1, &[]),
    ("bitxor", 1, &[]),
    ("bitand", 1, &[]),
    ("eq", 1, &[]),
    ("neq", 1, &[]),
    ("lt", 1, &[]),
    ("gt", 1, &[]),
    ("le", 1, &[]),
    ("ge", 1, &[]),
    ("lshift", 1, &[]),
    ("rshift", 1, &[]),
    ("add", 1, &[]),
    ("sub", 1, &[]),
    ("mult", 1, &[]),
    ("div", 1, &[]),
    ("mod", 1, &[]),
    ("uplus", 1, &[]),
    ("uminus", 1, &[]),
    ("bitnot", 1, &[]),
    ("not", 1, &[]),
    ("callBuiltinFunc1", 2, &[Uint1]),
    ("callFunc1", 2, &[Uint1]),
    ("tryCvtToNumeric", 1, &[]),
    // loop control
    ("break", 1, &[]),
    ("continue", 1, &[]),
    ("foreach_start4", 5, &[Aux4]),
    ("foreach_step4", 5, &[Aux4]),
    // exception ranges
    ("beginCatch4", 5, &[Uint4]),
    ("endCatch", 1, &[]),
    ("pushResult", 1, &[]),
    ("pushReturnCode", 1, &[]),
    // string operations
    ("streq", 1, &[]),
    ("strneq", 1, &[]),
    ("strcmp", 1, &[]),
    ("strlen", 1, &[]),
    ("strindex", 1, &[]),
    ("strmatch", 2, &[Int1]),
    // list operations
    ("list", 5, &[Uint4]),
    ("listIndex", 1, &[]),
    ("listLength", 1, &[]),
    // appends
    ("appendScalar1", 2, &[Lvt1]),
    ("appendScalar4", 5, &[Lvt4]),
    ("appendArray1", 2, &[Lvt1]),
    ("appendArray4", 5, &[Lvt4]),
    ("appendArrayStk", 1, &[]),
    ("appendStk", 1, &[]),
    ("lappendScalar1", 2, &[Lvt1]),
    ("lappendScalar4", 5, &[Lvt4]),
    ("lappendArray1", 2, &[Lvt1]),
    ("lappendArray4", 5, &[Lvt4]),
    ("lappendArrayStk", 1, &[]),
    ("lappendStk", 1, &[]),
    ("lindexMulti", 5, &[Uint4]),
    ("over", 5, &[Uint4]),
    ("lsetList", 1, &[]),
    ("lsetFlat", 5, &[Uint4]),
    // returns and expansion
    ("returnImm", 9, &[Int4, Uint4]),
    ("expon", 1, &[]),
    ("expandStart", 1, &[]),
    ("expandStkTop", 5, &[Uint4]),
    ("invokeExpanded", 1, &[]),
    ("listIndexImm", 5, &[Idx4]),
    ("listRangeImm", 9, &[Idx4, Idx4]),
    ("startCommand", 9, &[Int4, Uint4]),
    ("listIn", 1, &[]),
    ("listNotIn", 1, &[]),
    ("pushReturnOpts", 1, &[]),
    ("returnStk", 1, &[]),
    // dict operations
    ("dictGet", 5, &[Uint4]),
    ("dictSet", 9, &[Uint4, Lvt4]),
    ("dictUnset", 9, &[Uint4, Lvt4]),
    ("dictIncrImm", 9, &[Int4, Lvt4]),
    ("dictAppend", 5, &[Lvt4]),
    ("dictLappend", 5, &[Lvt4]),
    ("dictFirst", 5, &[Lvt4]),
    ("dictNext", 5, &[Lvt4]),
    ("dictDone", 5, &[Lvt4]),
    ("dictUpdateStart", 9, &[Lvt4, Aux4]),
    ("dictUpdateEnd", 9, &[Lvt4, Aux4]),
    ("jumpTable", 5, &[Aux4]),
    // namespaces
    ("upvar", 5, &[Lvt4]),
    ("nsupvar", 5, &[Lvt4]),
    ("variable", 5, &[Lvt4]),
    ("syntax", 9, &[Int4, Uint4]),
    ("reverse", 5, &[Uint4]),
    ("regexp", 2, &[Int1]),
    ("existScalar", 5, &[Lvt4]),
    ("existArray", 5, &[Lvt4]),
    ("existArrayStk", 1, &[]),
    ("existStk", 1, &[]),
    ("nop", 1, &[]),
    ("returnCodeBranch", 1, &[]),
];
