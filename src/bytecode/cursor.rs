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

// ============================================================================
// Decode Error
// ============================================================================

/// Errors which can arise when pulling apart a compiled procedure
/// body.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeError {
    /// When decoding a procedure body, the cursor was asked for more
    /// bytes than remain in the buffer.
    UnexpectedEnd { offset: usize, wanted: usize },
    /// When decoding a procedure body, an opcode byte was encountered
    /// which has no entry in the metadata table.
    UnknownOpcode { offset: usize, opcode: u8 },
    /// When decoding a procedure body, the metadata table declared an
    /// operand kind which never appears in real bytecode.
    InvalidOperandKind { offset: usize },
    /// When resolving an operand, a literal table index was out of
    /// bounds.
    LiteralOutOfBounds(usize),
    /// When resolving an operand, a local-variable table index was
    /// out of bounds.
    LocalOutOfBounds(usize),
    /// When resolving an operand, an aux table index was out of
    /// bounds.
    AuxOutOfBounds(usize),
    /// When resolving an operand, the referenced aux record carried a
    /// tag the decoder does not understand.
    UnknownAuxTag(String),
    /// When decoding a jump, the signed offset landed before the
    /// start of the byte buffer.
    InvalidJumpTarget { offset: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for DecodeError {}

// ============================================================================
// Aux Table
// ============================================================================

/// A single record of the aux table.  Aux records are side structures
/// produced by the compiler and referenced by opcode operand.  Their
/// payloads refer to locals by _index_; resolution into names happens
/// during instruction decoding.
#[derive(Clone, Debug, PartialEq)]
pub enum AuxEntry {
    /// Loop descriptor for `foreach`: one list of local-variable
    /// indices per value list.
    Foreach(Vec<Vec<usize>>),
    /// A record of a kind the decompiler does not understand.  The
    /// tag is retained for diagnostics.
    Unknown(String),
}

// ============================================================================
// Bytecode
// ============================================================================

/// A compiled procedure body, as produced by the bytecode compiler:
/// an opaque sequence of variable-length opcodes plus the three side
/// tables its operands index into.
#[derive(Clone, Debug, PartialEq)]
pub struct Bytecode {
    code: Vec<u8>,
    literals: Vec<String>,
    locals: Vec<String>,
    auxes: Vec<AuxEntry>,
}

impl Bytecode {
    pub fn new(
        code: Vec<u8>,
        literals: Vec<String>,
        locals: Vec<String>,
        auxes: Vec<AuxEntry>,
    ) -> Self {
        Bytecode {
            code,
            literals,
            locals,
            auxes,
        }
    }

    /// Length (in bytes) of the opcode buffer.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Look up an entry of the literal table.
    pub fn literal(&self, n: usize) -> Result<&str, DecodeError> {
        match self.literals.get(n) {
            Some(s) => Ok(s),
            None => Err(DecodeError::LiteralOutOfBounds(n)),
        }
    }

    /// Look up the name of a local variable.
    pub fn local(&self, n: usize) -> Result<&str, DecodeError> {
        match self.locals.get(n) {
            Some(s) => Ok(s),
            None => Err(DecodeError::LocalOutOfBounds(n)),
        }
    }

    /// Look up an entry of the aux table.
    pub fn aux(&self, n: usize) -> Result<&AuxEntry, DecodeError> {
        match self.auxes.get(n) {
            Some(a) => Ok(a),
            None => Err(DecodeError::AuxOutOfBounds(n)),
        }
    }

    /// Construct a fresh cursor positioned at the start of the
    /// opcode buffer.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            bytecode: self,
            offset: 0,
        }
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// A read position within a procedure body.  A cursor borrows the
/// underlying buffer and tables, so any number of independent cursors
/// can walk the same body.
#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    bytecode: &'a Bytecode,
    offset: usize,
}

impl<'a> Cursor<'a> {
    /// Read the opcode byte at the current position without moving.
    pub fn peek_opcode(&self) -> Result<u8, DecodeError> {
        match self.bytecode.code.get(self.offset) {
            Some(b) => Ok(*b),
            None => Err(DecodeError::UnexpectedEnd {
                offset: self.offset,
                wanted: 1,
            }),
        }
    }

    /// Take the next `n` bytes, moving the cursor past them.
    pub fn advance(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let start = self.offset;
        if start + n <= self.bytecode.code.len() {
            self.offset += n;
            Ok(&self.bytecode.code[start..self.offset])
        } else {
            Err(DecodeError::UnexpectedEnd {
                offset: start,
                wanted: n,
            })
        }
    }

    /// Number of bytes between the current position and the end of
    /// the buffer.
    pub fn remaining(&self) -> usize {
        self.bytecode.code.len() - self.offset
    }

    /// Byte offset of the current position.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Produce an independent cursor at the same position, sharing
    /// the underlying buffer and tables.
    pub fn snapshot(&self) -> Cursor<'a> {
        *self
    }

    pub fn literal(&self, n: usize) -> Result<&'a str, DecodeError> {
        self.bytecode.literal(n)
    }

    pub fn local(&self, n: usize) -> Result<&'a str, DecodeError> {
        self.bytecode.local(n)
    }

    pub fn aux(&self, n: usize) -> Result<&'a AuxEntry, DecodeError> {
        self.bytecode.aux(n)
    }
}
