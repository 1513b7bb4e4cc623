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

use super::node::{Jump, Node, Value};
use crate::bytecode::Instruction;

// ============================================================================
// Block Items
// ============================================================================

/// A single element of a basic block: either an instruction the
/// reducer has not (yet) understood, or a reduced node.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockItem {
    Inst(Instruction),
    Node(Node),
}

impl BlockItem {
    pub fn is_inst(&self) -> bool {
        matches!(self, BlockItem::Inst(_))
    }

    pub fn as_inst(&self) -> Option<&Instruction> {
        match self {
            BlockItem::Inst(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            BlockItem::Node(n) => n.as_value(),
            _ => None,
        }
    }
}

impl fmt::Display for BlockItem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BlockItem::Inst(i) => write!(f, "{}", i),
            BlockItem::Node(n) => write!(f, "{}", n),
        }
    }
}

// ============================================================================
// Basic Blocks
// ============================================================================

/// A maximal straight-line run of instructions with a single entry
/// and a single exit.  Blocks are never mutated in place: every edit
/// produces a new block, so that before and after states remain
/// observable as distinct values.
#[derive(Clone, Debug, PartialEq)]
pub struct BasicBlock {
    /// Byte offset at which this block starts.
    pub loc: usize,
    /// The block's contents, in execution order.
    pub insts: Vec<BlockItem>,
}

impl BasicBlock {
    pub fn new(loc: usize, insts: Vec<BlockItem>) -> Self {
        BasicBlock { loc, insts }
    }

    /// Produce a new block with the half-open index range `lo..hi`
    /// replaced by the given items.
    pub fn splice(&self, lo: usize, hi: usize, with: Vec<BlockItem>) -> BasicBlock {
        let mut insts = self.insts.clone();
        insts.splice(lo..hi, with);
        BasicBlock {
            loc: self.loc,
            insts,
        }
    }

    /// Produce a new block with the given items appended.
    pub fn append(&self, items: Vec<BlockItem>) -> BasicBlock {
        let n = self.insts.len();
        self.splice(n, n, items)
    }

    /// Produce a new block with the final item removed.
    pub fn without_last(&self) -> BasicBlock {
        let n = self.insts.len();
        assert!(n > 0);
        self.splice(n - 1, n, vec![])
    }

    /// The reduced jump terminating this block, if there is one.
    pub fn jump(&self) -> Option<&Jump> {
        match self.insts.last() {
            Some(BlockItem::Node(Node::Jump(j))) => Some(j),
            _ => None,
        }
    }

    /// Whether this block still holds any undecoded instructions.
    pub fn has_raw(&self) -> bool {
        self.insts.iter().any(|i| i.is_inst())
    }

    /// Whether this block opens an exception range.
    pub fn is_catch_begin(&self) -> bool {
        match self.insts.first() {
            Some(BlockItem::Inst(i)) => i.name == "beginCatch4",
            _ => false,
        }
    }

    /// Whether this block closes an exception range.
    pub fn is_catch_end(&self) -> bool {
        match self.insts.first() {
            Some(BlockItem::Inst(i)) => i.name == "endCatch",
            _ => false,
        }
    }

    /// Render each element of this block on its own line.
    pub fn render_insts(&self) -> Vec<String> {
        self.insts.iter().map(|i| i.to_string()).collect()
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render_insts().join("\n"))
    }
}
