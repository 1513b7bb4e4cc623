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
use std::collections::{BTreeSet, HashMap};

use super::Error;
use crate::bytecode::Instruction;
use crate::ir::{BasicBlock, BlockItem};

/// Split an instruction sequence into basic blocks.  Boundaries fall
/// at jump sources, jump targets and exception-range delimiters, so
/// that control only ever enters a block at its first instruction
/// and leaves after its last.
pub fn partition(insts: &[Instruction]) -> Result<Vec<BasicBlock>, Error> {
    if insts.is_empty() {
        return Ok(Vec::new());
    }
    // Instruction index by byte offset, for locating the
    // instruction preceding a jump target.
    let index: HashMap<usize, usize> = insts.iter().enumerate().map(|(i, x)| (x.loc, i)).collect();
    //
    let mut starts = BTreeSet::new();
    let mut ends = BTreeSet::new();
    let mut newstart = true;
    for (i, inst) in insts.iter().enumerate() {
        if newstart {
            starts.insert(inst.loc);
            newstart = false;
        }
        if let Some(target) = inst.target_loc {
            // The jump ends its own block and opens one right after
            // itself; its target opens another.
            ends.insert(inst.loc);
            starts.insert(target);
            newstart = true;
            if target != 0 {
                let ti = match index.get(&target) {
                    Some(ti) => *ti,
                    None => {
                        return Err(Error::Invariant(
                            "jump target is not on an instruction boundary",
                        ));
                    }
                };
                ends.insert(insts[ti - 1].loc);
            }
        } else if inst.name == "beginCatch4" || inst.name == "endCatch" {
            starts.insert(inst.loc);
            if inst.loc != 0 {
                ends.insert(insts[i - 1].loc);
            }
        }
    }
    ends.insert(insts[insts.len() - 1].loc);
    // Starts and ends must pair up exactly; anything else means the
    // opcode metadata mis-described an instruction.
    if starts.len() != ends.len() {
        return Err(Error::Invariant("block starts and ends do not pair up"));
    }
    // Carve the instruction sequence along the boundaries.
    let mut blocks = Vec::with_capacity(starts.len());
    let mut rest = insts;
    for (start, end) in starts.iter().zip(ends.iter()) {
        if rest.first().map(|i| i.loc) != Some(*start) {
            return Err(Error::Invariant("block does not begin at its start offset"));
        }
        let mut n = 0;
        while n < rest.len() && rest[n].loc < *end {
            n += 1;
        }
        if n >= rest.len() || rest[n].loc != *end {
            return Err(Error::Invariant("block end offset is out of order"));
        }
        let (head, tail) = rest.split_at(n + 1);
        blocks.push(BasicBlock::new(
            *start,
            head.iter().cloned().map(BlockItem::Inst).collect(),
        ));
        rest = tail;
    }
    Ok(blocks)
}
