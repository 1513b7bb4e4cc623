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

use log::{debug, warn};

use crate::bytecode::{Bytecode, DecodeError, Disassemble, OpcodeTable};
use crate::ir::BasicBlock;

mod flow;
mod join;
mod partition;
mod reduce;

pub use partition::partition;
pub use reduce::{reduce_block, strip_variable_pushes};

// ============================================================================
// Errors
// ============================================================================

/// Errors which can arise during decompilation.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// The byte buffer or one of its side tables could not be
    /// decoded.
    Decode(DecodeError),
    /// Structurally valid bytecode broke a rule the recognised
    /// compiler dialect guarantees.  Decompilation stops rather than
    /// guess.
    Invariant(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Decode(e) => write!(f, "{}", e),
            Error::Invariant(msg) => write!(f, "invariant violated: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::Decode(e)
    }
}

// ============================================================================
// Change Records
// ============================================================================

/// Records a single rewrite within a block: which index range was
/// replaced, and which range the replacement occupies.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Change {
    pub from: (usize, usize),
    pub to: (usize, usize),
}

/// One observation of the block list, taken after each driver stage
/// which moved something.  `changes[j]` holds the rewrites applied
/// to block `j` since the previous snapshot.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub blocks: Vec<BasicBlock>,
    pub changes: Vec<Vec<Change>>,
}

/// One side of a step-level change record: which snapshot, which
/// block, which index range.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChangeLoc {
    pub step: usize,
    pub block: usize,
    pub range: (usize, usize),
}

/// Ties a rewrite to its provenance across two consecutive
/// snapshots.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StepChange {
    pub from: ChangeLoc,
    pub to: ChangeLoc,
}

/// The rendering of every block at one snapshot: one list of lines
/// per block.
pub type Step = Vec<Vec<String>>;

// ============================================================================
// Driver
// ============================================================================

/// Every jump target visible in the block list: targets of reduced
/// terminal jumps plus targets of any undecompiled instructions.
pub(crate) fn targets(blocks: &[BasicBlock]) -> Vec<usize> {
    let mut ts = Vec::new();
    for b in blocks {
        if let Some(j) = b.jump() {
            ts.push(j.target);
        }
        for item in &b.insts {
            if let Some(inst) = item.as_inst() {
                if let Some(t) = inst.target_loc {
                    ts.push(t);
                }
            }
        }
    }
    ts
}

/// Run the pipeline to its fixpoint, recording a snapshot after each
/// stage which made progress.
fn run(bc: &Bytecode, table: &OpcodeTable) -> Result<Vec<Snapshot>, Error> {
    let insts = bc.disassemble(table)?;
    let mut blocks = partition(&insts)?;
    let mut snapshots = vec![Snapshot {
        blocks: blocks.clone(),
        changes: vec![Vec::new(); blocks.len()],
    }];
    // Undo compiler quirks before any reduction.
    let mut hacked = Vec::with_capacity(blocks.len());
    let mut hack_changes = Vec::with_capacity(blocks.len());
    let mut changed = false;
    for b in &blocks {
        let (nb, cs) = strip_variable_pushes(bc, b)?;
        changed = changed || !cs.is_empty();
        hacked.push(nb);
        hack_changes.push(cs);
    }
    blocks = hacked;
    if changed {
        snapshots.push(Snapshot {
            blocks: blocks.clone(),
            changes: hack_changes,
        });
    }
    // Reduce within blocks until nothing moves; only then try to
    // coalesce blocks, and only then to recognise a structure.  Any
    // success feeds back into reduction, since a freshly built
    // composite is itself a value later opcodes may consume.
    loop {
        let mut changes = Vec::with_capacity(blocks.len());
        let mut reduced = false;
        let mut next = Vec::with_capacity(blocks.len());
        for b in &blocks {
            let (nb, cs) = reduce_block(bc, b)?;
            reduced = reduced || !cs.is_empty();
            next.push(nb);
            changes.push(cs);
        }
        blocks = next;
        let mut moved = reduced;
        if !moved {
            moved = join::coalesce(&mut blocks);
        }
        if !moved {
            moved = flow::recognize(&mut blocks)?;
        }
        if !moved {
            break;
        }
        let changes = if reduced {
            changes
        } else {
            vec![Vec::new(); blocks.len()]
        };
        debug!("driver iteration left {} blocks", blocks.len());
        snapshots.push(Snapshot {
            blocks: blocks.clone(),
            changes,
        });
    }
    Ok(snapshots)
}

// ============================================================================
// Public API
// ============================================================================

/// Decompile a procedure body into source text.  When the pipeline
/// stalls on bytecode it does not recognise, the unreduced residue is
/// rendered in its debug form rather than guessed at.
pub fn decompile(bc: &Bytecode, table: &OpcodeTable) -> Result<String, Error> {
    let snapshots = run(bc, table)?;
    let blocks = &snapshots[snapshots.len() - 1].blocks;
    //
    let residue: usize = blocks
        .iter()
        .map(|b| b.insts.iter().filter(|i| i.is_inst()).count())
        .sum();
    if residue > 0 {
        warn!("fixpoint reached with {} undecompiled instructions", residue);
    }
    //
    let mut out = String::new();
    for b in blocks {
        out.push_str(&b.to_string());
        out.push('\n');
    }
    Ok(out)
}

/// Decompile a procedure body, returning every intermediate snapshot
/// (rendered per block) together with change records tying each
/// rewrite to its provenance.  Intended for diagnostic UIs.
pub fn decompile_steps(
    bc: &Bytecode,
    table: &OpcodeTable,
) -> Result<(Vec<Step>, Vec<StepChange>), Error> {
    let snapshots = run(bc, table)?;
    let mut steps = Vec::with_capacity(snapshots.len());
    let mut changes = Vec::new();
    for (i, snap) in snapshots.iter().enumerate() {
        let mut step = Vec::with_capacity(snap.blocks.len());
        for (j, block) in snap.blocks.iter().enumerate() {
            step.push(block.render_insts());
            for c in &snap.changes[j] {
                changes.push(StepChange {
                    from: ChangeLoc {
                        step: i - 1,
                        block: j,
                        range: c.from,
                    },
                    to: ChangeLoc {
                        step: i,
                        block: j,
                        range: c.to,
                    },
                });
            }
        }
        steps.push(step);
    }
    Ok((steps, changes))
}
