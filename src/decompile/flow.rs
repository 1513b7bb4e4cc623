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
use super::{targets, Error};
use crate::bytecode::{AuxValue, Operand};
use crate::ir::{BasicBlock, BlockItem, Node, Value, ValueKind};

/// Attempt exactly one structural transform over the block list.  A
/// success returns immediately so the driver can re-enter reduction:
/// the freshly built composite is itself a value which later opcodes
/// may consume.
pub(crate) fn recognize(blocks: &mut Vec<BasicBlock>) -> Result<bool, Error> {
    if recognize_if(blocks)? {
        return Ok(true);
    }
    if recognize_catch(blocks)? {
        return Ok(true);
    }
    recognize_foreach(blocks)
}

// ============================================================================
// If/Else
// ============================================================================

// The overall structure consists of four consecutive blocks:
//
//   [if] -> [then]  [else] -> [rest]
//    |--------|--------^        ^      <- conditional jump to else
//             |-----------------|      <- unconditional jump to rest
//
// Note that an if without an else branch never appears: the compiler
// inserts the else itself so every execution path produces a value.
// Only the rest block survives; the others are consumed by the
// composite.
fn recognize_if(blocks: &mut Vec<BasicBlock>) -> Result<bool, Error> {
    for i in 0..blocks.len() {
        if i + 4 > blocks.len() {
            break;
        }
        let jump0 = match blocks[i].jump() {
            Some(j) if j.on.is_some() => j.clone(),
            _ => continue,
        };
        let jump1 = match blocks[i + 1].jump() {
            Some(j) if j.on.is_none() => j.clone(),
            _ => continue,
        };
        if blocks[i + 2].jump().is_some() {
            continue;
        }
        if jump0.target != blocks[i + 2].loc {
            continue;
        }
        if jump1.target != blocks[i + 3].loc {
            continue;
        }
        if blocks[i + 1].has_raw() || blocks[i + 2].has_raw() {
            continue;
        }
        // Nothing else may enter either branch.
        let ts = targets(blocks);
        if ts.iter().any(|t| *t == blocks[i + 1].loc) {
            continue;
        }
        if ts.iter().filter(|t| **t == blocks[i + 2].loc).count() > 1 {
            continue;
        }
        // Both branches must end in a value the conditional can take
        // ownership of when rendered.
        let then_block = blocks[i + 1].without_last();
        let else_block = blocks[i + 2].clone();
        for b in [&then_block, &else_block] {
            match b.insts.last().and_then(|it| it.as_value()) {
                Some(v) => {
                    let implicit = v.as_literal() == Some("");
                    if !implicit && !v.is_proc_call() {
                        return Err(Error::Invariant(
                            "conditional branch ends in an unexpected value",
                        ));
                    }
                }
                None => {
                    return Err(Error::Invariant("conditional branch produced no value"));
                }
            }
        }
        //
        let node = Value::new(ValueKind::If {
            jumps: Box::new((jump0, jump1)),
            branches: Box::new((then_block, else_block)),
        });
        let head = blocks[i]
            .without_last()
            .append(vec![BlockItem::Node(Node::Value(node))]);
        blocks[i] = head;
        blocks.drain(i + 1..i + 3);
        return Ok(true);
    }
    Ok(false)
}

// ============================================================================
// Catch
// ============================================================================

// The overall structure consists of three consecutive blocks:
//
//   [beginCatch+body]   [landing pad]   [endCatch+rest]
//         |-------------------------------^    <- unconditional jump
//
// The landing pad handles the exceptional path and is never reached
// directly.  The tail of the end block (endCatch, reverse 2, the
// store of the result variable, pop) is extracted into a synthetic
// block owned by the composite; whatever follows it survives.
fn recognize_catch(blocks: &mut Vec<BasicBlock>) -> Result<bool, Error> {
    for i in 0..blocks.len() {
        if i + 3 > blocks.len() {
            break;
        }
        if !blocks[i].is_catch_begin() {
            continue;
        }
        if !blocks[i + 2].is_catch_end() {
            continue;
        }
        if blocks[i + 1].is_catch_begin() || blocks[i + 1].is_catch_end() {
            return Err(Error::Invariant("catch ranges overlap"));
        }
        if blocks[i].insts[1..].iter().any(|it| it.is_inst()) {
            continue;
        }
        // Body block: [beginCatch4, ..., command, result code, jump].
        let begin = &blocks[i];
        let begin_loc = begin.loc;
        let n = begin.insts.len();
        if n < 4 {
            return Err(Error::Invariant("catch body block is too short"));
        }
        let call = match begin.insts[n - 3].as_value() {
            Some(v) if v.is_proc_call() && v.on_stack => v.clone(),
            _ => {
                return Err(Error::Invariant("catch body does not end in a command"));
            }
        };
        if begin.insts[n - 2]
            .as_value()
            .and_then(|v| v.as_literal())
            .is_none()
        {
            return Err(Error::Invariant("catch body is missing its result code"));
        }
        if !matches!(begin.insts[n - 1], BlockItem::Node(Node::Jump(_))) {
            return Err(Error::Invariant("catch body is missing its exit jump"));
        }
        // The landing pad is always the same two opcodes.
        let middle = &blocks[i + 1];
        if middle.insts.len() != 2
            || !raw_named(&middle.insts[0], "pushResult")
            || !raw_named(&middle.insts[1], "pushReturnCode")
        {
            return Err(Error::Invariant("unrecognised catch landing pad"));
        }
        // End block: [endCatch, reverse 2, storeScalar1, pop, ...].
        let end = &blocks[i + 2];
        if end.insts.len() < 4
            || !raw_named(&end.insts[1], "reverse")
            || !raw_named(&end.insts[2], "storeScalar1")
            || !raw_named(&end.insts[3], "pop")
        {
            return Err(Error::Invariant("unrecognised catch tail"));
        }
        match end.insts[1].as_inst().and_then(|x| x.ops.first()) {
            Some(Operand::Int(2)) => {}
            _ => {
                return Err(Error::Invariant("unrecognised catch tail"));
            }
        }
        // Reshape the body: drop the opening instruction, absorb the
        // result-code push and the exit jump, destack the command.
        let mut body_items: Vec<BlockItem> = begin.insts[1..n - 3].to_vec();
        body_items.push(BlockItem::Node(Node::Value(call.destack())));
        let body = BasicBlock::new(begin_loc, body_items);
        //
        let tail_loc = end.insts[0].as_inst().map(|x| x.loc).unwrap_or(end.loc);
        let tail = BasicBlock::new(tail_loc, end.insts[0..4].to_vec());
        let rest = retag(end.splice(0, 4, vec![]));
        let pad = middle.clone();
        //
        let node = Value::new(ValueKind::Catch(Box::new([body, pad, tail])));
        blocks[i] = BasicBlock::new(begin_loc, vec![BlockItem::Node(Node::Value(node))]);
        blocks[i + 2] = rest;
        blocks.remove(i + 1);
        return Ok(true);
    }
    Ok(false)
}

// ============================================================================
// Foreach
// ============================================================================

// The overall structure consists of four consecutive blocks:
//
//   [init] -> [step]  [body] -> [rest]
//               ^ |------|---------^    <- conditional jump to rest
//               |--------|              <- unconditional jump to step
//
// The step block keeps its raw conditional jump: jumps cannot
// consume `foreach_step4` through normal reduction, so the reducer
// leaves both behind.  The dummy literal the compiler pushes after
// the loop heads the rest block, unless the implicit return already
// swallowed it.
fn recognize_foreach(blocks: &mut Vec<BasicBlock>) -> Result<bool, Error> {
    for i in 0..blocks.len() {
        if i + 4 > blocks.len() {
            break;
        }
        if blocks[i].jump().is_some() {
            continue;
        }
        let start_inst = match blocks[i].insts.last().and_then(|it| it.as_inst()) {
            Some(inst) if inst.name == "foreach_start4" => inst.clone(),
            _ => continue,
        };
        let step = &blocks[i + 1];
        if step.insts.len() != 2 {
            continue;
        }
        let step_inst = match step.insts[0].as_inst() {
            Some(inst) if inst.name == "foreach_step4" => inst.clone(),
            _ => continue,
        };
        let exit_target = match step.insts[1].as_inst() {
            Some(inst) if inst.name == "jumpFalse1" => match inst.target_loc {
                Some(t) => t,
                None => continue,
            },
            _ => continue,
        };
        let back = match blocks[i + 2].jump() {
            Some(j) if j.on.is_none() => j.clone(),
            _ => continue,
        };
        if exit_target != blocks[i + 3].loc {
            continue;
        }
        if back.target != blocks[i + 1].loc {
            continue;
        }
        if blocks[i + 2].has_raw() || blocks[i + 2].insts.len() < 2 {
            continue;
        }
        // The dummy result pushed after the loop, possibly already
        // folded into the implicit return.
        let lead = match blocks[i + 3].insts.first().and_then(|it| it.as_value()) {
            Some(v) if v.as_literal().is_some() => (v.clone(), true),
            Some(v) => match &v.kind {
                ValueKind::Done(inner) if inner.as_literal() == Some("") => {
                    (inner.as_ref().clone(), false)
                }
                _ => continue,
            },
            None => continue,
        };
        // The step block is entered only along the back edge, and
        // nothing else may enter the body or (beyond the loop exit)
        // the rest block.
        let ts = targets(blocks);
        if ts.iter().filter(|t| **t == blocks[i + 1].loc).count() > 1 {
            continue;
        }
        if ts.iter().any(|t| *t == blocks[i + 2].loc) {
            continue;
        }
        if ts.iter().filter(|t| **t == blocks[i + 3].loc).count() > 1 {
            continue;
        }
        // The loop descriptors on start and step must agree.
        let info = match start_inst.ops.first() {
            Some(Operand::Aux(aux)) => aux.clone(),
            _ => {
                return Err(Error::Invariant("foreach start is missing its descriptor"));
            }
        };
        match step_inst.ops.first() {
            Some(Operand::Aux(aux)) if *aux == info => {}
            _ => {
                return Err(Error::Invariant("foreach loop descriptors disagree"));
            }
        }
        let AuxValue::Foreach(lists) = &info;
        if lists.len() != 1 {
            return Err(Error::Invariant(
                "foreach over multiple value lists is not supported",
            ));
        }
        // Detach the initialiser: the list-temp assignment plus the
        // start opcode become a synthetic begin block.
        let without_start = blocks[i].without_last();
        let set_item = match without_start.insts.last() {
            Some(item @ BlockItem::Node(Node::Value(v)))
                if matches!(v.kind, ValueKind::Set(..)) =>
            {
                item.clone()
            }
            _ => {
                return Err(Error::Invariant("foreach list assignment is missing"));
            }
        };
        let head = without_start.without_last();
        let begin = BasicBlock::new(
            start_inst.loc,
            vec![set_item, BlockItem::Inst(start_inst)],
        );
        let step = step.clone();
        let body = blocks[i + 2].clone();
        let (end_literal, on_stack) = lead;
        //
        let node = Value {
            kind: ValueKind::Foreach(Box::new([begin, step, body]), Box::new(end_literal)),
            on_stack,
        };
        blocks[i] = head.append(vec![BlockItem::Node(Node::Value(node))]);
        let rest = retag(blocks[i + 3].splice(0, 1, vec![]));
        blocks[i + 3] = rest;
        blocks.drain(i + 1..i + 3);
        return Ok(true);
    }
    Ok(false)
}

// ============================================================================
// Helpers
// ============================================================================

fn raw_named(item: &BlockItem, name: &str) -> bool {
    match item.as_inst() {
        Some(inst) => inst.name == name,
        None => false,
    }
}

/// Re-tag a block whose leading elements were stripped, so its loc
/// matches whatever instruction now heads it.
fn retag(block: BasicBlock) -> BasicBlock {
    let loc = match block.insts.first().and_then(|it| it.as_inst()) {
        Some(inst) => inst.loc,
        None => block.loc,
    };
    BasicBlock::new(loc, block.insts)
}
