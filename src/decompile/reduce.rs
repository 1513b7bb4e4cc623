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
use super::{Change, Error};
use crate::bytecode::{Bytecode, Instruction};
use crate::ir::{BasicBlock, BlockItem, ExprOp, Jump, Node, Value, ValueKind};

// ============================================================================
// Compiler Quirks
// ============================================================================

/// `variable` has no stack effect, yet the surrounding machine
/// expects every command to push a result, so the compiler pairs
/// each `variable` with a push of the empty literal.  Delete those
/// pushes before any reduction.
pub fn strip_variable_pushes(
    bc: &Bytecode,
    block: &BasicBlock,
) -> Result<(BasicBlock, Vec<Change>), Error> {
    let mut found = Vec::new();
    for (i, item) in block.insts.iter().enumerate() {
        match item.as_inst() {
            Some(inst) if inst.name == "variable" => {}
            _ => continue,
        }
        let next = match block.insts.get(i + 1).and_then(|it| it.as_inst()) {
            Some(next) if next.name == "push1" || next.name == "push4" => next,
            _ => {
                return Err(Error::Invariant("variable is not followed by a push"));
            }
        };
        let idx = int_op(next, 0)? as usize;
        if !bc.literal(idx)?.is_empty() {
            return Err(Error::Invariant(
                "variable is not followed by the empty literal",
            ));
        }
        found.push(i);
    }
    //
    let mut nb = block.clone();
    let mut changes = Vec::with_capacity(found.len());
    for i in found.iter().rev() {
        nb = nb.splice(i + 1, i + 2, vec![]);
        changes.push(Change {
            from: (i + 1, i + 2),
            to: (i + 1, i + 1),
        });
    }
    Ok((nb, changes))
}

// ============================================================================
// Reduction Table
// ============================================================================

/// How many stack arguments a reduction consumes.
enum Arity {
    Fixed(usize),
    /// The first operand of the opcode gives the count.
    FirstOperand,
}

/// Extra requirement each collected argument must satisfy.
enum Guard {
    Any,
    /// Only command values: side effects may become statements,
    /// plain values may not.
    ProcCall,
    /// Only freely duplicable values.
    Simple,
}

/// The reduction table: for each reducible opcode, how many stack
/// arguments it consumes and which guard those arguments must pass.
fn reduction(name: &str) -> Option<(Arity, Guard)> {
    use Arity::*;
    use Guard::*;
    match name {
        // Pushes and callers
        "push1" | "push4" => Some((Fixed(0), Any)),
        "invokeStk1" | "invokeStk4" | "list" | "concat1" => Some((FirstOperand, Any)),
        "listLength" => Some((Fixed(1), Any)),
        "incrStkImm" | "incrScalarStkImm" => Some((Fixed(1), Any)),
        "incrScalar1Imm" => Some((Fixed(0), Any)),
        "variable" => Some((Fixed(1), Any)),
        // Jumps
        "jump1" => Some((Fixed(0), Any)),
        "jumpFalse1" | "jumpTrue1" => Some((Fixed(1), Any)),
        // Variable references
        "loadStk" | "loadScalarStk" => Some((Fixed(1), Any)),
        "loadArrayStk" => Some((Fixed(2), Any)),
        "loadScalar1" => Some((Fixed(0), Any)),
        "loadArray1" => Some((Fixed(1), Any)),
        // Variable sets
        "storeStk" | "storeScalarStk" => Some((Fixed(2), Any)),
        "storeArrayStk" => Some((Fixed(3), Any)),
        "storeScalar1" => Some((Fixed(1), Any)),
        "storeArray1" => Some((Fixed(2), Any)),
        // Expressions
        "gt" | "lt" | "ge" | "le" | "eq" | "neq" | "add" => Some((Fixed(2), Any)),
        "not" => Some((Fixed(1), Any)),
        // Misc
        "pop" => Some((Fixed(1), ProcCall)),
        "dup" => Some((Fixed(1), Simple)),
        "done" => Some((Fixed(1), Any)),
        "returnImm" => Some((Fixed(2), Any)),
        // No-ops at the source level
        "tryCvtToNumeric" | "nop" | "startCommand" => Some((Fixed(0), Any)),
        _ => None,
    }
}

/// Build the replacement node(s) for a reducible opcode and its
/// collected stack arguments.
fn construct(inst: &Instruction, mut args: Vec<Value>, bc: &Bytecode) -> Result<Vec<Node>, Error> {
    let nodes = match inst.name.as_str() {
        "push1" | "push4" => {
            let idx = int_op(inst, 0)? as usize;
            vec![value(ValueKind::Literal(bc.literal(idx)?.to_string()))]
        }
        "invokeStk1" | "invokeStk4" => vec![value(ValueKind::ProcCall(args))],
        "list" => {
            let mut words = vec![Value::literal("list")];
            words.append(&mut args);
            vec![value(ValueKind::ProcCall(words))]
        }
        "listLength" => {
            let mut words = vec![Value::literal("llength")];
            words.append(&mut args);
            vec![value(ValueKind::ProcCall(words))]
        }
        "incrStkImm" | "incrScalarStkImm" => {
            let delta = int_op(inst, 0)?;
            let mut words = vec![Value::literal("incr")];
            words.append(&mut args);
            if delta != 1 {
                words.push(Value::literal(&delta.to_string()));
            }
            vec![value(ValueKind::ProcCall(words))]
        }
        "incrScalar1Imm" => {
            let name = local_op(inst, 0)?;
            let delta = int_op(inst, 1)?;
            let mut words = vec![Value::literal("incr"), Value::literal(name)];
            if delta != 1 {
                words.push(Value::literal(&delta.to_string()));
            }
            vec![value(ValueKind::ProcCall(words))]
        }
        "variable" => {
            let name = args.remove(0);
            // The operand names the local slot; the pushed value is
            // the (possibly namespace-qualified) declared name.
            if !name.to_string().ends_with(local_op(inst, 0)?) {
                return Err(Error::Invariant(
                    "variable declaration does not match its local slot",
                ));
            }
            vec![value(ValueKind::Variable(Box::new(name)))]
        }
        "jump1" => vec![jump(inst, None, None)?],
        "jumpFalse1" => {
            let cond = args.remove(0);
            vec![jump(inst, Some(false), Some(cond))?]
        }
        "jumpTrue1" => {
            let cond = args.remove(0);
            vec![jump(inst, Some(true), Some(cond))?]
        }
        "loadStk" | "loadScalarStk" => {
            let name = args.remove(0);
            vec![value(ValueKind::VarRef(Box::new(name)))]
        }
        "loadArrayStk" => {
            let index = args.remove(1);
            let name = args.remove(0);
            vec![value(ValueKind::ArrayRef(Box::new(name), Box::new(index)))]
        }
        "loadScalar1" => {
            let name = Value::literal(local_op(inst, 0)?);
            vec![value(ValueKind::VarRef(Box::new(name)))]
        }
        "loadArray1" => {
            let name = Value::literal(local_op(inst, 0)?);
            let index = args.remove(0);
            vec![value(ValueKind::ArrayRef(Box::new(name), Box::new(index)))]
        }
        "storeStk" | "storeScalarStk" => {
            let rvalue = args.remove(1);
            let name = args.remove(0);
            vec![value(ValueKind::Set(
                Box::new(Node::Value(name)),
                Box::new(rvalue),
            ))]
        }
        "storeArrayStk" => {
            let rvalue = args.remove(2);
            let index = args.remove(1);
            let name = args.remove(0);
            let elt = Node::ArrayElt(Box::new(name), Box::new(index));
            vec![value(ValueKind::Set(Box::new(elt), Box::new(rvalue)))]
        }
        "storeScalar1" => {
            let name = Value::literal(local_op(inst, 0)?);
            let rvalue = args.remove(0);
            vec![value(ValueKind::Set(
                Box::new(Node::Value(name)),
                Box::new(rvalue),
            ))]
        }
        "storeArray1" => {
            let name = Value::literal(local_op(inst, 0)?);
            let rvalue = args.remove(1);
            let index = args.remove(0);
            let elt = Node::ArrayElt(Box::new(name), Box::new(index));
            vec![value(ValueKind::Set(Box::new(elt), Box::new(rvalue)))]
        }
        "gt" | "lt" | "ge" | "le" | "eq" | "neq" | "add" | "not" => {
            let op = match ExprOp::from_opcode(&inst.name) {
                Some(op) => op,
                None => unreachable!(),
            };
            vec![value(ValueKind::Expr(op, args))]
        }
        "concat1" => vec![value(ValueKind::Concat(args))],
        "pop" => vec![Node::Value(args.remove(0).destack())],
        "dup" => {
            let arg = args.remove(0);
            vec![Node::Value(arg.clone()), Node::Value(arg)]
        }
        "done" => {
            let inner = args.remove(0);
            vec![value(ValueKind::Done(Box::new(inner)))]
        }
        "returnImm" => {
            let options = args.remove(1);
            let result = args.remove(0);
            if options.as_literal() != Some("") {
                return Err(Error::Invariant("return carries non-empty options"));
            }
            if int_op(inst, 0)? != 0 || int_op(inst, 1)? != 1 {
                return Err(Error::Invariant("return has unexpected code or level"));
            }
            vec![value(ValueKind::Return(Box::new(result), Box::new(options)))]
        }
        // Theoretically tryCvtToNumeric does something...
        "tryCvtToNumeric" | "nop" | "startCommand" => vec![],
        _ => unreachable!(),
    };
    Ok(nodes)
}

// ============================================================================
// Reduction
// ============================================================================

/// Attempt a single reduction within the given block, returning the
/// new block plus the change records describing the rewrite.  An
/// unchanged block comes back with no change records.
pub fn reduce_block(bc: &Bytecode, block: &BasicBlock) -> Result<(BasicBlock, Vec<Change>), Error> {
    for (i, item) in block.insts.iter().enumerate() {
        let inst = match item.as_inst() {
            Some(inst) => inst,
            None => continue,
        };
        let (arity, guard) = match reduction(&inst.name) {
            Some(r) => r,
            None => continue,
        };
        let nargs = match arity {
            Arity::Fixed(n) => n,
            Arity::FirstOperand => int_op(inst, 0)? as usize,
        };
        let args = match collect_args(block, i, nargs, &guard) {
            Some(args) => args,
            None => continue,
        };
        let replacement = construct(inst, args, bc)?;
        let lo = i - nargs;
        let hi = i + 1;
        let to = (lo, lo + replacement.len());
        let nb = block.splice(lo, hi, replacement.into_iter().map(BlockItem::Node).collect());
        return Ok((nb, vec![Change { from: (lo, hi), to }]));
    }
    Ok((block.clone(), vec![]))
}

/// Scan backwards from position `i` collecting the opcode's stack
/// arguments: values still resident on the stack, most recent first.
/// Values already consumed by an earlier statement are skipped; a
/// non-value or a guard failure terminates the scan.  Returns the
/// arguments in stack order, or nothing if too few were found.
fn collect_args(block: &BasicBlock, i: usize, nargs: usize, guard: &Guard) -> Option<Vec<Value>> {
    let mut args = Vec::with_capacity(nargs);
    for item in block.insts[..i].iter().rev() {
        if args.len() == nargs {
            break;
        }
        let v = match item.as_value() {
            Some(v) => v,
            None => break,
        };
        if !v.on_stack {
            continue;
        }
        match guard {
            Guard::ProcCall if !v.is_proc_call() => break,
            Guard::Simple if !v.is_simple() => break,
            _ => {}
        }
        args.push(v.clone());
    }
    if args.len() != nargs {
        return None;
    }
    args.reverse();
    Some(args)
}

// ============================================================================
// Helpers
// ============================================================================

fn value(kind: ValueKind) -> Node {
    Node::Value(Value::new(kind))
}

fn jump(inst: &Instruction, on: Option<bool>, cond: Option<Value>) -> Result<Node, Error> {
    let target = match inst.target_loc {
        Some(t) => t,
        None => return Err(Error::Invariant("jump opcode has no recorded target")),
    };
    Ok(Node::Jump(Jump {
        on,
        target,
        value: cond.map(Box::new),
    }))
}

fn int_op(inst: &Instruction, i: usize) -> Result<i64, Error> {
    match inst.ops.get(i).and_then(|op| op.as_int()) {
        Some(v) => Ok(v),
        None => Err(Error::Invariant("operand has an unexpected kind")),
    }
}

fn local_op<'a>(inst: &'a Instruction, i: usize) -> Result<&'a str, Error> {
    match inst.ops.get(i).and_then(|op| op.as_local()) {
        Some(n) => Ok(n),
        None => Err(Error::Invariant("operand has an unexpected kind")),
    }
}
