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

use super::block::{BasicBlock, BlockItem};
use super::quote::quote;
use crate::bytecode::{AuxValue, Operand};

// ============================================================================
// Nodes
// ============================================================================

/// A single element of the recovered program tree.  Reduction
/// replaces runs of raw instructions within a basic block by nodes;
/// structural recovery replaces runs of basic blocks by composite
/// nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Anything which can sit (or could once have sat) on the
    /// operand stack.
    Value(Value),
    /// A control transfer.  Always the last element of its block.
    Jump(Jump),
    /// An array-element lvalue `name(index)`.  A formatting
    /// container only: it is never a stack resident and appears only
    /// as the target of an assignment.
    ArrayElt(Box<Value>, Box<Value>),
}

impl Node {
    pub fn is_value(&self) -> bool {
        matches!(self, Node::Value(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Node::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::Value(v) => write!(f, "{}", v),
            Node::Jump(j) => write!(f, "{}", j),
            Node::ArrayElt(name, index) => write!(f, "{}({})", name, index),
        }
    }
}

// ============================================================================
// Jumps
// ============================================================================

/// A conditional or unconditional control transfer.  Conditional
/// jumps hold the value they consumed as their condition.
#[derive(Clone, Debug, PartialEq)]
pub struct Jump {
    /// `None` for an unconditional jump; otherwise the branch is
    /// taken when the condition evaluates to the given truth value.
    pub on: Option<bool>,
    /// Absolute byte offset of the target instruction.
    pub target: usize,
    /// The consumed condition value, for conditional jumps.
    pub value: Option<Box<Value>>,
}

impl fmt::Display for Jump {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.on, &self.value) {
            (Some(on), Some(v)) => write!(f, "jump({}=={}) -> {}", v, on, self.target),
            _ => write!(f, "jump -> {}", self.target),
        }
    }
}

// ============================================================================
// Expression Operators
// ============================================================================

/// The arithmetic and comparison operators the reducer recognises.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ExprOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Neq,
    Add,
    Not,
}

impl ExprOp {
    /// The operator corresponding to a given opcode mnemonic (if
    /// any).
    pub fn from_opcode(name: &str) -> Option<ExprOp> {
        match name {
            "gt" => Some(ExprOp::Gt),
            "lt" => Some(ExprOp::Lt),
            "ge" => Some(ExprOp::Ge),
            "le" => Some(ExprOp::Le),
            "eq" => Some(ExprOp::Eq),
            "neq" => Some(ExprOp::Neq),
            "add" => Some(ExprOp::Add),
            "not" => Some(ExprOp::Not),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ExprOp::Gt => ">",
            ExprOp::Lt => "<",
            ExprOp::Ge => ">=",
            ExprOp::Le => "<=",
            ExprOp::Eq => "==",
            ExprOp::Neq => "!=",
            ExprOp::Add => "+",
            ExprOp::Not => "!",
        }
    }

    /// Number of operands the operator takes.
    pub fn arity(&self) -> usize {
        match self {
            ExprOp::Not => 1,
            _ => 2,
        }
    }
}

// ============================================================================
// Values
// ============================================================================

/// A value node.  `on_stack` tracks whether the value is still
/// resident on the abstract operand stack at its textual position;
/// once a later node consumes it (a `pop`, an enclosing structure)
/// the flag drops and the value renders as a plain statement rather
/// than a `[...]` substitution.
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    pub kind: ValueKind,
    pub on_stack: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValueKind {
    /// A constant from the literal table.
    Literal(String),
    /// Scalar variable dereference.
    VarRef(Box<Value>),
    /// Array element dereference.
    ArrayRef(Box<Value>, Box<Value>),
    /// Concatenation of two or more parts.
    Concat(Vec<Value>),
    /// An arithmetic or comparison expression.
    Expr(ExprOp, Vec<Value>),
    /// General command invocation: callee followed by arguments.
    ProcCall(Vec<Value>),
    /// Assignment.  The target is either a plain name value or an
    /// array-element lvalue.
    Set(Box<Node>, Box<Value>),
    /// A `variable` declaration.
    Variable(Box<Value>),
    /// An explicit `return`: result value plus the (empty) options
    /// value the compiler pushes alongside it.
    Return(Box<Value>, Box<Value>),
    /// The implicit-return opcode wrapping the procedure's final
    /// value.
    Done(Box<Value>),
    /// A two-branch conditional, together with the pair of jumps
    /// which selected the branches.
    If {
        jumps: Box<(Jump, Jump)>,
        branches: Box<(BasicBlock, BasicBlock)>,
    },
    /// A recovered `catch`: body block, the landing pad the compiler
    /// emits for the exceptional path, and the extracted tail which
    /// stores the result.
    Catch(Box<[BasicBlock; 3]>),
    /// A recovered `foreach`: initialiser block, step block and loop
    /// body, plus the dummy literal the compiler pushes as the
    /// loop's result.
    Foreach(Box<[BasicBlock; 3]>, Box<Value>),
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Value {
            kind,
            on_stack: true,
        }
    }

    /// A synthetic literal (one with no backing instruction).
    pub fn literal(s: &str) -> Self {
        Value::new(ValueKind::Literal(s.to_string()))
    }

    /// Mark this value as consumed.
    pub fn destack(mut self) -> Self {
        assert!(self.on_stack);
        self.on_stack = false;
        self
    }

    /// Whether this value renders as a command (and hence wraps in
    /// `[...]` whilst stack resident).
    pub fn is_proc_call(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::ProcCall(_)
                | ValueKind::Set(..)
                | ValueKind::Variable(_)
                | ValueKind::Return(..)
                | ValueKind::Done(_)
                | ValueKind::If { .. }
                | ValueKind::Catch(_)
                | ValueKind::Foreach(..)
        )
    }

    /// Whether this value is freely duplicable.
    pub fn is_simple(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::Literal(_) | ValueKind::VarRef(_) | ValueKind::ArrayRef(..)
        )
    }

    pub fn as_literal(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Literal(s) => Some(s),
            _ => None,
        }
    }

    /// Write `cmd`, wrapped as a `[...]` substitution when this
    /// value is still stack resident.
    fn command(&self, f: &mut fmt::Formatter, cmd: &str) -> fmt::Result {
        if self.on_stack {
            write!(f, "[{}]", cmd)
        } else {
            write!(f, "{}", cmd)
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ValueKind::Literal(s) => write!(f, "{}", quote(s)),
            ValueKind::VarRef(name) => write!(f, "${}", name),
            ValueKind::ArrayRef(name, index) => write!(f, "${}({})", name, index),
            ValueKind::Concat(parts) => {
                // TODO: quoting here is best-effort; a literal
                // directly following a variable reference can change
                // how the name is parsed.
                write!(f, "\"")?;
                for p in parts {
                    write!(f, "{}", p)?;
                }
                write!(f, "\"")
            }
            ValueKind::Expr(op, args) => write!(f, "[expr {{{}}}]", expr_str(*op, args)),
            ValueKind::ProcCall(args) => self.command(f, &proc_call_str(args)),
            ValueKind::Set(lvalue, rvalue) => {
                self.command(f, &format!("set {} {}", lvalue, rvalue))
            }
            ValueKind::Variable(name) => self.command(f, &format!("variable {}", name)),
            ValueKind::Return(value, _options) => {
                if value.as_literal() == Some("") {
                    write!(f, "return")
                } else {
                    write!(f, "return {}", value)
                }
            }
            ValueKind::Done(value) => {
                // Whether the source spelt out `return` is not
                // recoverable: a trailing command is rendered bare.
                if value.is_proc_call() {
                    write!(f, "{}", value.as_ref().clone().destack())
                } else {
                    write!(f, "return {}", value)
                }
            }
            ValueKind::If { jumps, branches } => self.command(f, &if_str(jumps, branches)),
            ValueKind::Catch(blocks) => self.command(f, &catch_str(blocks)),
            ValueKind::Foreach(blocks, _end) => self.command(f, &foreach_str(blocks)),
        }
    }
}

// ============================================================================
// Rendering Helpers
// ============================================================================

/// Indent every subsequent line of an already rendered body.
fn indent(s: &str) -> String {
    s.replace('\n', "\n\t")
}

/// Render the inner form of an expression (without the `[expr {...}]`
/// wrapper).
pub(crate) fn expr_str(op: ExprOp, args: &[Value]) -> String {
    if op.arity() == 1 {
        format!("{}{}", op.symbol(), args[0])
    } else {
        format!("{} {} {}", args[0], op.symbol(), args[1])
    }
}

fn proc_call_str(args: &[Value]) -> String {
    let mut words = Vec::new();
    for arg in args {
        words.push(arg.to_string());
    }
    // The compiler resolves `array set` into its fully qualified
    // form; undo that on the way out.
    if words.first().map(|w| w.as_str()) == Some("::tcl::array::set") {
        words.splice(0..1, ["array".to_string(), "set".to_string()]);
    }
    words.join(" ")
}

fn if_str(jumps: &(Jump, Jump), branches: &(BasicBlock, BasicBlock)) -> String {
    // The conditional takes ownership of the values produced in its
    // branches: a dangling empty literal disappears, a trailing
    // command becomes the branch's statement.
    let then_block = promote_branch(&branches.0);
    let else_block = promote_branch(&branches.1);
    // The first jump skips the then-branch, so a jump taken on true
    // inverts the condition.
    let condition = match &jumps.0.value {
        Some(v) => match &v.kind {
            ValueKind::Expr(op, args) => {
                let e = expr_str(*op, args);
                if jumps.0.on == Some(true) {
                    format!("!({})", e)
                } else {
                    e
                }
            }
            _ => {
                let s = v.to_string();
                if jumps.0.on == Some(true) {
                    format!("!{}", s)
                } else {
                    s
                }
            }
        },
        None => String::new(),
    };
    let mut cmd = format!(
        "if {{{}}} {{\n\t{}\n}}",
        condition,
        indent(&then_block.to_string())
    );
    if !else_block.insts.is_empty() {
        cmd.push_str(&format!(" else {{\n\t{}\n}}", indent(&else_block.to_string())));
    }
    cmd
}

/// Absorb a branch's terminal value into the enclosing conditional:
/// an empty literal is deleted, a stack-resident command is
/// destacked.
fn promote_branch(block: &BasicBlock) -> BasicBlock {
    match block.insts.last() {
        Some(BlockItem::Node(Node::Value(v))) => match &v.kind {
            ValueKind::Literal(_) => block.without_last(),
            _ if v.is_proc_call() && v.on_stack => {
                let n = block.insts.len();
                block.splice(
                    n - 1,
                    n,
                    vec![BlockItem::Node(Node::Value(v.clone().destack()))],
                )
            }
            _ => block.clone(),
        },
        _ => block.clone(),
    }
}

fn catch_str(blocks: &[BasicBlock; 3]) -> String {
    let [begin, _middle, end] = blocks;
    // The catch-result variable is named by the store in the
    // extracted tail.
    let varname = match end.insts.get(2) {
        Some(BlockItem::Inst(inst)) => match inst.ops.first() {
            Some(Operand::Local(name)) => name.clone(),
            _ => String::new(),
        },
        _ => String::new(),
    };
    format!("catch {{{}}} {}", begin, varname)
}

fn foreach_str(blocks: &[BasicBlock; 3]) -> String {
    let [begin, _step, body] = blocks;
    // Loop variables come from the descriptor on the start opcode;
    // the iterated list from the temp-variable assignment before it.
    let vars = match begin.insts.get(1) {
        Some(BlockItem::Inst(inst)) => match inst.ops.first() {
            Some(Operand::Aux(AuxValue::Foreach(lists))) if !lists.is_empty() => {
                lists[0].join(" ")
            }
            _ => String::new(),
        },
        _ => String::new(),
    };
    let list = match begin.insts.first() {
        Some(BlockItem::Node(Node::Value(v))) => match &v.kind {
            ValueKind::Set(_, rvalue) => rvalue.to_string(),
            _ => String::new(),
        },
        _ => String::new(),
    };
    // Drop the back edge off the body before rendering it.
    let body = body.without_last();
    format!(
        "foreach {{{}}} {} {{\n\t{}\n}}",
        vars,
        list,
        indent(&body.to_string())
    )
}
