use tcldec::{decompile, AuxEntry, Bytecode, Error, OpcodeTable};

mod util;
use util::body;

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_decompile_01() {
    // set a 1
    check(
        &[("push1", &[0]), ("storeScalar1", &[0]), ("done", &[])],
        &["1"],
        &["a"],
        vec![],
        "set a 1\n",
    );
}

#[test]
fn test_decompile_02() {
    // set a [expr {1 + 2}]
    check(
        &[
            ("push1", &[0]),
            ("push1", &[1]),
            ("add", &[]),
            ("storeScalar1", &[0]),
            ("done", &[]),
        ],
        &["1", "2"],
        &["a"],
        vec![],
        "set a [expr {1 + 2}]\n",
    );
}

#[test]
fn test_decompile_03() {
    // Numeric conversions vanish from the output.
    check(
        &[
            ("push1", &[0]),
            ("push1", &[1]),
            ("add", &[]),
            ("tryCvtToNumeric", &[]),
            ("storeScalar1", &[0]),
            ("done", &[]),
        ],
        &["1", "2"],
        &["a"],
        vec![],
        "set a [expr {1 + 2}]\n",
    );
}

#[test]
fn test_decompile_04() {
    // A call whose value is discarded renders without brackets.
    check(
        &[
            ("push1", &[0]),
            ("push1", &[1]),
            ("invokeStk1", &[2]),
            ("pop", &[]),
            ("push1", &[2]),
            ("storeScalar1", &[0]),
            ("done", &[]),
        ],
        &["puts", "hi", "1"],
        &["a"],
        vec![],
        "puts hi\nset a 1\n",
    );
}

#[test]
fn test_decompile_05() {
    // A call in value position keeps its brackets.
    check(
        &[
            ("push1", &[0]),
            ("push1", &[1]),
            ("list", &[2]),
            ("storeScalar1", &[0]),
            ("done", &[]),
        ],
        &["1", "2"],
        &["x"],
        vec![],
        "set x [list 1 2]\n",
    );
}

#[test]
fn test_decompile_06() {
    // llength is rebuilt from its dedicated opcode.
    check(
        &[
            ("loadScalar1", &[0]),
            ("listLength", &[]),
            ("storeScalar1", &[1]),
            ("done", &[]),
        ],
        &[],
        &["l", "n"],
        vec![],
        "set n [llength $l]\n",
    );
}

#[test]
fn test_decompile_07() {
    // Array element stores and loads.
    check(
        &[
            ("push1", &[0]),
            ("push1", &[1]),
            ("storeArray1", &[0]),
            ("done", &[]),
        ],
        &["k", "1"],
        &["a"],
        vec![],
        "set a(k) 1\n",
    );
    check(
        &[
            ("push1", &[0]),
            ("loadArray1", &[0]),
            ("storeScalar1", &[1]),
            ("done", &[]),
        ],
        &["k"],
        &["a", "b"],
        vec![],
        "set b $a(k)\n",
    );
}

#[test]
fn test_decompile_08() {
    // Concatenation renders as one double-quoted word.
    check(
        &[
            ("push1", &[0]),
            ("loadScalar1", &[0]),
            ("concat1", &[2]),
            ("storeScalar1", &[1]),
            ("done", &[]),
        ],
        &["x="],
        &["b", "a"],
        vec![],
        "set a \"x=$b\"\n",
    );
}

#[test]
fn test_decompile_09() {
    // The fully qualified array set is split back into two words.
    check(
        &[
            ("push1", &[0]),
            ("push1", &[1]),
            ("push1", &[2]),
            ("invokeStk1", &[3]),
            ("done", &[]),
        ],
        &["::tcl::array::set", "a", "x 1"],
        &[],
        vec![],
        "array set a {x 1}\n",
    );
}

// ============================================================================
// Increments
// ============================================================================

#[test]
fn test_decompile_10() {
    // A unit increment has no explicit delta.
    check(&[("incrScalar1Imm", &[0, 1]), ("done", &[])], &[], &["x"], vec![], "incr x\n");
}

#[test]
fn test_decompile_11() {
    check(
        &[("incrScalar1Imm", &[0, 3]), ("done", &[])],
        &[],
        &["x"],
        vec![],
        "incr x 3\n",
    );
}

#[test]
fn test_decompile_12() {
    // The stack-addressed form goes through the pushed name.
    check(
        &[("push1", &[0]), ("incrStkImm", &[5]), ("done", &[])],
        &["x"],
        &[],
        vec![],
        "incr x 5\n",
    );
}

// ============================================================================
// Returns
// ============================================================================

#[test]
fn test_decompile_13() {
    // A bare return.
    check(
        &[
            ("push1", &[0]),
            ("push1", &[0]),
            ("returnImm", &[0, 1]),
            ("done", &[]),
        ],
        &[""],
        &[],
        vec![],
        "return\n",
    );
}

#[test]
fn test_decompile_14() {
    // A return with a value.
    check(
        &[
            ("push1", &[0]),
            ("push1", &[1]),
            ("returnImm", &[0, 1]),
            ("done", &[]),
        ],
        &["ok", ""],
        &[],
        vec![],
        "return ok\n",
    );
}

#[test]
fn test_decompile_15() {
    // Unexpected return operands are outside the dialect.
    let table = OpcodeTable::standard();
    let bc = body(
        &table,
        &[
            ("push1", &[0]),
            ("push1", &[0]),
            ("returnImm", &[2, 1]),
            ("done", &[]),
        ],
        &[""],
        &[],
        vec![],
    );
    assert!(matches!(decompile(&bc, &table), Err(Error::Invariant(_))));
}

// ============================================================================
// Declarations
// ============================================================================

#[test]
fn test_decompile_16() {
    // The compiler pairs `variable` with a push of the empty
    // literal; the pair folds back into one declaration.
    check(
        &[
            ("push1", &[0]),
            ("variable", &[0]),
            ("push1", &[1]),
            ("done", &[]),
        ],
        &["ns::v", ""],
        &["v"],
        vec![],
        "variable ns::v\n",
    );
}

#[test]
fn test_decompile_17() {
    // A `variable` without its companion push is outside the
    // dialect.
    let table = OpcodeTable::standard();
    let bc = body(
        &table,
        &[("push1", &[0]), ("variable", &[0]), ("done", &[])],
        &["ns::v"],
        &["v"],
        vec![],
    );
    assert!(matches!(decompile(&bc, &table), Err(Error::Invariant(_))));
}

// ============================================================================
// Conditionals
// ============================================================================

#[test]
fn test_decompile_18() {
    // if {$a > 1} { set b 1 } else { set b 2 }
    check(
        &[
            ("loadScalar1", &[0]),  // 0
            ("push1", &[0]),        // 2
            ("gt", &[]),            // 4
            ("jumpFalse1", &[8]),   // 5 -> 13
            ("push1", &[0]),        // 7
            ("storeScalar1", &[1]), // 9
            ("jump1", &[6]),        // 11 -> 17
            ("push1", &[1]),        // 13
            ("storeScalar1", &[1]), // 15
            ("done", &[]),          // 17
        ],
        &["1", "2"],
        &["a", "b"],
        vec![],
        "if {$a > 1} {\n\tset b 1\n} else {\n\tset b 2\n}\n",
    );
}

#[test]
fn test_decompile_19() {
    // A jump taken on true inverts the condition.
    check(
        &[
            ("loadScalar1", &[0]),  // 0
            ("push1", &[0]),        // 2
            ("gt", &[]),            // 4
            ("jumpTrue1", &[8]),    // 5 -> 13
            ("push1", &[0]),        // 7
            ("storeScalar1", &[1]), // 9
            ("jump1", &[6]),        // 11 -> 17
            ("push1", &[1]),        // 13
            ("storeScalar1", &[1]), // 15
            ("done", &[]),          // 17
        ],
        &["1", "2"],
        &["a", "b"],
        vec![],
        "if {!($a > 1)} {\n\tset b 1\n} else {\n\tset b 2\n}\n",
    );
}

#[test]
fn test_decompile_20() {
    // A plain (non-expression) condition is not parenthesised.
    check(
        &[
            ("loadScalar1", &[0]),  // 0
            ("jumpFalse1", &[8]),   // 2 -> 10
            ("push1", &[0]),        // 4
            ("storeScalar1", &[1]), // 6
            ("jump1", &[6]),        // 8 -> 14
            ("push1", &[1]),        // 10
            ("storeScalar1", &[1]), // 12
            ("done", &[]),          // 14
        ],
        &["1", "2"],
        &["a", "b"],
        vec![],
        "if {$a} {\n\tset b 1\n} else {\n\tset b 2\n}\n",
    );
}

#[test]
fn test_decompile_21() {
    // A branch ending in the implicit empty literal drops its else
    // clause entirely.
    check(
        &[
            ("loadScalar1", &[0]),  // 0
            ("jumpFalse1", &[8]),   // 2 -> 10
            ("push1", &[0]),        // 4
            ("storeScalar1", &[1]), // 6
            ("jump1", &[4]),        // 8 -> 12
            ("push1", &[1]),        // 10
            ("done", &[]),          // 12
        ],
        &["1", ""],
        &["a", "b"],
        vec![],
        "if {$a} {\n\tset b 1\n}\n",
    );
}

// ============================================================================
// Loops
// ============================================================================

#[test]
fn test_decompile_22() {
    // foreach x {1 2 3} { puts $x } at the end of a procedure: the
    // implicit return has already swallowed the loop's dummy result.
    check(
        &[
            ("push1", &[0]),          // 0
            ("storeScalar1", &[0]),   // 2
            ("pop", &[]),             // 4
            ("foreach_start4", &[0]), // 5
            ("foreach_step4", &[0]),  // 10
            ("jumpFalse1", &[11]),    // 15 -> 26
            ("push1", &[1]),          // 17
            ("loadScalar1", &[1]),    // 19
            ("invokeStk1", &[2]),     // 21
            ("pop", &[]),             // 23
            ("jump1", &[-14]),        // 24 -> 10
            ("push1", &[2]),          // 26
            ("done", &[]),            // 28
        ],
        &["1 2 3", "puts", ""],
        &["tmp", "x"],
        vec![AuxEntry::Foreach(vec![vec![1]])],
        "foreach {x} {1 2 3} {\n\tputs $x\n}\n",
    );
}

#[test]
fn test_decompile_23() {
    // foreach followed by another statement: the dummy result is
    // discarded by a pop instead.
    check(
        &[
            ("push1", &[0]),          // 0
            ("storeScalar1", &[0]),   // 2
            ("pop", &[]),             // 4
            ("foreach_start4", &[0]), // 5
            ("foreach_step4", &[0]),  // 10
            ("jumpFalse1", &[11]),    // 15 -> 26
            ("push1", &[1]),          // 17
            ("loadScalar1", &[1]),    // 19
            ("invokeStk1", &[2]),     // 21
            ("pop", &[]),             // 23
            ("jump1", &[-14]),        // 24 -> 10
            ("push1", &[2]),          // 26
            ("pop", &[]),             // 28
            ("push1", &[3]),          // 29
            ("storeScalar1", &[2]),   // 31
            ("done", &[]),            // 33
        ],
        &["1 2 3", "puts", "", "5"],
        &["tmp", "x", "y"],
        vec![AuxEntry::Foreach(vec![vec![1]])],
        "foreach {x} {1 2 3} {\n\tputs $x\n}\nset y 5\n",
    );
}

#[test]
fn test_decompile_24() {
    // Multi-list foreach is reported, never mis-rendered.
    let table = OpcodeTable::standard();
    let bc = body(
        &table,
        &[
            ("push1", &[0]),          // 0
            ("storeScalar1", &[0]),   // 2
            ("pop", &[]),             // 4
            ("push1", &[0]),          // 5
            ("storeScalar1", &[1]),   // 7
            ("pop", &[]),             // 9
            ("foreach_start4", &[0]), // 10
            ("foreach_step4", &[0]),  // 15
            ("jumpFalse1", &[11]),    // 20 -> 31
            ("push1", &[1]),          // 22
            ("loadScalar1", &[2]),    // 24
            ("invokeStk1", &[2]),     // 26
            ("pop", &[]),             // 28
            ("jump1", &[-14]),        // 29 -> 15
            ("push1", &[2]),          // 31
            ("done", &[]),            // 33
        ],
        &["1 2 3", "puts", ""],
        &["tmp1", "tmp2", "x", "y"],
        vec![AuxEntry::Foreach(vec![vec![2], vec![3]])],
    );
    assert!(matches!(decompile(&bc, &table), Err(Error::Invariant(_))));
}

// ============================================================================
// Catch
// ============================================================================

#[test]
fn test_decompile_25() {
    // catch { error x } msg
    check(
        &[
            ("beginCatch4", &[0]),   // 0
            ("push1", &[0]),         // 5
            ("push1", &[1]),         // 7
            ("invokeStk1", &[2]),    // 9
            ("push1", &[2]),         // 11
            ("jump1", &[4]),         // 13 -> 17
            ("pushResult", &[]),     // 15
            ("pushReturnCode", &[]), // 16
            ("endCatch", &[]),       // 17
            ("reverse", &[2]),       // 18
            ("storeScalar1", &[0]),  // 23
            ("pop", &[]),            // 25
            ("done", &[]),           // 26
        ],
        &["error", "x", "0"],
        &["msg"],
        vec![],
        "catch {error x} msg\n",
    );
}

// ============================================================================
// Boundaries
// ============================================================================

#[test]
fn test_decompile_26() {
    // The empty procedure decompiles to the empty string.
    check(&[], &[], &[], vec![], "");
}

#[test]
fn test_decompile_27() {
    // Unrecognised opcodes surface as residue in debug form rather
    // than crashing or guessing.
    check(&[("evalStk", &[])], &[], &[], vec![], "<0: evalStk>\n");
}

#[test]
fn test_decompile_28() {
    // A literal index past the table is a decode failure.
    let table = OpcodeTable::standard();
    let bc = body(&table, &[("push1", &[7]), ("done", &[])], &[], &[], vec![]);
    assert!(matches!(decompile(&bc, &table), Err(Error::Decode(_))));
}

// ============================================================================
// Helpers
// ============================================================================

/// Check that a program decompiles to the expected source text.
fn check(
    insts: &[(&str, &[i64])],
    literals: &[&str],
    locals: &[&str],
    auxes: Vec<AuxEntry>,
    expected: &str,
) {
    let table = OpcodeTable::standard();
    let bc: Bytecode = body(&table, insts, literals, locals, auxes);
    let out = decompile(&bc, &table).unwrap();
    assert_eq!(out, expected);
}
