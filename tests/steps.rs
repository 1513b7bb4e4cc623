use tcldec::{decompile_steps, AuxEntry, OpcodeTable};

mod util;
use util::body;

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_steps_01() {
    // One snapshot per driver stage which moved something: the
    // initial partition, then one per single-step reduction.
    let (steps, changes) = steps(
        &[("push1", &[0]), ("storeScalar1", &[0]), ("done", &[])],
        &["1"],
        &["a"],
        vec![],
    );
    assert_eq!(steps.len(), 4);
    // Initially everything is raw.
    assert_eq!(
        steps[0][0],
        vec!["<0: push1 0>", "<2: storeScalar1 %a>", "<4: done>"]
    );
    // The push reduces first.
    assert_eq!(steps[1][0], vec!["1", "<2: storeScalar1 %a>", "<4: done>"]);
    // The fixpoint is a single statement.
    assert_eq!(steps[3][0], vec!["set a 1"]);
    // Each rewrite ties back to the snapshot which produced it.
    assert_eq!(changes.len(), 3);
    assert_eq!(changes[0].from.step, 0);
    assert_eq!(changes[0].from.block, 0);
    assert_eq!(changes[0].from.range, (0, 1));
    assert_eq!(changes[0].to.step, 1);
    assert_eq!(changes[0].to.range, (0, 1));
    // The assignment consumed two elements.
    assert_eq!(changes[1].from.range, (0, 2));
    assert_eq!(changes[1].to.range, (0, 1));
}

#[test]
fn test_steps_02() {
    // The pre-reduction pass which deletes the pushes paired with
    // `variable` shows up as its own snapshot.
    let (steps, changes) = steps(
        &[
            ("push1", &[0]),
            ("variable", &[0]),
            ("push1", &[1]),
            ("done", &[]),
        ],
        &["ns::v", ""],
        &["v"],
        vec![],
    );
    assert_eq!(
        steps[0][0],
        vec![
            "<0: push1 0>",
            "<2: variable %v>",
            "<7: push1 1>",
            "<9: done>"
        ]
    );
    assert_eq!(
        steps[1][0],
        vec!["<0: push1 0>", "<2: variable %v>", "<9: done>"]
    );
    assert_eq!(changes[0].from.step, 0);
    assert_eq!(changes[0].from.range, (2, 3));
    assert_eq!(changes[0].to.step, 1);
    assert_eq!(changes[0].to.range, (2, 2));
    // The fixpoint is the declaration alone.
    assert_eq!(steps[steps.len() - 1][0], vec!["variable ns::v"]);
}

#[test]
fn test_steps_03() {
    // Reduction is monotone: the number of raw instructions never
    // grows, and the fixpoint has none.
    let (steps, _) = steps(
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
    );
    let counts: Vec<usize> = steps.iter().map(raw_count).collect();
    for pair in counts.windows(2) {
        assert!(pair[1] <= pair[0], "raw count grew: {:?}", counts);
    }
    assert_eq!(*counts.last().unwrap(), 0);
}

#[test]
fn test_steps_04() {
    // Snapshots are deterministic.
    let program: &[(&str, &[i64])] = &[
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
    ];
    let lits = &["1 2 3", "puts", ""];
    let locals = &["tmp", "x"];
    let (s1, c1) = steps(program, lits, locals, vec![AuxEntry::Foreach(vec![vec![1]])]);
    let (s2, c2) = steps(program, lits, locals, vec![AuxEntry::Foreach(vec![vec![1]])]);
    assert_eq!(s1, s2);
    assert_eq!(c1, c2);
}

#[test]
fn test_steps_05() {
    // The empty procedure still yields its (empty) initial snapshot.
    let (steps, changes) = steps(&[], &[], &[], vec![]);
    assert_eq!(steps.len(), 1);
    assert!(steps[0].is_empty());
    assert!(changes.is_empty());
}

// ============================================================================
// Helpers
// ============================================================================

fn steps(
    insts: &[(&str, &[i64])],
    literals: &[&str],
    locals: &[&str],
    auxes: Vec<AuxEntry>,
) -> (Vec<Vec<Vec<String>>>, Vec<tcldec::StepChange>) {
    let table = OpcodeTable::standard();
    let bc = body(&table, insts, literals, locals, auxes);
    decompile_steps(&bc, &table).unwrap()
}

/// Count the raw instruction tokens across one snapshot.
fn raw_count(step: &Vec<Vec<String>>) -> usize {
    step.iter()
        .flat_map(|block| block.iter())
        .filter(|line| line.starts_with('<'))
        .count()
}
