use tcldec::{AuxEntry, Bytecode, OpcodeTable, OperandKind};

/// Assemble a sequence of (mnemonic, operands) pairs into a byte
/// string using the given table.  Operand values are raw: literal or
/// table indices where the kind demands an index, signed offsets for
/// jumps.
#[allow(dead_code)]
pub fn asm(table: &OpcodeTable, insts: &[(&str, &[i64])]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for (name, ops) in insts {
        let opcode = table.opcode_of(name).unwrap();
        let info = table.get(opcode).unwrap();
        assert_eq!(info.operands.len(), ops.len(), "arity of {}", name);
        bytes.push(opcode);
        for (kind, v) in info.operands.iter().zip(ops.iter()) {
            match kind {
                OperandKind::Int1 => bytes.push((*v as i8) as u8),
                OperandKind::Uint1 | OperandKind::Lvt1 => bytes.push(*v as u8),
                OperandKind::Int4 | OperandKind::Idx4 => {
                    bytes.extend((*v as i32).to_be_bytes());
                }
                OperandKind::Uint4 | OperandKind::Lvt4 | OperandKind::Aux4 => {
                    bytes.extend((*v as u32).to_be_bytes());
                }
                OperandKind::None => panic!("unencodable operand in {}", name),
            }
        }
    }
    bytes
}

/// Build a complete procedure body from mnemonics and side tables.
#[allow(dead_code)]
pub fn body(
    table: &OpcodeTable,
    insts: &[(&str, &[i64])],
    literals: &[&str],
    locals: &[&str],
    auxes: Vec<AuxEntry>,
) -> Bytecode {
    Bytecode::new(
        asm(table, insts),
        literals.iter().map(|s| s.to_string()).collect(),
        locals.iter().map(|s| s.to_string()).collect(),
        auxes,
    )
}
