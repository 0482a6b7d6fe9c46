//! Two-pass assembler: the preprocessor has already resolved labels and
//! canonicalized numerals, so this pass only has to pick an instruction
//! table row per line (disambiguating the contested `load`/`store`
//! mnemonics by operand shape) and write bytes into a memory image.

use sasvm_core::instruction::{assemble_row, INSTRUCTIONS};
use sasvm_core::{Cell, Memory, OpCode};

use crate::error::Error;
use crate::preprocessor::{self, is_quoted, unquote};

fn find_row_by_code(code: OpCode) -> &'static sasvm_core::instruction::Instruction {
    INSTRUCTIONS
        .iter()
        .find(|row| row.code == code)
        .expect("every OpCode variant has a table row")
}

/// Picks the instruction table row for `mnemonic` given its already
/// preprocessed `operands` text, resolving the `load`/`store` three-way
/// and two-way operand-shape ambiguity documented in the instruction
/// table's module doc comment.
fn select_row(mnemonic: &str, operands: &str) -> Option<&'static sasvm_core::instruction::Instruction> {
    let second_operand = operands.splitn(2, ',').nth(1).unwrap_or("").trim();
    match mnemonic {
        "load" => {
            if second_operand.starts_with("r[") {
                Some(find_row_by_code(OpCode::LoadIndirect))
            } else if second_operand.starts_with('[') {
                Some(find_row_by_code(OpCode::LoadDirect))
            } else {
                Some(find_row_by_code(OpCode::LoadImmediate))
            }
        }
        "store" => {
            if second_operand.starts_with("r[") {
                Some(find_row_by_code(OpCode::StoreIndirect))
            } else {
                Some(find_row_by_code(OpCode::StoreDirect))
            }
        }
        _ => INSTRUCTIONS.iter().find(|row| row.mnemonic == mnemonic),
    }
}

/// Writes a `db` operand list into memory starting at `pointer`, returning
/// the pointer just past the last byte written. Quoted operands expand
/// character-by-character; bare operands are a single already-hex-encoded
/// byte each, never re-parsed as if they were still a raw numeric literal.
fn write_db(memory: &mut Memory, mut pointer: usize, operands: &str) -> usize {
    for token in operands.split(',') {
        let token = token.trim();
        if is_quoted(token) {
            for ch in unquote(token).chars() {
                memory.set(pointer, Cell::from_int(ch as i64));
                pointer += 1;
            }
        } else {
            let byte = u8::from_str_radix(token, 16).unwrap_or(0);
            memory.set(pointer, Cell::from(byte));
            pointer += 1;
        }
    }
    pointer
}

/// Assembles `source` into a `mem_size`-cell memory image.
pub fn assemble(source: &str, mem_size: usize) -> Result<Memory, Error> {
    let lines = preprocessor::preprocess(source)?;
    let mut memory = Memory::new(mem_size);
    let mut pointer: usize = 0;

    for (line_no, line) in lines {
        if let Some(arg) = line.strip_prefix("org ") {
            pointer = usize::from_str_radix(arg.trim(), 16).unwrap_or(pointer);
            continue;
        }
        if let Some(operands) = line.strip_prefix("db ") {
            pointer = write_db(&mut memory, pointer, operands);
            continue;
        }

        let (mnemonic, operands) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        let row = select_row(mnemonic, operands).ok_or_else(|| Error::UnknownMnemonic {
            line: line_no,
            mnemonic: mnemonic.to_string(),
        })?;

        let encoded = assemble_row(row, operands);
        let high = u8::from_str_radix(&encoded[0..2], 16).unwrap_or(0);
        let low = u8::from_str_radix(&encoded[2..4], 16).unwrap_or(0);
        memory.set(pointer, Cell::from(high));
        memory.set(pointer + 1, Cell::from(low));
        pointer += 2;
    }

    Ok(memory)
}

#[cfg(test)]
mod test {
    use super::*;

    fn memory_bytes(memory: &Memory, count: usize) -> Vec<u8> {
        memory.as_slice()[..count].iter().map(|c| c.value()).collect()
    }

    // Loops R2 up from 0x40, copying it to the teletype register each
    // pass, until it reaches R0 (0x5A), printing the alphabet.
    #[test]
    fn assembles_the_alphabet_program() {
        let source = "\
load R0, 5Ah
load R1, 1
load R2, 40h
loop:
    move RF, R2
    addi R2, R2, R1
    jmpLE R2<=R0, loop
    halt
";
        let memory = assemble(source, 256).expect("valid program");
        assert_eq!(
            memory_bytes(&memory, 14),
            vec![0x20, 0x5A, 0x21, 0x01, 0x22, 0x40, 0x40, 0x2F, 0x52, 0x21, 0xF2, 0x06, 0xC0, 0x00]
        );
    }

    // Subtracts R4 from R5 repeatedly using xor/and in place of a borrow
    // chain, looping until the running difference hits zero.
    #[test]
    fn assembles_the_subtract_by_xor_and_and_program() {
        let source = "\
load R5, 01010001b
load R4, 1
substract:
    load R6, 11111111b
    xor  R7, R5, R6
    and  R8, R7, R4
    xor  R5, R5, R4
    move R4, R8
    addi R4, R4, R4
    jmpEQ R4 = R0, end
    jmp substract
end:
    move RF, R5
    halt
";
        let memory = assemble(source, 256).expect("valid program");
        assert_eq!(
            memory_bytes(&memory, 24),
            vec![
                0x25, 0x51, 0x24, 0x01, 0x26, 0xFF, 0x97, 0x56, 0x88, 0x74, 0x95, 0x54, 0x40, 0x84, 0x54, 0x44, 0xB4,
                0x14, 0xB0, 0x04, 0x40, 0x5F, 0xC0, 0x00
            ]
        );
    }

    #[test]
    fn db_directive_mixes_string_and_numeric_operands() {
        let memory = assemble("org 10h\ndb \"hi\", 41h", 256).expect("valid program");
        assert_eq!(memory.get(0x10).value(), b'h' as u8);
        assert_eq!(memory.get(0x11).value(), b'i' as u8);
        assert_eq!(memory.get(0x12).value(), 0x41);
    }

    #[test]
    fn unknown_mnemonic_is_a_reported_error_not_a_silent_skip() {
        let err = assemble("frobnicate r1, r2", 256).unwrap_err();
        assert_eq!(
            err,
            Error::UnknownMnemonic {
                line: 1,
                mnemonic: "frobnicate".to_string()
            }
        );
    }

    #[test]
    fn org_directive_relocates_the_write_pointer() {
        let memory = assemble("org 20h\nhalt", 256).expect("valid program");
        assert_eq!(memory.get(0x20).value(), 0xC0);
        assert_eq!(memory.get(0x21).value(), 0x00);
    }
}
