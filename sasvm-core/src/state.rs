//! The `.prg` (memory-only) and `.svm` (full-state) binary formats, read
//! and written with `byteorder`: plain functions over `Read`/`Write`, and
//! `read_bytes_file`/`write_bytes_file` helpers over `BufReader`/
//! `BufWriter`.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::cell::Cell;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StateError {
    /// The payload was shorter than the format requires.
    TruncatedPayload { expected: usize, found: usize },
    Io(String),
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StateError::TruncatedPayload { expected, found } => {
                write!(f, "truncated state payload: expected at least {} bytes, found {}", expected, found)
            }
            StateError::Io(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for StateError {}

impl From<io::Error> for StateError {
    fn from(err: io::Error) -> StateError {
        StateError::Io(err.to_string())
    }
}

/// Decodes a `.prg` payload: one value byte followed by three zero padding
/// bytes per cell. Tolerant of a short payload, taking every complete
/// 4-byte group it finds; the caller pads the result out to `mem_size` via
/// [`crate::memory::Memory::load`].
pub fn decode_prg(bytes: &[u8]) -> Vec<Cell> {
    let mut cursor = Cursor::new(bytes);
    let mut cells = Vec::with_capacity(bytes.len() / 4);
    while let Ok(value) = cursor.read_u8() {
        cells.push(Cell::from(value));
        let mut padding = [0u8; 3];
        if cursor.read_exact(&mut padding).is_err() {
            break;
        }
    }
    cells
}

/// Encodes `cells` as a `.prg` payload: `(value, 0, 0, 0)` per cell.
pub fn encode_prg(cells: &[Cell]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(cells.len() * 4);
    for cell in cells {
        buffer.write_u8(cell.value()).expect("write to Vec never fails");
        buffer.write_all(&[0, 0, 0]).expect("write to Vec never fails");
    }
    buffer
}

/// Decoded `.svm` contents: memory, registers, and the two special
/// registers, before any of them are installed on a [`crate::simulator::Simulator`].
pub struct SvmState {
    pub memory: Vec<Cell>,
    pub registers: Vec<Cell>,
    pub pc: u8,
    pub ir_high: u8,
    pub ir_low: u8,
}

/// Decodes a `.svm` payload: `mem_size` memory bytes, `reg_count` register
/// bytes, one PC byte, two IR bytes. Unlike `.prg` this format has no
/// internal redundancy to resync on, so a short payload is an error.
pub fn decode_svm(bytes: &[u8], mem_size: usize, reg_count: usize) -> Result<SvmState, StateError> {
    let expected = mem_size + reg_count + 1 + 2;
    if bytes.len() < expected {
        return Err(StateError::TruncatedPayload {
            expected,
            found: bytes.len(),
        });
    }

    let mut cursor = Cursor::new(bytes);
    let mut memory = vec![0u8; mem_size];
    cursor.read_exact(&mut memory)?;
    let mut registers = vec![0u8; reg_count];
    cursor.read_exact(&mut registers)?;
    let pc = cursor.read_u8()?;
    let ir_high = cursor.read_u8()?;
    let ir_low = cursor.read_u8()?;

    Ok(SvmState {
        memory: memory.into_iter().map(Cell::from).collect(),
        registers: registers.into_iter().map(Cell::from).collect(),
        pc,
        ir_high,
        ir_low,
    })
}

/// Encodes a `.svm` payload from the raw bytes of each section, in the
/// order memory, registers, PC, IR-high, IR-low.
pub fn encode_svm(memory: &[Cell], registers: &[Cell], pc: u8, ir_high: u8, ir_low: u8) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(memory.len() + registers.len() + 3);
    for cell in memory {
        buffer.write_u8(cell.value()).expect("write to Vec never fails");
    }
    for cell in registers {
        buffer.write_u8(cell.value()).expect("write to Vec never fails");
    }
    buffer.write_u8(pc).expect("write to Vec never fails");
    buffer.write_u8(ir_high).expect("write to Vec never fails");
    buffer.write_u8(ir_low).expect("write to Vec never fails");
    buffer
}

pub fn read_bytes_file<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

pub fn write_bytes_file<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(bytes)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prg_round_trips_through_encode_decode() {
        let cells: Vec<Cell> = (0u8..=255).map(Cell::from).collect();
        let encoded = encode_prg(&cells);
        assert_eq!(encoded.len(), cells.len() * 4);
        let decoded = decode_prg(&encoded);
        assert_eq!(decoded, cells);
    }

    #[test]
    fn prg_decode_tolerates_a_short_trailing_group() {
        let mut encoded = encode_prg(&[Cell::from_int(5), Cell::from_int(9)]);
        encoded.truncate(encoded.len() - 2);
        let decoded = decode_prg(&encoded);
        assert_eq!(decoded, vec![Cell::from_int(5)]);
    }

    #[test]
    fn svm_round_trips_through_encode_decode() {
        let memory: Vec<Cell> = (0u8..16).map(Cell::from).collect();
        let registers: Vec<Cell> = (0u8..4).map(Cell::from).collect();
        let encoded = encode_svm(&memory, &registers, 7, 0x12, 0x34);
        let decoded = decode_svm(&encoded, 16, 4).expect("complete payload");
        assert_eq!(decoded.memory, memory);
        assert_eq!(decoded.registers, registers);
        assert_eq!(decoded.pc, 7);
        assert_eq!(decoded.ir_high, 0x12);
        assert_eq!(decoded.ir_low, 0x34);
    }

    #[test]
    fn svm_decode_rejects_truncated_payloads() {
        let bytes = vec![0u8; 10];
        let err = decode_svm(&bytes, 16, 4).unwrap_err();
        assert_eq!(
            err,
            StateError::TruncatedPayload {
                expected: 16 + 4 + 1 + 2,
                found: 10
            }
        );
    }
}
