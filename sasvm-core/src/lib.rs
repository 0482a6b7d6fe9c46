//! Core machine for the SASVM pedagogical virtual machine: the 8-bit
//! [`Cell`]/[`OctalFloat`] number types, fixed-size [`Memory`] and
//! [`RegisterFile`], the declarative instruction table, and the
//! [`Simulator`] fetch-decode-execute loop plus its `.prg`/`.svm` state
//! codec. The textual assembler lives in the sibling `sasvm-asm` crate,
//! which depends on the types exported here.

pub mod cell;
pub mod instruction;
pub mod memory;
pub mod octal_float;
pub mod register;
pub mod simulator;
pub mod state;

pub use cell::Cell;
pub use instruction::{decode, disassemble, disassemble_one, find_by_word, Instruction, OpCode, INSTRUCTIONS};
pub use memory::Memory;
pub use octal_float::{right_shift, OctalFloat};
pub use register::RegisterFile;
pub use simulator::{Simulator, StepResult};
pub use state::StateError;
