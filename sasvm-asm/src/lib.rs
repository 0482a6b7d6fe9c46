//! Textual assembler for the `sasvm-core` virtual machine: the
//! regex-backed preprocessor (comment/whitespace stripping, label
//! resolution, numeral normalization) and the two-pass assembler that
//! turns the result into a `sasvm_core::Memory` image.

mod assembler;
mod error;
mod preprocessor;

pub use assembler::assemble;
pub use error::Error;
