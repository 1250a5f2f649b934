//! # Bytecode
//!
//! Wire format for compiled methods and blocks.
//!
//! Instructions are fixed-width: one opcode byte plus the operands listed
//! on each [`Op`] variant, all little-endian. [`Code`] builds and holds a
//! byte sequence (it is also the unit of concatenation during code
//! generation), [`Decoder`] iterates the instructions back out, and
//! [`Instruction`] is the decoded form used by tests, logging, and the VM.
//!
//! The opcode numbering and operand layout are a shared contract with the
//! VM and must stay bit-for-bit stable; `Code::emit` and `Decoder` are
//! exact inverses of each other.

mod code;
mod decoder;
mod instruction;
mod op;

pub use code::Code;
pub use decoder::Decoder;
pub use instruction::Instruction;
pub use op::Op;
