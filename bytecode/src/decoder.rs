use crate::instruction::Instruction;
use crate::op::Op;

/// Decodes a bytecode byte slice into [`Instruction`]s.
///
/// The decoder expects well-formed bytecode as produced by [`Code`]. All
/// reads are bounds-checked: a truncated stream simply ends the iteration,
/// and an unknown opcode byte panics in debug builds via `debug_assert!`
/// and ends the iteration in release builds.
///
/// [`Code`]: crate::Code
pub struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current byte offset in the stream.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Whether the decoder has reached the end of the bytecode.
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Decode the next instruction, or `None` at end-of-stream.
    pub fn decode_next(&mut self) -> Option<Instruction> {
        let byte = self.read_u8()?;
        let op = Op::try_from(byte);
        debug_assert!(op.is_ok(), "invalid opcode: 0x{byte:02x}");

        Some(match op.ok()? {
            Op::Nil => Instruction::Nil,
            Op::True => Instruction::True,
            Op::False => Instruction::False,
            Op::PushSelf => Instruction::PushSelf,

            Op::PushInt => Instruction::PushInt {
                value: self.read_i32()?,
            },

            Op::PushLiteral => Instruction::PushLiteral {
                idx: self.read_u16()?,
            },
            Op::PushGlobal => Instruction::PushGlobal {
                idx: self.read_u16()?,
            },
            Op::PushField => Instruction::PushField {
                idx: self.read_u16()?,
            },

            Op::PushLocal => {
                let depth = self.read_u16()?;
                let idx = self.read_u16()?;
                Instruction::PushLocal { depth, idx }
            }

            Op::StoreField => Instruction::StoreField {
                idx: self.read_u16()?,
            },

            Op::StoreLocal => {
                let depth = self.read_u16()?;
                let idx = self.read_u16()?;
                Instruction::StoreLocal { depth, idx }
            }

            Op::Send => {
                let argc = self.read_u16()?;
                let selector_idx = self.read_u16()?;
                Instruction::Send { argc, selector_idx }
            }

            Op::SendSuper => {
                let argc = self.read_u16()?;
                let selector_idx = self.read_u16()?;
                Instruction::SendSuper { argc, selector_idx }
            }

            Op::Block => Instruction::Block {
                idx: self.read_u16()?,
            },

            Op::BlockReturn => Instruction::BlockReturn,
            Op::Return => Instruction::Return,
            Op::Pop => Instruction::Pop,

            Op::Dbg => {
                let file_idx = self.read_u16()?;
                let line = self.read_u16()?;
                let column = self.read_u16()?;
                Instruction::Dbg {
                    file_idx,
                    line,
                    column,
                }
            }
        })
    }

    fn read_u8(&mut self) -> Option<u8> {
        let v = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(v)
    }

    fn read_u16(&mut self) -> Option<u16> {
        let bytes = self.bytes.get(self.pos..self.pos + 2)?;
        self.pos += 2;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_i32(&mut self) -> Option<i32> {
        let bytes = self.bytes.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        Some(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Instruction;

    fn next(&mut self) -> Option<Instruction> {
        self.decode_next()
    }
}
