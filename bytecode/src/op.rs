/// Bytecode opcodes.
///
/// Every instruction is fixed-width: one opcode byte followed by the
/// operands listed per variant, all encoded little-endian. Pool indices,
/// field indices, capture depths, and block indices are 16-bit; the only
/// 32-bit operand is the `PushInt` immediate.
///
/// The numbering is frozen — the VM decodes these byte values directly, so
/// variants must never be reordered or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    /// Push `nil`.
    Nil = 0x00,

    /// Push `true`.
    True,

    /// Push `false`.
    False,

    /// Push the receiver of the executing method.
    PushSelf,

    /// Push an immediate integer.
    /// Operands: `value:i32`
    PushInt,

    /// Push a literal from the owning class's pool.
    /// Operands: `idx:u16`
    PushLiteral,

    /// Push the value of a global, looked up by pooled name at run time.
    /// Operands: `idx:u16`
    PushGlobal,

    /// Push a field of the receiver.
    /// Operands: `idx:u16`
    PushField,

    /// Push a local or argument `depth` block frames out from the current one.
    /// Operands: `depth:u16`, `idx:u16`
    PushLocal,

    /// Pop the stack top into a field of the receiver.
    /// Operands: `idx:u16`
    StoreField,

    /// Pop the stack top into a local or argument.
    /// Operands: `depth:u16`, `idx:u16`
    StoreLocal,

    /// Send a message. The receiver sits below the arguments on the stack.
    /// Operands: `argc:u16`, `selector_idx:u16`
    Send,

    /// Send a message, starting lookup above the defining class.
    /// Operands: `argc:u16`, `selector_idx:u16`
    SendSuper,

    /// Materialize a closure over the current environment.
    /// Operands: `idx:u16` (index into the owning method's block table)
    Block,

    /// Return the stack top as the value of the current block.
    BlockReturn,

    /// Return the stack top from the home method. Non-local when the
    /// current frame is a block frame.
    Return,

    /// Discard the stack top.
    Pop,

    /// Debug marker, emitted only when debug info is requested.
    /// Operands: `file_idx:u16` (pooled file name), `line:u16`, `column:u16`
    Dbg,
}

impl Op {
    pub const COUNT: usize = Op::Dbg as usize + 1;
}

impl TryFrom<u8> for Op {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        if byte < Self::COUNT as u8 {
            // SAFETY: Op is repr(u8) with contiguous variants starting at 0.
            Ok(unsafe { core::mem::transmute::<u8, Op>(byte) })
        } else {
            Err(byte)
        }
    }
}
