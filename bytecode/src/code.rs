use crate::instruction::Instruction;
use crate::op::Op;

/// An append-only bytecode sequence.
///
/// `Code` is both the builder and the value: the code generator keeps one
/// per unit being compiled, emitting through the per-instruction methods,
/// and joins finished pieces with [`append`](Code::append). Concatenation
/// is plain byte concatenation, so it is associative and order-preserving,
/// and `Code::new()` is its identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Code {
    buf: Vec<u8>,
}

impl Code {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Join `other` onto the end of this sequence.
    pub fn append(&mut self, other: Code) {
        self.buf.extend_from_slice(&other.buf);
    }

    // ── emit helpers ───────────────────────────────────────────────

    fn emit_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn emit_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn emit_op(&mut self, op: Op) {
        self.buf.push(op as u8);
    }

    /// `Nil` — push `nil`.
    pub fn push_nil(&mut self) {
        self.emit_op(Op::Nil);
    }

    /// `True` — push `true`.
    pub fn push_true(&mut self) {
        self.emit_op(Op::True);
    }

    /// `False` — push `false`.
    pub fn push_false(&mut self) {
        self.emit_op(Op::False);
    }

    /// `PushSelf` — push the receiver.
    pub fn push_self(&mut self) {
        self.emit_op(Op::PushSelf);
    }

    /// `PushInt <value:i32>` — push an immediate integer.
    pub fn push_int(&mut self, value: i32) {
        self.emit_op(Op::PushInt);
        self.emit_i32(value);
    }

    /// `PushLiteral <idx:u16>` — push a pooled literal.
    pub fn push_literal(&mut self, idx: u16) {
        self.emit_op(Op::PushLiteral);
        self.emit_u16(idx);
    }

    /// `PushGlobal <idx:u16>` — push the value of a pooled global name.
    pub fn push_global(&mut self, idx: u16) {
        self.emit_op(Op::PushGlobal);
        self.emit_u16(idx);
    }

    /// `PushField <idx:u16>` — push a receiver field.
    pub fn push_field(&mut self, idx: u16) {
        self.emit_op(Op::PushField);
        self.emit_u16(idx);
    }

    /// `PushLocal <depth:u16> <idx:u16>` — push a local or argument from
    /// `depth` block frames out.
    pub fn push_local(&mut self, depth: u16, idx: u16) {
        self.emit_op(Op::PushLocal);
        self.emit_u16(depth);
        self.emit_u16(idx);
    }

    /// `StoreField <idx:u16>` — pop into a receiver field.
    pub fn store_field(&mut self, idx: u16) {
        self.emit_op(Op::StoreField);
        self.emit_u16(idx);
    }

    /// `StoreLocal <depth:u16> <idx:u16>` — pop into a local or argument.
    pub fn store_local(&mut self, depth: u16, idx: u16) {
        self.emit_op(Op::StoreLocal);
        self.emit_u16(depth);
        self.emit_u16(idx);
    }

    /// `Send <argc:u16> <selector_idx:u16>` — dynamic message send.
    pub fn send(&mut self, argc: u16, selector_idx: u16) {
        self.emit_op(Op::Send);
        self.emit_u16(argc);
        self.emit_u16(selector_idx);
    }

    /// `SendSuper <argc:u16> <selector_idx:u16>` — send starting lookup
    /// above the defining class.
    pub fn send_super(&mut self, argc: u16, selector_idx: u16) {
        self.emit_op(Op::SendSuper);
        self.emit_u16(argc);
        self.emit_u16(selector_idx);
    }

    /// `Block <idx:u16>` — materialize the closure with the given index in
    /// the owning method's block table.
    pub fn push_block(&mut self, idx: u16) {
        self.emit_op(Op::Block);
        self.emit_u16(idx);
    }

    /// `BlockReturn` — return the stack top as the block's value.
    pub fn block_return(&mut self) {
        self.emit_op(Op::BlockReturn);
    }

    /// `Return` — return the stack top from the home method.
    pub fn return_(&mut self) {
        self.emit_op(Op::Return);
    }

    /// `Pop` — discard the stack top.
    pub fn pop(&mut self) {
        self.emit_op(Op::Pop);
    }

    /// `Dbg <file_idx:u16> <line:u16> <column:u16>` — debug marker.
    pub fn dbg(&mut self, file_idx: u16, line: u16, column: u16) {
        self.emit_op(Op::Dbg);
        self.emit_u16(file_idx);
        self.emit_u16(line);
        self.emit_u16(column);
    }

    /// Re-emit a decoded instruction. Encoding then decoding any sequence
    /// built through the typed methods reproduces it exactly, and so does
    /// the reverse.
    pub fn emit(&mut self, instruction: &Instruction) {
        match *instruction {
            Instruction::Nil => self.push_nil(),
            Instruction::True => self.push_true(),
            Instruction::False => self.push_false(),
            Instruction::PushSelf => self.push_self(),
            Instruction::PushInt { value } => self.push_int(value),
            Instruction::PushLiteral { idx } => self.push_literal(idx),
            Instruction::PushGlobal { idx } => self.push_global(idx),
            Instruction::PushField { idx } => self.push_field(idx),
            Instruction::PushLocal { depth, idx } => {
                self.push_local(depth, idx)
            }
            Instruction::StoreField { idx } => self.store_field(idx),
            Instruction::StoreLocal { depth, idx } => {
                self.store_local(depth, idx)
            }
            Instruction::Send { argc, selector_idx } => {
                self.send(argc, selector_idx)
            }
            Instruction::SendSuper { argc, selector_idx } => {
                self.send_super(argc, selector_idx)
            }
            Instruction::Block { idx } => self.push_block(idx),
            Instruction::BlockReturn => self.block_return(),
            Instruction::Return => self.return_(),
            Instruction::Pop => self.pop(),
            Instruction::Dbg {
                file_idx,
                line,
                column,
            } => self.dbg(file_idx, line, column),
        }
    }
}
