use core::fmt;

/// A decoded instruction with all operands unpacked.
///
/// Pool indices are written `#n` by the `Display` impl; other numeric
/// operands print bare, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Nil,
    True,
    False,
    PushSelf,
    PushInt {
        value: i32,
    },
    PushLiteral {
        idx: u16,
    },
    PushGlobal {
        idx: u16,
    },
    PushField {
        idx: u16,
    },
    PushLocal {
        depth: u16,
        idx: u16,
    },
    StoreField {
        idx: u16,
    },
    StoreLocal {
        depth: u16,
        idx: u16,
    },
    Send {
        argc: u16,
        selector_idx: u16,
    },
    SendSuper {
        argc: u16,
        selector_idx: u16,
    },
    Block {
        idx: u16,
    },
    BlockReturn,
    Return,
    Pop,
    Dbg {
        file_idx: u16,
        line: u16,
        column: u16,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "Nil"),
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::PushSelf => write!(f, "PushSelf"),
            Self::PushInt { value } => write!(f, "PushInt {value}"),
            Self::PushLiteral { idx } => write!(f, "PushLiteral #{idx}"),
            Self::PushGlobal { idx } => write!(f, "PushGlobal #{idx}"),
            Self::PushField { idx } => write!(f, "PushField {idx}"),
            Self::PushLocal { depth, idx } => {
                write!(f, "PushLocal {depth} {idx}")
            }
            Self::StoreField { idx } => write!(f, "StoreField {idx}"),
            Self::StoreLocal { depth, idx } => {
                write!(f, "StoreLocal {depth} {idx}")
            }
            Self::Send { argc, selector_idx } => {
                write!(f, "Send {argc} #{selector_idx}")
            }
            Self::SendSuper { argc, selector_idx } => {
                write!(f, "SendSuper {argc} #{selector_idx}")
            }
            Self::Block { idx } => write!(f, "Block {idx}"),
            Self::BlockReturn => write!(f, "BlockReturn"),
            Self::Return => write!(f, "Return"),
            Self::Pop => write!(f, "Pop"),
            Self::Dbg {
                file_idx,
                line,
                column,
            } => {
                write!(f, "Dbg #{file_idx} {line}:{column}")
            }
        }
    }
}
