/// Syntax tree for a parsed program.
///
/// Expression nodes live in an [`AstArena`] and refer to each other through
/// copyable [`ExprId`] handles; the structure above expressions (classes,
/// methods, bodies) is plain owned data holding ids into the arena. Handles
/// double as node identity for the compiler's side tables, so the same
/// arena must be handed to every pass that walks the tree.
///
/// # Precedence encoding
///
/// Message sends come pre-shaped by the parser, one variant per tier:
/// - [`ExprKind::UnaryMessage`]   — highest precedence
/// - [`ExprKind::BinaryMessage`]  — medium precedence
/// - [`ExprKind::KeywordMessage`] — lowest precedence
use crate::span::Span;

/// A declared or assigned name, with the span of its occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub text: String,
    pub span: Span,
}

impl Name {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }
}

/// One `keyword: argument` segment of a keyword message.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordPair {
    /// Keyword part including its trailing colon, e.g. `"x:"`.
    pub keyword: String,
    pub argument: ExprId,
}

/// The different forms an expression can take.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal. The parser rejects anything outside `i32`.
    Integer(i32),
    /// String literal, quotes stripped.
    String(String),
    /// Symbol literal, leading `#` stripped.
    Symbol(String),
    /// `true` or `false`.
    Boolean(bool),
    /// `nil`.
    Nil,
    /// `self`.
    SelfRef,
    /// `super`. Only ever appears in receiver position.
    Super,
    /// A variable or global reference.
    Ident(String),

    /// A unary message send: `receiver selector`.
    UnaryMessage { receiver: ExprId, selector: String },

    /// A binary message send: `receiver op argument`.
    BinaryMessage {
        receiver: ExprId,
        operator: String,
        argument: ExprId,
    },

    /// A keyword message send: `receiver key1: arg1 key2: arg2 ...`.
    KeywordMessage {
        receiver: ExprId,
        pairs: Vec<KeywordPair>,
    },

    /// A block literal: `[:a :b | |tmp| body]`.
    Block {
        args: Vec<Name>,
        locals: Vec<Name>,
        body: Vec<ExprId>,
    },

    /// `target := value`. Targets are plain identifiers by grammar.
    Assignment { target: Name, value: ExprId },

    /// `^expression`.
    Return(ExprId),
}

/// An expression node: its shape plus where it appeared.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub span: Span,
}

impl ExprNode {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Handle to an expression node in an [`AstArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

/// Flat storage for expression nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AstArena {
    nodes: Vec<ExprNode>,
}

impl AstArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a node and hand back its id.
    pub fn alloc(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(ExprNode::new(kind, span));
        id
    }

    /// Look a node up by id.
    ///
    /// # Panics
    ///
    /// Panics when the id came from a different arena and is out of range.
    pub fn get(&self, id: ExprId) -> &ExprNode {
        &self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A sequence of statements with the locals declared at its head.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    pub locals: Vec<Name>,
    pub statements: Vec<ExprId>,
}

/// What sits between a method's selector pattern and its closing bracket.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodBody {
    /// `<primitive: Name>` — the body is supplied natively; no statements.
    Primitive(String),
    /// An ordinary statement body.
    Code(Body),
}

/// A method definition.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    /// Full selector: `size`, `+`, or concatenated keywords like `x:y:`.
    pub selector: String,
    /// `true` for class-side methods (`class` prefix in source).
    pub class_side: bool,
    pub args: Vec<Name>,
    pub body: MethodBody,
    pub span: Span,
}

/// A class definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: Name,
    pub superclass: Option<Name>,
    /// Instance fields, in declaration order.
    pub fields: Vec<Name>,
    /// Class-side fields, in declaration order.
    pub class_fields: Vec<Name>,
    pub methods: Vec<MethodDef>,
    pub span: Span,
}

/// A whole parsed compilation unit.
///
/// `main` holds the top-level statements of the file, when there are any;
/// the compiler wraps them in a synthetic entry class. The parser reports
/// syntax errors itself and hands over no tree for broken input, so a
/// `Program` is always syntactically complete — there are no error nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub classes: Vec<ClassDef>,
    pub main: Option<Body>,
}
