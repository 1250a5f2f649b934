//! # Ast
//!
//! The tree contract between the external parser and the compiler.
//!
//! ## Architecture
//!
//! ```text
//!  source text
//!      │
//!      ▼
//!  ┌────────┐   AstArena + Program    ┌──────────┐   CompiledProgram
//!  │ parser │ ──────────────────────▶ │ compiler │ ──────────────────▶ VM
//!  └────────┘    (this crate)         └──────────┘
//! ```
//!
//! The parser owns syntax recovery: it reports its own errors and produces
//! a [`Program`] only for input that parsed completely, so every tree seen
//! downstream is structurally sound. Expression nodes are arena-allocated
//! and addressed by [`ExprId`]; the compiler keys its per-node side tables
//! (scope and symbol back-references) on those ids, which is why the arena
//! travels together with the program through every pass.
//!
//! ```rust
//! use ast::{AstArena, Body, ExprKind, Pos, Program, Span};
//!
//! let mut arena = AstArena::new();
//! let answer = arena.alloc(ExprKind::Integer(42), Span::point(Pos::origin()));
//! let program = Program {
//!     classes: vec![],
//!     main: Some(Body { locals: vec![], statements: vec![answer] }),
//! };
//! assert_eq!(program.main.unwrap().statements.len(), 1);
//! ```

pub mod span;
pub mod tree;

pub use span::{Pos, Span};
pub use tree::{
    AstArena, Body, ClassDef, ExprId, ExprKind, ExprNode, KeywordPair,
    MethodBody, MethodDef, Name, Program,
};
