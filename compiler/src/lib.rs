//! # Compiler
//!
//! Semantic analysis and bytecode generation for the parsed source tree.
//!
//! ```text
//!            ast::Program
//!                 │
//!        1. define_symbols       scope tree, duplicate checks
//!                 │
//!        2. resolve_references   locals / fields / globals
//!                 │
//!        3. CodeGenerator        stack bytecode per method and block
//!                 │
//!          CompiledProgram
//! ```
//!
//! The passes never abort: semantic problems land in the driver's
//! diagnostics list and compilation continues, so one run reports
//! everything it can find. Only internal inconsistencies (a node missing
//! its scope or resolution annotation) panic. Syntax errors gate the
//! pipeline one step earlier: a program that failed to parse is never
//! handed to [`Compiler::compile`] at all.
//!
//! [`Compiler`] wires the passes together:
//!
//! ```
//! use ast::{AstArena, Body, ExprKind, Pos, Program, Span};
//! use compiler::Compiler;
//!
//! let mut arena = AstArena::new();
//! let answer = arena.alloc(ExprKind::Integer(42), Span::point(Pos::origin()));
//! let program = Program {
//!     classes: Vec::new(),
//!     main: Some(Body { locals: Vec::new(), statements: vec![answer] }),
//! };
//!
//! let mut compiler = Compiler::new();
//! let compiled = compiler.compile(&arena, &program);
//! assert!(compiler.diagnostics().is_empty());
//! assert_eq!(compiled.classes[0].name, "Main");
//! ```

use std::fmt;

use ast::{AstArena, Program, Span};
use log::debug;

pub mod codegen;
pub mod compiled;
pub mod define;
pub mod resolve;
pub mod symbols;

pub use codegen::CodeGenerator;
pub use compiled::{CompiledBlock, CompiledClass, CompiledProgram, StringTable};
pub use define::{ENTRY_CLASS, ENTRY_METHOD, define_symbols};
pub use resolve::{Resolution, Resolutions, resolve_references};
pub use symbols::{ScopeId, ScopeKind, SymbolId, SymbolKind, SymbolTable};

// ── Diagnostics ──────────────────────────────────────────────────────────

/// A semantic problem found during compilation.
///
/// Diagnostics accumulate across the whole unit in the order the passes
/// find them; they never abort a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self { message: message.into(), span: Some(span) }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "{}: {}", span.start, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

// ── Driver ───────────────────────────────────────────────────────────────

/// Runs the three passes over one parsed file and collects every
/// diagnostic they produce.
pub struct Compiler {
    /// Emit a source marker before each explicit return.
    pub gen_dbg: bool,
    /// File name stamped into the markers.
    pub file_name: String,
    diagnostics: Vec<Diagnostic>,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            gen_dbg: false,
            file_name: String::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Compiler with source markers switched on for `file_name`.
    pub fn with_debug_info(file_name: impl Into<String>) -> Self {
        Self {
            gen_dbg: true,
            file_name: file_name.into(),
            diagnostics: Vec::new(),
        }
    }

    pub fn compile(&mut self, arena: &AstArena, program: &Program) -> CompiledProgram {
        debug!(
            "compiling {} classes{}",
            program.classes.len(),
            if program.main.is_some() { " and an entry body" } else { "" },
        );
        let table = define_symbols(arena, program, &mut self.diagnostics);
        let resolutions = resolve_references(arena, program, &table, &mut self.diagnostics);
        let generator = CodeGenerator::new(arena, &table, &resolutions, self.gen_dbg, &self.file_name);
        generator.generate(program)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
