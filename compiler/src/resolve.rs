//! Pass 2: resolve identifier references.
//!
//! Every identifier use and every assignment target is classified as a
//! local variable, a field, or a global, and the result is recorded per
//! expression id for the code generator. Nothing here mutates the
//! symbol table.
//!
//! Lookup order: lexical scopes from the use site outwards (each block
//! boundary crossed raises the capture depth by one; the walk stops at
//! the method), then fields of the surrounding class, nearest superclass
//! first, on the method's side. A name with no match is a global; that
//! is not an error, since classes like `Object` may well live in the VM
//! rather than in this file. Assigning to a global is an error.

use std::collections::HashMap;

use ast::{AstArena, ExprId, ExprKind, MethodBody, Program};
use log::debug;

use crate::Diagnostic;
use crate::symbols::{ScopeId, ScopeKind, SymbolId, SymbolTable};

/// Where an identifier points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// An arg or local declared `depth` block boundaries above the use
    /// site; `index` is its frame slot.
    Local { symbol: SymbolId, depth: u16, index: u16 },
    /// A field of the surrounding class or one of its superclasses;
    /// `index` is the absolute slot including inherited fields.
    Field { symbol: SymbolId, index: u16 },
    /// No declaration in sight; looked up by name at run time.
    Global,
}

/// Resolution results keyed by expression id. Identifier nodes carry
/// their own resolution; an assignment node carries its target's.
#[derive(Debug, Clone, Default)]
pub struct Resolutions {
    map: HashMap<ExprId, Resolution>,
}

impl Resolutions {
    pub fn get(&self, expr: ExprId) -> Option<Resolution> {
        self.map.get(&expr).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn insert(&mut self, expr: ExprId, resolution: Resolution) {
        self.map.insert(expr, resolution);
    }
}

pub fn resolve_references(
    arena: &AstArena,
    program: &Program,
    table: &SymbolTable,
    diagnostics: &mut Vec<Diagnostic>,
) -> Resolutions {
    let mut resolver = Resolver {
        arena,
        table,
        diagnostics,
        resolutions: Resolutions::default(),
    };
    resolver.run(program);
    debug!("resolved {} references", resolver.resolutions.len());
    resolver.resolutions
}

struct Resolver<'a> {
    arena: &'a AstArena,
    table: &'a SymbolTable,
    diagnostics: &'a mut Vec<Diagnostic>,
    resolutions: Resolutions,
}

impl Resolver<'_> {
    fn run(&mut self, program: &Program) {
        self.check_superclass_chains(program);
        if let Some(main) = &program.main {
            let entry = self.table.entry().expect("entry scopes missing");
            for &stmt in &main.statements {
                self.resolve_expr(stmt, entry.method, entry.class, false);
            }
        }
        for (i, class) in program.classes.iter().enumerate() {
            let binding = self.table.class_binding(i);
            for (m, method) in class.methods.iter().enumerate() {
                if let MethodBody::Code(body) = &method.body {
                    let scope = binding.methods[m].scope;
                    for &stmt in &body.statements {
                        self.resolve_expr(stmt, scope, binding.scope, method.class_side);
                    }
                }
            }
        }
    }

    /// A cycle of superclasses can only happen between classes of this
    /// file, so it is always reported. A superclass that is simply not
    /// defined here is left alone. The diagnostic spans the whole
    /// inheritance clause, class name through superclass name.
    fn check_superclass_chains(&mut self, program: &Program) {
        for (i, class) in program.classes.iter().enumerate() {
            let scope = self.table.class_binding(i).scope;
            let (_, cyclic) = self.table.superclass_chain(scope);
            if cyclic {
                let at = class
                    .superclass
                    .as_ref()
                    .map_or(class.name.span, |sup| class.name.span.merge(sup.span));
                self.diagnostics.push(Diagnostic::new(
                    format!("circular superclass chain involving {}", class.name.text),
                    at,
                ));
            }
        }
    }

    fn resolve_expr(&mut self, expr: ExprId, scope: ScopeId, class: ScopeId, class_side: bool) {
        let kind = &self.arena.get(expr).kind;
        match kind {
            ExprKind::Integer(_)
            | ExprKind::String(_)
            | ExprKind::Symbol(_)
            | ExprKind::Boolean(_)
            | ExprKind::Nil
            | ExprKind::SelfRef
            | ExprKind::Super => {}
            ExprKind::Ident(name) => {
                let resolution = self.resolve_name(name, scope, class, class_side);
                self.resolutions.insert(expr, resolution);
            }
            ExprKind::UnaryMessage { receiver, .. } => {
                self.resolve_expr(*receiver, scope, class, class_side);
            }
            ExprKind::BinaryMessage { receiver, argument, .. } => {
                self.resolve_expr(*receiver, scope, class, class_side);
                self.resolve_expr(*argument, scope, class, class_side);
            }
            ExprKind::KeywordMessage { receiver, pairs } => {
                self.resolve_expr(*receiver, scope, class, class_side);
                for pair in pairs {
                    self.resolve_expr(pair.argument, scope, class, class_side);
                }
            }
            ExprKind::Block { body, .. } => {
                let block_scope = self.table.block_scope(expr).expect("block scope missing");
                for &stmt in body {
                    self.resolve_expr(stmt, block_scope, class, class_side);
                }
            }
            ExprKind::Assignment { target, value } => {
                self.resolve_expr(*value, scope, class, class_side);
                let resolution = self.resolve_name(&target.text, scope, class, class_side);
                if matches!(resolution, Resolution::Global) {
                    self.diagnostics.push(Diagnostic::new(
                        format!("cannot assign to undeclared variable '{}'", target.text),
                        target.span,
                    ));
                }
                self.resolutions.insert(expr, resolution);
            }
            ExprKind::Return(value) => self.resolve_expr(*value, scope, class, class_side),
        }
    }

    fn resolve_name(&self, name: &str, scope: ScopeId, class: ScopeId, class_side: bool) -> Resolution {
        let mut depth = 0;
        let mut cursor = scope;
        loop {
            if let Some(symbol) = self.table.find_variable(cursor, name) {
                return Resolution::Local {
                    symbol,
                    depth,
                    index: self.table.symbol(symbol).index,
                };
            }
            match self.table.scope(cursor).kind {
                ScopeKind::Block { .. } => {
                    depth += 1;
                    cursor = self.table.scope(cursor).parent.expect("block scope without parent");
                }
                _ => break,
            }
        }

        let (chain, _) = self.table.superclass_chain(class);
        for holder in std::iter::once(class).chain(chain) {
            if let Some(symbol) = self.table.find_field(holder, name, class_side) {
                let index = self.table.inherited_field_offset(holder, class_side)
                    + self.table.symbol(symbol).index;
                return Resolution::Field { symbol, index };
            }
        }
        Resolution::Global
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
