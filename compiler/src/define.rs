//! Pass 1: build the scope tree.
//!
//! Walks every definition in the program and declares it in the
//! [`SymbolTable`]: classes into the global scope, fields and methods
//! into their class scope, args and locals into their method or block
//! scope. Duplicate names are reported and the first declaration kept;
//! duplicate classes and methods still get scopes so the later passes
//! can walk their bodies, but their bindings are marked not kept.
//!
//! The file-level statement body is wrapped into a synthesized class
//! [`ENTRY_CLASS`] with a single method [`ENTRY_METHOD`], declared before
//! any user class so that a user class of the same name is the one
//! reported as a duplicate.

use ast::{AstArena, Body, ClassDef, ExprId, ExprKind, MethodBody, MethodDef, Name, Program, Span};
use log::debug;

use crate::Diagnostic;
use crate::symbols::{
    ClassBinding, EntryBinding, MethodBinding, ScopeId, ScopeKind, SymbolKind, SymbolTable,
};

/// Class synthesized around the file-level statement body.
pub const ENTRY_CLASS: &str = "Main";
/// Method of [`ENTRY_CLASS`] holding the file-level statements.
pub const ENTRY_METHOD: &str = "main";

pub fn define_symbols(
    arena: &AstArena,
    program: &Program,
    diagnostics: &mut Vec<Diagnostic>,
) -> SymbolTable {
    let mut definer = Definer {
        arena,
        table: SymbolTable::new(),
        diagnostics,
    };
    definer.run(program);
    definer.table
}

struct Definer<'a> {
    arena: &'a AstArena,
    table: SymbolTable,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl Definer<'_> {
    fn run(&mut self, program: &Program) {
        if let Some(main) = &program.main {
            self.define_entry(main);
        }
        for class in &program.classes {
            let binding = self.define_class(class);
            self.table.push_class_binding(binding);
        }
    }

    fn define_entry(&mut self, body: &Body) {
        let global = self.table.global();
        // Declared first, so this cannot collide.
        let _ = self.table.declare(global, ENTRY_CLASS, SymbolKind::Class, false);
        let class = self
            .table
            .add_scope(ScopeKind::Class { superclass: None }, ENTRY_CLASS, global);
        self.table.register_class_name(ENTRY_CLASS, class);

        let _ = self.table.declare(class, ENTRY_METHOD, SymbolKind::Method, false);
        let method = self
            .table
            .add_scope(ScopeKind::Method { block_count: 0 }, ENTRY_METHOD, class);
        for local in &body.locals {
            self.declare_checked(method, local, SymbolKind::Local, false);
        }
        let mut blocks = 0;
        for &stmt in &body.statements {
            self.walk_expr(stmt, method, &mut blocks);
        }
        self.table.set_block_count(method, blocks);
        self.table.set_entry(EntryBinding { class, method });
        debug!("defined entry {ENTRY_CLASS}>>{ENTRY_METHOD} ({blocks} blocks)");
    }

    fn define_class(&mut self, class: &ClassDef) -> ClassBinding {
        let global = self.table.global();
        let name = &class.name.text;
        let kept = self.declare_checked(global, &class.name, SymbolKind::Class, false);
        let superclass = class.superclass.as_ref().map(|n| n.text.clone());
        let scope = self
            .table
            .add_scope(ScopeKind::Class { superclass }, name.clone(), global);
        if kept {
            self.table.register_class_name(name, scope);
        }

        for field in &class.fields {
            self.declare_checked(scope, field, SymbolKind::Field, false);
        }
        for field in &class.class_fields {
            self.declare_checked(scope, field, SymbolKind::Field, true);
        }

        let methods = class
            .methods
            .iter()
            .map(|method| self.define_method(scope, method))
            .collect();
        debug!(
            "defined class {name} ({} fields, {} class fields)",
            self.table.field_count(scope, false),
            self.table.field_count(scope, true),
        );
        ClassBinding { scope, kept, methods }
    }

    fn define_method(&mut self, class: ScopeId, method: &MethodDef) -> MethodBinding {
        let kept = self.declare_with_span(
            class,
            &method.selector,
            SymbolKind::Method,
            method.class_side,
            method.span,
        );
        let scope = self.table.add_scope(
            ScopeKind::Method { block_count: 0 },
            method.selector.clone(),
            class,
        );
        for arg in &method.args {
            self.declare_checked(scope, arg, SymbolKind::Arg, false);
        }
        let mut blocks = 0;
        if let MethodBody::Code(body) = &method.body {
            for local in &body.locals {
                self.declare_checked(scope, local, SymbolKind::Local, false);
            }
            for &stmt in &body.statements {
                self.walk_expr(stmt, scope, &mut blocks);
            }
        }
        self.table.set_block_count(scope, blocks);
        MethodBinding { scope, kept }
    }

    fn define_block(
        &mut self,
        expr: ExprId,
        args: &[Name],
        locals: &[Name],
        body: &[ExprId],
        parent: ScopeId,
        blocks: &mut u16,
    ) {
        let index = *blocks;
        *blocks += 1;
        let name = format!("block{index}");
        // Bookkeeping entry only; takes part in no name checks.
        let _ = self.table.declare(parent, &name, SymbolKind::Block, false);
        let scope = self.table.add_scope(ScopeKind::Block { index }, name, parent);
        self.table.insert_block_scope(expr, scope);
        for arg in args {
            self.declare_checked(scope, arg, SymbolKind::Arg, false);
        }
        for local in locals {
            self.declare_checked(scope, local, SymbolKind::Local, false);
        }
        for &stmt in body {
            self.walk_expr(stmt, scope, blocks);
        }
    }

    /// Block literals anywhere below `expr` get scopes here; everything
    /// else only recurses.
    fn walk_expr(&mut self, expr: ExprId, scope: ScopeId, blocks: &mut u16) {
        let kind = &self.arena.get(expr).kind;
        match kind {
            ExprKind::Integer(_)
            | ExprKind::String(_)
            | ExprKind::Symbol(_)
            | ExprKind::Boolean(_)
            | ExprKind::Nil
            | ExprKind::SelfRef
            | ExprKind::Super
            | ExprKind::Ident(_) => {}
            ExprKind::UnaryMessage { receiver, .. } => self.walk_expr(*receiver, scope, blocks),
            ExprKind::BinaryMessage { receiver, argument, .. } => {
                self.walk_expr(*receiver, scope, blocks);
                self.walk_expr(*argument, scope, blocks);
            }
            ExprKind::KeywordMessage { receiver, pairs } => {
                self.walk_expr(*receiver, scope, blocks);
                for pair in pairs {
                    self.walk_expr(pair.argument, scope, blocks);
                }
            }
            ExprKind::Block { args, locals, body } => {
                self.define_block(expr, args, locals, body, scope, blocks);
            }
            ExprKind::Assignment { value, .. } => self.walk_expr(*value, scope, blocks),
            ExprKind::Return(value) => self.walk_expr(*value, scope, blocks),
        }
    }

    fn declare_checked(
        &mut self,
        scope: ScopeId,
        name: &Name,
        kind: SymbolKind,
        class_side: bool,
    ) -> bool {
        self.declare_with_span(scope, &name.text, kind, class_side, name.span)
    }

    fn declare_with_span(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: SymbolKind,
        class_side: bool,
        span: Span,
    ) -> bool {
        match self.table.declare(scope, name, kind, class_side) {
            Ok(_) => true,
            Err(_) => {
                let at = self.table.qualifier(scope);
                self.diagnostics
                    .push(Diagnostic::new(format!("redefinition of {name} in {at}"), span));
                false
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
