//! Pass 3: bytecode generation.
//!
//! Walks the resolved program and emits one [`CompiledBlock`] per method
//! and per block literal. Code is built into a stack of frames that
//! mirrors block nesting: entering a block literal pushes a fresh frame,
//! leaving it files the finished unit into the method's block table at
//! the index assigned by the define pass. Each class owns one literal
//! pool shared by all of its units.
//!
//! This pass assumes a consistent symbol table and resolution map; a
//! node without its annotation means an earlier pass did not run, and
//! that is a panic rather than a diagnostic.

use ast::{AstArena, Body, ClassDef, ExprId, ExprKind, MethodBody, MethodDef, Program};
use bytecode::Code;
use log::debug;

use crate::compiled::{CompiledBlock, CompiledClass, CompiledProgram, StringTable};
use crate::resolve::{Resolution, Resolutions};
use crate::symbols::{ClassBinding, EntryBinding, ScopeId, ScopeKind, SymbolTable};

pub struct CodeGenerator<'a> {
    arena: &'a AstArena,
    table: &'a SymbolTable,
    resolutions: &'a Resolutions,
    /// Emit a source marker before each explicit return.
    gen_dbg: bool,
    file_name: &'a str,
    frames: Vec<Frame>,
    /// Literal pool of the class being compiled.
    pool: StringTable,
    /// Block units of the method being compiled, filed by index.
    unit_blocks: Vec<Option<CompiledBlock>>,
    owner_class: String,
}

struct Frame {
    scope: ScopeId,
    code: Code,
}

/// What kind of unit a statement body belongs to; decides the ending.
#[derive(Clone, Copy)]
enum UnitKind {
    Entry,
    Method,
    Block,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(
        arena: &'a AstArena,
        table: &'a SymbolTable,
        resolutions: &'a Resolutions,
        gen_dbg: bool,
        file_name: &'a str,
    ) -> Self {
        Self {
            arena,
            table,
            resolutions,
            gen_dbg,
            file_name,
            frames: Vec::new(),
            pool: StringTable::new(),
            unit_blocks: Vec::new(),
            owner_class: String::new(),
        }
    }

    /// Compile every kept class. The synthesized entry class comes first
    /// when the program has file-level statements.
    pub fn generate(mut self, program: &Program) -> CompiledProgram {
        let mut classes = Vec::new();
        if let Some(main) = &program.main {
            let entry = self.table.entry().expect("entry scopes missing");
            classes.push(self.generate_entry(entry, main));
        }
        for (i, class) in program.classes.iter().enumerate() {
            let binding = self.table.class_binding(i);
            if !binding.kept {
                continue;
            }
            classes.push(self.generate_class(class, binding));
        }
        CompiledProgram { classes }
    }

    fn generate_entry(&mut self, entry: EntryBinding, main: &Body) -> CompiledClass {
        self.pool = StringTable::new();
        self.owner_class = self.table.scope(entry.class).name.clone();
        let unit = self.generate_unit(entry.method, &main.statements, UnitKind::Entry);
        debug!("compiled {}>>{} ({} bytes)", unit.owner_class, unit.name, unit.bytecode.len());
        CompiledClass {
            name: self.owner_class.clone(),
            superclass: None,
            field_count: 0,
            class_field_count: 0,
            literals: std::mem::take(&mut self.pool).into_vec(),
            methods: vec![unit],
            class_methods: Vec::new(),
        }
    }

    fn generate_class(&mut self, class: &ClassDef, binding: &ClassBinding) -> CompiledClass {
        self.pool = StringTable::new();
        self.owner_class = class.name.text.clone();
        let mut methods = Vec::new();
        let mut class_methods = Vec::new();
        for (m, method) in class.methods.iter().enumerate() {
            let method_binding = &binding.methods[m];
            if !method_binding.kept {
                continue;
            }
            let unit = self.generate_method(method, method_binding.scope);
            if method.class_side {
                class_methods.push(unit);
            } else {
                methods.push(unit);
            }
        }
        debug!(
            "compiled class {} ({} methods, {} class methods)",
            self.owner_class,
            methods.len(),
            class_methods.len(),
        );
        CompiledClass {
            name: self.owner_class.clone(),
            superclass: class.superclass.as_ref().map(|n| n.text.clone()),
            field_count: self.table.total_field_count(binding.scope, false),
            class_field_count: self.table.total_field_count(binding.scope, true),
            literals: std::mem::take(&mut self.pool).into_vec(),
            methods,
            class_methods,
        }
    }

    fn generate_method(&mut self, method: &MethodDef, scope: ScopeId) -> CompiledBlock {
        match &method.body {
            MethodBody::Primitive(routine) => {
                let (num_args, num_locals) = self.table.var_counts(scope);
                CompiledBlock {
                    owner_class: self.owner_class.clone(),
                    name: method.selector.clone(),
                    num_args,
                    num_locals,
                    block_index: None,
                    bytecode: Vec::new(),
                    primitive: Some(routine.clone()),
                    blocks: Vec::new(),
                }
            }
            MethodBody::Code(body) => {
                let unit = self.generate_unit(scope, &body.statements, UnitKind::Method);
                debug!(
                    "compiled {}>>{} ({} bytes, {} blocks)",
                    unit.owner_class,
                    unit.name,
                    unit.bytecode.len(),
                    unit.blocks.len(),
                );
                unit
            }
        }
    }

    /// One method-level unit: its frame, its statements, and the block
    /// table collecting every literal compiled inside.
    fn generate_unit(&mut self, scope: ScopeId, statements: &[ExprId], kind: UnitKind) -> CompiledBlock {
        let block_count = self.table.method_block_count(scope) as usize;
        self.unit_blocks = (0..block_count).map(|_| None).collect();
        self.push_frame(scope);
        self.compile_body(statements, kind);
        let code = self.pop_frame();
        let blocks = std::mem::take(&mut self.unit_blocks)
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.unwrap_or_else(|| panic!("block {i} was never compiled")))
            .collect();
        let (num_args, num_locals) = self.table.var_counts(scope);
        CompiledBlock {
            owner_class: self.owner_class.clone(),
            name: self.table.scope(scope).name.clone(),
            num_args,
            num_locals,
            block_index: None,
            bytecode: code.into_bytes(),
            primitive: None,
            blocks,
        }
    }

    /// Statements with one pop between them; the last value stays on the
    /// stack. Methods then answer `self` unless the last statement
    /// already returned, blocks answer their last value, and the entry
    /// leaves its last value for the VM to pick up.
    fn compile_body(&mut self, statements: &[ExprId], kind: UnitKind) {
        if statements.is_empty() {
            match kind {
                UnitKind::Entry => self.code().push_nil(),
                UnitKind::Method => {
                    self.code().push_self();
                    self.code().return_();
                }
                UnitKind::Block => {
                    self.code().push_nil();
                    self.code().block_return();
                }
            }
            return;
        }
        let last = statements.len() - 1;
        for (i, &stmt) in statements.iter().enumerate() {
            self.compile_expr(stmt);
            if i < last {
                self.code().pop();
            }
        }
        let explicit_return = matches!(self.arena.get(statements[last]).kind, ExprKind::Return(_));
        match kind {
            UnitKind::Entry => {}
            UnitKind::Method => {
                if !explicit_return {
                    self.code().push_self();
                    self.code().return_();
                }
            }
            UnitKind::Block => {
                if !explicit_return {
                    self.code().block_return();
                }
            }
        }
    }

    fn compile_expr(&mut self, expr: ExprId) {
        let node = self.arena.get(expr);
        match &node.kind {
            ExprKind::Integer(value) => self.code().push_int(*value),
            ExprKind::String(text) | ExprKind::Symbol(text) => {
                let idx = self.pool.add(text);
                self.code().push_literal(idx);
            }
            ExprKind::Boolean(true) => self.code().push_true(),
            ExprKind::Boolean(false) => self.code().push_false(),
            ExprKind::Nil => self.code().push_nil(),
            ExprKind::SelfRef => self.code().push_self(),
            ExprKind::Super => panic!("`super` outside receiver position"),
            ExprKind::Ident(name) => match self.resolution(expr) {
                Resolution::Local { depth, index, .. } => self.code().push_local(depth, index),
                Resolution::Field { index, .. } => self.code().push_field(index),
                Resolution::Global => {
                    let idx = self.pool.add(name);
                    self.code().push_global(idx);
                }
            },
            ExprKind::UnaryMessage { receiver, selector } => {
                self.compile_send(*receiver, &[], selector);
            }
            ExprKind::BinaryMessage { receiver, operator, argument } => {
                self.compile_send(*receiver, std::slice::from_ref(argument), operator);
            }
            ExprKind::KeywordMessage { receiver, pairs } => {
                let selector: String = pairs.iter().map(|p| p.keyword.as_str()).collect();
                let args: Vec<ExprId> = pairs.iter().map(|p| p.argument).collect();
                self.compile_send(*receiver, &args, &selector);
            }
            ExprKind::Block { .. } => self.compile_block(expr),
            ExprKind::Assignment { .. } => self.compile_assignment(expr),
            ExprKind::Return(value) => {
                self.compile_expr(*value);
                if self.gen_dbg {
                    let file_idx = self.pool.add(self.file_name);
                    let at = node.span.start;
                    self.code().dbg(file_idx, clamp_u16(at.line), clamp_u16(at.column));
                }
                self.code().return_();
            }
        }
    }

    /// Receiver, then arguments, then the send. A `super` receiver is
    /// pushed as `self`; the dedicated opcode tells the VM to start its
    /// lookup above the defining class.
    fn compile_send(&mut self, receiver: ExprId, args: &[ExprId], selector: &str) {
        let to_super = matches!(self.arena.get(receiver).kind, ExprKind::Super);
        if to_super {
            self.code().push_self();
        } else {
            self.compile_expr(receiver);
        }
        for &arg in args {
            self.compile_expr(arg);
        }
        let selector_idx = self.pool.add(selector);
        let argc = args.len() as u16;
        if to_super {
            self.code().send_super(argc, selector_idx);
        } else {
            self.code().send(argc, selector_idx);
        }
    }

    /// An assignment is an expression: the store pops the value, so the
    /// slot is read right back to leave the statement value in place.
    fn compile_assignment(&mut self, expr: ExprId) {
        let ExprKind::Assignment { value, .. } = &self.arena.get(expr).kind else {
            unreachable!("compile_assignment on a non-assignment");
        };
        self.compile_expr(*value);
        match self.resolution(expr) {
            Resolution::Local { depth, index, .. } => {
                self.code().store_local(depth, index);
                self.code().push_local(depth, index);
            }
            Resolution::Field { index, .. } => {
                self.code().store_field(index);
                self.code().push_field(index);
            }
            // Already reported by the resolver; the value simply stays
            // on the stack as the expression result.
            Resolution::Global => {}
        }
    }

    fn compile_block(&mut self, expr: ExprId) {
        let ExprKind::Block { body, .. } = &self.arena.get(expr).kind else {
            unreachable!("compile_block on a non-block");
        };
        let scope = self
            .table
            .block_scope(expr)
            .unwrap_or_else(|| panic!("missing scope for block expression {expr:?}"));
        let ScopeKind::Block { index } = self.table.scope(scope).kind else {
            unreachable!("block expression bound to a non-block scope");
        };
        self.code().push_block(index);

        let method_name = self.table.scope(self.frames[0].scope).name.clone();
        self.push_frame(scope);
        self.compile_body(body, UnitKind::Block);
        let code = self.pop_frame();
        let (num_args, num_locals) = self.table.var_counts(scope);
        let unit = CompiledBlock {
            owner_class: self.owner_class.clone(),
            name: format!("{method_name}-block{index}"),
            num_args,
            num_locals,
            block_index: Some(index),
            bytecode: code.into_bytes(),
            primitive: None,
            blocks: Vec::new(),
        };
        self.unit_blocks[index as usize] = Some(unit);
    }

    // ── Frame management ─────────────────────────────────────────────────

    fn push_frame(&mut self, scope: ScopeId) {
        self.frames.push(Frame { scope, code: Code::new() });
    }

    fn pop_frame(&mut self) -> Code {
        self.frames.pop().expect("no active frame").code
    }

    fn code(&mut self) -> &mut Code {
        &mut self.frames.last_mut().expect("no active frame").code
    }

    fn resolution(&self, expr: ExprId) -> Resolution {
        self.resolutions
            .get(expr)
            .unwrap_or_else(|| panic!("missing resolution for expression {expr:?}"))
    }
}

fn clamp_u16(value: usize) -> u16 {
    value.min(u16::MAX as usize) as u16
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{KeywordPair, Name, Pos, Span};
    use bytecode::{Decoder, Instruction as I};

    use crate::Compiler;
    use crate::define::define_symbols;

    fn sp() -> Span {
        Span::point(Pos::origin())
    }

    fn name(text: &str) -> Name {
        Name::new(text, sp())
    }

    fn names(texts: &[&str]) -> Vec<Name> {
        texts.iter().map(|t| name(t)).collect()
    }

    fn int(arena: &mut AstArena, value: i32) -> ExprId {
        arena.alloc(ExprKind::Integer(value), sp())
    }

    fn string(arena: &mut AstArena, text: &str) -> ExprId {
        arena.alloc(ExprKind::String(text.to_string()), sp())
    }

    fn symbol(arena: &mut AstArena, text: &str) -> ExprId {
        arena.alloc(ExprKind::Symbol(text.to_string()), sp())
    }

    fn boolean(arena: &mut AstArena, value: bool) -> ExprId {
        arena.alloc(ExprKind::Boolean(value), sp())
    }

    fn nil(arena: &mut AstArena) -> ExprId {
        arena.alloc(ExprKind::Nil, sp())
    }

    fn self_ref(arena: &mut AstArena) -> ExprId {
        arena.alloc(ExprKind::SelfRef, sp())
    }

    fn super_ref(arena: &mut AstArena) -> ExprId {
        arena.alloc(ExprKind::Super, sp())
    }

    fn ident(arena: &mut AstArena, text: &str) -> ExprId {
        arena.alloc(ExprKind::Ident(text.to_string()), sp())
    }

    fn unary(arena: &mut AstArena, receiver: ExprId, selector: &str) -> ExprId {
        arena.alloc(
            ExprKind::UnaryMessage { receiver, selector: selector.to_string() },
            sp(),
        )
    }

    fn binary(arena: &mut AstArena, receiver: ExprId, operator: &str, argument: ExprId) -> ExprId {
        arena.alloc(
            ExprKind::BinaryMessage { receiver, operator: operator.to_string(), argument },
            sp(),
        )
    }

    fn keyword(arena: &mut AstArena, receiver: ExprId, parts: &[(&str, ExprId)]) -> ExprId {
        let pairs = parts
            .iter()
            .map(|&(kw, argument)| KeywordPair { keyword: kw.to_string(), argument })
            .collect();
        arena.alloc(ExprKind::KeywordMessage { receiver, pairs }, sp())
    }

    fn block(arena: &mut AstArena, args: &[&str], locals: &[&str], body: Vec<ExprId>) -> ExprId {
        arena.alloc(
            ExprKind::Block { args: names(args), locals: names(locals), body },
            sp(),
        )
    }

    fn assign(arena: &mut AstArena, target: &str, value: ExprId) -> ExprId {
        arena.alloc(ExprKind::Assignment { target: name(target), value }, sp())
    }

    fn ret(arena: &mut AstArena, value: ExprId) -> ExprId {
        arena.alloc(ExprKind::Return(value), sp())
    }

    fn ret_at(arena: &mut AstArena, value: ExprId, line: usize, column: usize) -> ExprId {
        arena.alloc(ExprKind::Return(value), Span::point(Pos::new(0, line, column)))
    }

    fn method(selector: &str, args: &[&str], locals: &[&str], statements: Vec<ExprId>) -> MethodDef {
        MethodDef {
            selector: selector.to_string(),
            class_side: false,
            args: names(args),
            body: MethodBody::Code(Body { locals: names(locals), statements }),
            span: sp(),
        }
    }

    fn class_method(selector: &str, args: &[&str], locals: &[&str], statements: Vec<ExprId>) -> MethodDef {
        let mut def = method(selector, args, locals, statements);
        def.class_side = true;
        def
    }

    fn class(class_name: &str, superclass: Option<&str>, fields: &[&str], methods: Vec<MethodDef>) -> ClassDef {
        ClassDef {
            name: name(class_name),
            superclass: superclass.map(name),
            fields: names(fields),
            class_fields: Vec::new(),
            methods,
            span: sp(),
        }
    }

    fn main_program(locals: &[&str], statements: Vec<ExprId>) -> Program {
        Program {
            classes: Vec::new(),
            main: Some(Body { locals: names(locals), statements }),
        }
    }

    fn compile(arena: &AstArena, program: &Program) -> CompiledProgram {
        let mut compiler = Compiler::new();
        let compiled = compiler.compile(arena, program);
        assert!(compiler.diagnostics().is_empty(), "{:?}", compiler.diagnostics());
        compiled
    }

    fn compile_with_diagnostics(arena: &AstArena, program: &Program) -> (CompiledProgram, Vec<String>) {
        let mut compiler = Compiler::new();
        let compiled = compiler.compile(arena, program);
        let messages = compiler.diagnostics().iter().map(|d| d.message.clone()).collect();
        (compiled, messages)
    }

    fn decode(unit: &CompiledBlock) -> Vec<I> {
        Decoder::new(&unit.bytecode).collect()
    }

    fn method_unit<'p>(program: &'p CompiledProgram, class: &str, selector: &str) -> &'p CompiledBlock {
        program
            .class(class)
            .unwrap()
            .methods
            .iter()
            .find(|m| m.name == selector)
            .unwrap()
    }

    #[test]
    fn empty_entry_compiles_to_nil() {
        let arena = AstArena::new();
        let program = main_program(&[], Vec::new());

        let compiled = compile(&arena, &program);
        assert_eq!(compiled.classes.len(), 1);
        let main = method_unit(&compiled, "Main", "main");
        assert_eq!(decode(main), vec![I::Nil]);
        assert_eq!((main.num_args, main.num_locals), (0, 0));
        assert!(main.blocks.is_empty());
    }

    #[test]
    fn entry_statements_pop_between_not_after() {
        let mut arena = AstArena::new();
        let one = int(&mut arena, 1);
        let two = int(&mut arena, 2);
        let three = int(&mut arena, 3);
        let program = main_program(&[], vec![one, two, three]);

        let compiled = compile(&arena, &program);
        let entry_class = compiled.class("Main").unwrap();
        assert_eq!(entry_class.superclass, None);
        assert_eq!(entry_class.field_count, 0);
        assert_eq!(
            decode(&entry_class.methods[0]),
            vec![
                I::PushInt { value: 1 },
                I::Pop,
                I::PushInt { value: 2 },
                I::Pop,
                I::PushInt { value: 3 },
            ]
        );
    }

    #[test]
    fn constant_expressions_use_dedicated_ops() {
        let mut arena = AstArena::new();
        let t = boolean(&mut arena, true);
        let f = boolean(&mut arena, false);
        let n = nil(&mut arena);
        let s = self_ref(&mut arena);
        let program = main_program(&[], vec![t, f, n, s]);

        let compiled = compile(&arena, &program);
        assert_eq!(
            decode(method_unit(&compiled, "Main", "main")),
            vec![I::True, I::Pop, I::False, I::Pop, I::Nil, I::Pop, I::PushSelf]
        );
    }

    #[test]
    fn repeated_literals_reuse_pool_slots() {
        let mut arena = AstArena::new();
        let a = string(&mut arena, "hi");
        let b = symbol(&mut arena, "hi");
        let c = string(&mut arena, "hi");
        let program = main_program(&[], vec![a, b, c]);

        let compiled = compile(&arena, &program);
        let entry_class = compiled.class("Main").unwrap();
        assert_eq!(entry_class.literals, vec!["hi".to_string()]);
        assert_eq!(
            decode(&entry_class.methods[0]),
            vec![
                I::PushLiteral { idx: 0 },
                I::Pop,
                I::PushLiteral { idx: 0 },
                I::Pop,
                I::PushLiteral { idx: 0 },
            ]
        );
    }

    #[test]
    fn assignments_store_then_reread_the_slot() {
        let mut arena = AstArena::new();
        let seven = int(&mut arena, 7);
        let store = assign(&mut arena, "a", seven);
        let read = ident(&mut arena, "a");
        let program = main_program(&["a"], vec![store, read]);

        let compiled = compile(&arena, &program);
        assert_eq!(
            decode(method_unit(&compiled, "Main", "main")),
            vec![
                I::PushInt { value: 7 },
                I::StoreLocal { depth: 0, idx: 0 },
                I::PushLocal { depth: 0, idx: 0 },
                I::Pop,
                I::PushLocal { depth: 0, idx: 0 },
            ]
        );
    }

    #[test]
    fn assignment_to_a_global_keeps_only_the_value() {
        let mut arena = AstArena::new();
        let one = int(&mut arena, 1);
        let store = assign(&mut arena, "x", one);
        let two = int(&mut arena, 2);
        let program = main_program(&[], vec![store, two]);

        let (compiled, messages) = compile_with_diagnostics(&arena, &program);
        assert_eq!(messages, vec!["cannot assign to undeclared variable 'x'"]);
        assert_eq!(
            decode(method_unit(&compiled, "Main", "main")),
            vec![I::PushInt { value: 1 }, I::Pop, I::PushInt { value: 2 }]
        );
    }

    #[test]
    fn empty_methods_answer_self() {
        let arena = AstArena::new();
        let program = Program {
            classes: vec![class("Point", None, &[], vec![method("touch", &[], &[], Vec::new())])],
            main: None,
        };

        let compiled = compile(&arena, &program);
        assert_eq!(
            decode(method_unit(&compiled, "Point", "touch")),
            vec![I::PushSelf, I::Return]
        );
    }

    #[test]
    fn methods_answer_self_unless_they_return() {
        let mut arena = AstArena::new();
        let read_n = ident(&mut arena, "n");
        let one = int(&mut arena, 1);
        let sum = binary(&mut arena, read_n, "+", one);
        let bump = assign(&mut arena, "n", sum);
        let program = Program {
            classes: vec![class("Counter", None, &["n"], vec![method("bump", &[], &[], vec![bump])])],
            main: None,
        };

        let compiled = compile(&arena, &program);
        let unit = method_unit(&compiled, "Counter", "bump");
        assert_eq!(
            decode(unit),
            vec![
                I::PushField { idx: 0 },
                I::PushInt { value: 1 },
                I::Send { argc: 1, selector_idx: 0 },
                I::StoreField { idx: 0 },
                I::PushField { idx: 0 },
                I::PushSelf,
                I::Return,
            ]
        );
        assert_eq!(compiled.class("Counter").unwrap().literals, vec!["+".to_string()]);
    }

    #[test]
    fn explicit_returns_have_no_failsafe() {
        let mut arena = AstArena::new();
        let read = ident(&mut arena, "x");
        let answer = ret(&mut arena, read);
        let program = Program {
            classes: vec![class("Point", None, &["x"], vec![method("getX", &[], &[], vec![answer])])],
            main: None,
        };

        let compiled = compile(&arena, &program);
        assert_eq!(
            decode(method_unit(&compiled, "Point", "getX")),
            vec![I::PushField { idx: 0 }, I::Return]
        );
    }

    #[test]
    fn keyword_sends_concatenate_their_selector() {
        let mut arena = AstArena::new();
        let receiver = ident(&mut arena, "Point");
        let read_x = ident(&mut arena, "x");
        let other_x = ident(&mut arena, "aPoint");
        let arg_x = unary(&mut arena, other_x, "x");
        let sum_x = binary(&mut arena, read_x, "+", arg_x);
        let read_y = ident(&mut arena, "y");
        let other_y = ident(&mut arena, "aPoint");
        let arg_y = unary(&mut arena, other_y, "y");
        let sum_y = binary(&mut arena, read_y, "+", arg_y);
        let send = keyword(&mut arena, receiver, &[("x:", sum_x), ("y:", sum_y)]);
        let answer = ret(&mut arena, send);
        let program = Program {
            classes: vec![class("Point", None, &["x", "y"], vec![method("+", &["aPoint"], &[], vec![answer])])],
            main: None,
        };

        let compiled = compile(&arena, &program);
        let point = compiled.class("Point").unwrap();
        assert_eq!(point.methods[0].num_args, 1);
        assert_eq!(
            decode(&point.methods[0]),
            vec![
                I::PushGlobal { idx: 0 },
                I::PushField { idx: 0 },
                I::PushLocal { depth: 0, idx: 0 },
                I::Send { argc: 0, selector_idx: 1 },
                I::Send { argc: 1, selector_idx: 2 },
                I::PushField { idx: 1 },
                I::PushLocal { depth: 0, idx: 0 },
                I::Send { argc: 0, selector_idx: 3 },
                I::Send { argc: 1, selector_idx: 2 },
                I::Send { argc: 2, selector_idx: 4 },
                I::Return,
            ]
        );
        assert_eq!(
            point.literals,
            vec![
                "Point".to_string(),
                "x".to_string(),
                "+".to_string(),
                "y".to_string(),
                "x:y:".to_string(),
            ]
        );
    }

    #[test]
    fn blocks_file_into_the_method_table_by_index() {
        let mut arena = AstArena::new();
        let read = ident(&mut arena, "v");
        let inner = block(&mut arena, &[], &[], vec![read]);
        let inner_call = unary(&mut arena, inner, "value");
        let outer = block(&mut arena, &[], &[], vec![inner_call]);
        let outer_call = unary(&mut arena, outer, "value");
        let program = Program {
            classes: vec![class("Point", None, &[], vec![method("run", &[], &["v"], vec![outer_call])])],
            main: None,
        };

        let compiled = compile(&arena, &program);
        let unit = method_unit(&compiled, "Point", "run");
        assert_eq!(
            decode(unit),
            vec![
                I::Block { idx: 0 },
                I::Send { argc: 0, selector_idx: 0 },
                I::PushSelf,
                I::Return,
            ]
        );

        assert_eq!(unit.blocks.len(), 2);
        let outer_unit = &unit.blocks[0];
        assert_eq!(outer_unit.name, "run-block0");
        assert_eq!(outer_unit.block_index, Some(0));
        assert_eq!(
            decode(outer_unit),
            vec![
                I::Block { idx: 1 },
                I::Send { argc: 0, selector_idx: 0 },
                I::BlockReturn,
            ]
        );

        let inner_unit = &unit.blocks[1];
        assert_eq!(inner_unit.name, "run-block1");
        assert_eq!(inner_unit.block_index, Some(1));
        assert!(inner_unit.blocks.is_empty());
        assert_eq!(
            decode(inner_unit),
            vec![I::PushLocal { depth: 2, idx: 0 }, I::BlockReturn]
        );
    }

    #[test]
    fn block_units_record_their_arity() {
        let mut arena = AstArena::new();
        let receiver = self_ref(&mut arena);
        let read = ident(&mut arena, "e");
        let each = block(&mut arena, &["e"], &[], vec![read]);
        let send = keyword(&mut arena, receiver, &[("do:", each)]);
        let program = Program {
            classes: vec![class("List", None, &[], vec![method("walk", &[], &[], vec![send])])],
            main: None,
        };

        let compiled = compile(&arena, &program);
        let unit = method_unit(&compiled, "List", "walk");
        assert_eq!(
            decode(unit),
            vec![
                I::PushSelf,
                I::Block { idx: 0 },
                I::Send { argc: 1, selector_idx: 0 },
                I::PushSelf,
                I::Return,
            ]
        );
        let each_unit = &unit.blocks[0];
        assert_eq!((each_unit.num_args, each_unit.num_locals), (1, 0));
        assert_eq!(
            decode(each_unit),
            vec![I::PushLocal { depth: 0, idx: 0 }, I::BlockReturn]
        );
    }

    #[test]
    fn empty_blocks_answer_nil() {
        let mut arena = AstArena::new();
        let empty = block(&mut arena, &[], &[], Vec::new());
        let program = Program {
            classes: vec![class("Point", None, &[], vec![method("noop", &[], &[], vec![empty])])],
            main: None,
        };

        let compiled = compile(&arena, &program);
        let unit = method_unit(&compiled, "Point", "noop");
        assert_eq!(decode(unit), vec![I::Block { idx: 0 }, I::PushSelf, I::Return]);
        assert_eq!(decode(&unit.blocks[0]), vec![I::Nil, I::BlockReturn]);
    }

    #[test]
    fn blocks_answer_a_trailing_assignment() {
        let mut arena = AstArena::new();
        let seven = int(&mut arena, 7);
        let store = assign(&mut arena, "a", seven);
        let setter = block(&mut arena, &[], &[], vec![store]);
        let program = Program {
            classes: vec![class("Point", None, &[], vec![method("run", &[], &["a"], vec![setter])])],
            main: None,
        };

        let compiled = compile(&arena, &program);
        let unit = method_unit(&compiled, "Point", "run");
        assert_eq!(
            decode(&unit.blocks[0]),
            vec![
                I::PushInt { value: 7 },
                I::StoreLocal { depth: 1, idx: 0 },
                I::PushLocal { depth: 1, idx: 0 },
                I::BlockReturn,
            ]
        );
    }

    #[test]
    fn super_sends_push_self_and_use_the_super_opcode() {
        let mut arena = AstArena::new();
        let receiver = super_ref(&mut arena);
        let send = unary(&mut arena, receiver, "init");
        let program = Program {
            classes: vec![
                class("A", None, &[], Vec::new()),
                class("B", Some("A"), &[], vec![method("init", &[], &[], vec![send])]),
            ],
            main: None,
        };

        let compiled = compile(&arena, &program);
        assert_eq!(
            decode(method_unit(&compiled, "B", "init")),
            vec![
                I::PushSelf,
                I::SendSuper { argc: 0, selector_idx: 0 },
                I::PushSelf,
                I::Return,
            ]
        );
        assert_eq!(compiled.class("B").unwrap().literals, vec!["init".to_string()]);
    }

    #[test]
    fn inherited_fields_shift_subclass_slots() {
        let mut arena = AstArena::new();
        let read = ident(&mut arena, "c");
        let program = Program {
            classes: vec![
                class("A", None, &["a1", "a2"], Vec::new()),
                class("B", Some("A"), &["c"], vec![method("third", &[], &[], vec![read])]),
            ],
            main: None,
        };

        let compiled = compile(&arena, &program);
        assert_eq!(
            decode(method_unit(&compiled, "B", "third")),
            vec![I::PushField { idx: 2 }, I::PushSelf, I::Return]
        );
        let b = compiled.class("B").unwrap();
        assert_eq!(b.field_count, 3);
        assert_eq!(b.superclass.as_deref(), Some("A"));
    }

    #[test]
    fn class_side_methods_use_class_fields() {
        let mut arena = AstArena::new();
        let read = ident(&mut arena, "total");
        let one = int(&mut arena, 1);
        let sum = binary(&mut arena, read, "+", one);
        let store = assign(&mut arena, "total", sum);
        let program = Program {
            classes: vec![ClassDef {
                name: name("Counter"),
                superclass: None,
                fields: Vec::new(),
                class_fields: names(&["total"]),
                methods: vec![class_method("bump", &[], &[], vec![store])],
                span: sp(),
            }],
            main: None,
        };

        let compiled = compile(&arena, &program);
        let counter = compiled.class("Counter").unwrap();
        assert!(counter.methods.is_empty());
        assert_eq!(counter.class_field_count, 1);
        assert_eq!(counter.field_count, 0);
        assert_eq!(
            decode(&counter.class_methods[0]),
            vec![
                I::PushField { idx: 0 },
                I::PushInt { value: 1 },
                I::Send { argc: 1, selector_idx: 0 },
                I::StoreField { idx: 0 },
                I::PushField { idx: 0 },
                I::PushSelf,
                I::Return,
            ]
        );
    }

    #[test]
    fn primitive_methods_compile_to_a_routine_name() {
        let arena = AstArena::new();
        let primitive = MethodDef {
            selector: "print".to_string(),
            class_side: false,
            args: Vec::new(),
            body: MethodBody::Primitive("Object_print".to_string()),
            span: sp(),
        };
        let program = Program {
            classes: vec![class("Object", None, &[], vec![primitive])],
            main: None,
        };

        let compiled = compile(&arena, &program);
        let unit = method_unit(&compiled, "Object", "print");
        assert!(unit.is_primitive());
        assert_eq!(unit.primitive.as_deref(), Some("Object_print"));
        assert!(unit.bytecode.is_empty());
        assert!(compiled.class("Object").unwrap().literals.is_empty());
    }

    #[test]
    fn dbg_markers_point_at_the_return_site() {
        let mut arena = AstArena::new();
        let value = int(&mut arena, 42);
        let answer = ret_at(&mut arena, value, 3, 9);
        let program = Program {
            classes: vec![class("Point", None, &[], vec![method("answer", &[], &[], vec![answer])])],
            main: None,
        };

        let mut compiler = Compiler::new();
        compiler.gen_dbg = true;
        compiler.file_name = "point.st".to_string();
        let compiled = compiler.compile(&arena, &program);
        assert!(compiler.diagnostics().is_empty());

        let point = compiled.class("Point").unwrap();
        assert_eq!(
            decode(&point.methods[0]),
            vec![
                I::PushInt { value: 42 },
                I::Dbg { file_idx: 0, line: 3, column: 9 },
                I::Return,
            ]
        );
        assert_eq!(point.literals, vec!["point.st".to_string()]);
    }

    #[test]
    fn dbg_markers_default_off() {
        let mut arena = AstArena::new();
        let value = int(&mut arena, 42);
        let answer = ret_at(&mut arena, value, 3, 9);
        let program = Program {
            classes: vec![class("Point", None, &[], vec![method("answer", &[], &[], vec![answer])])],
            main: None,
        };

        let compiled = compile(&arena, &program);
        assert_eq!(
            decode(method_unit(&compiled, "Point", "answer")),
            vec![I::PushInt { value: 42 }, I::Return]
        );
    }

    #[test]
    fn duplicate_classes_emit_only_the_first() {
        let mut arena = AstArena::new();
        let first_body = int(&mut arena, 1);
        let second_body = int(&mut arena, 2);
        let program = Program {
            classes: vec![
                class("Point", None, &["x"], vec![method("draw", &[], &[], vec![first_body])]),
                class("Point", None, &["y"], vec![method("erase", &[], &[], vec![second_body])]),
            ],
            main: None,
        };

        let (compiled, messages) = compile_with_diagnostics(&arena, &program);
        assert_eq!(messages, vec!["redefinition of Point in global"]);
        assert_eq!(compiled.classes.len(), 1);
        let point = compiled.class("Point").unwrap();
        assert_eq!(point.methods.len(), 1);
        assert_eq!(point.methods[0].name, "draw");
    }

    #[test]
    fn duplicate_methods_emit_only_the_first() {
        let mut arena = AstArena::new();
        let first_body = int(&mut arena, 1);
        let second_body = int(&mut arena, 2);
        let program = Program {
            classes: vec![class(
                "Point",
                None,
                &[],
                vec![
                    method("draw", &[], &[], vec![first_body]),
                    method("draw", &[], &[], vec![second_body]),
                ],
            )],
            main: None,
        };

        let (compiled, messages) = compile_with_diagnostics(&arena, &program);
        assert_eq!(messages, vec!["redefinition of draw in Point"]);
        let point = compiled.class("Point").unwrap();
        assert_eq!(point.methods.len(), 1);
        assert_eq!(
            decode(&point.methods[0]),
            vec![I::PushInt { value: 1 }, I::PushSelf, I::Return]
        );
    }

    #[test]
    #[should_panic(expected = "missing resolution")]
    fn a_node_without_resolution_is_fatal() {
        let mut arena = AstArena::new();
        let read = ident(&mut arena, "x");
        let program = main_program(&["x"], vec![read]);
        let mut diagnostics = Vec::new();
        let table = define_symbols(&arena, &program, &mut diagnostics);

        let resolutions = Resolutions::default();
        let generator = CodeGenerator::new(&arena, &table, &resolutions, false, "");
        generator.generate(&program);
    }

    #[test]
    #[should_panic(expected = "outside receiver position")]
    fn bare_super_is_rejected() {
        let mut arena = AstArena::new();
        let lone = super_ref(&mut arena);
        let program = main_program(&[], vec![lone]);

        let mut compiler = Compiler::new();
        compiler.compile(&arena, &program);
    }
}
