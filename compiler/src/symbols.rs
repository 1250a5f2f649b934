//! Scope tree and symbol storage.
//!
//! All scopes and symbols live in two flat arenas owned by [`SymbolTable`];
//! the tree structure is encoded through parent links. [`ScopeId`] and
//! [`SymbolId`] are plain `u32` indices, so they are `Copy` and can be
//! stored freely in side tables without borrowing the arena.
//!
//! The table is built once by the define pass and read-only afterwards.

use std::collections::{HashMap, HashSet};

use ast::ExprId;

// ── Ids ──────────────────────────────────────────────────────────────────

/// Index of a scope in the [`SymbolTable`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

/// Index of a symbol in the [`SymbolTable`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

// ── Scopes ───────────────────────────────────────────────────────────────

/// What kind of region a scope covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    /// The outermost scope. Holds one `Class` symbol per class.
    Global,
    /// A class body. `superclass` is kept by name and resolved lazily,
    /// so a class may inherit from one defined further down the file.
    Class { superclass: Option<String> },
    /// A method body. `block_count` is the number of block literals
    /// anywhere inside the body, including nested ones.
    Method { block_count: u16 },
    /// A block literal. `index` numbers blocks per method, in the order
    /// their opening bracket appears.
    Block { index: u16 },
}

/// One scope: its kind, display name, parent link and declared symbols.
#[derive(Debug, Clone)]
pub struct ScopeData {
    pub kind: ScopeKind,
    pub name: String,
    pub parent: Option<ScopeId>,
    /// Symbols in declaration order.
    pub symbols: Vec<SymbolId>,
}

// ── Symbols ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Field,
    Arg,
    Local,
    Class,
    Method,
    Block,
}

/// One declared name.
///
/// `index` is the position within the symbol's storage group, counting
/// from zero in declaration order. Args and locals of one scope share a
/// single group (args first), since both live in the same frame slots at
/// run time. Fields count per side, methods per side, classes globally.
#[derive(Debug, Clone)]
pub struct SymbolData {
    pub name: String,
    pub kind: SymbolKind,
    /// `true` for class-side fields and methods.
    pub class_side: bool,
    pub index: u16,
    pub scope: ScopeId,
}

// ── Compilation bindings ─────────────────────────────────────────────────

/// Scope assignment for one class definition, parallel to
/// `Program::classes`. `kept` is `false` for a duplicate definition:
/// its scopes exist (so later passes can still walk the body), but the
/// code generator emits nothing for it.
#[derive(Debug, Clone)]
pub struct ClassBinding {
    pub scope: ScopeId,
    pub kept: bool,
    /// Parallel to `ClassDef::methods`.
    pub methods: Vec<MethodBinding>,
}

/// Scope assignment for one method definition.
#[derive(Debug, Clone)]
pub struct MethodBinding {
    pub scope: ScopeId,
    pub kept: bool,
}

/// Scopes synthesized for the file-level entry body.
#[derive(Debug, Clone, Copy)]
pub struct EntryBinding {
    pub class: ScopeId,
    pub method: ScopeId,
}

// ── Symbol table ─────────────────────────────────────────────────────────

/// Arena-backed scope tree plus the bindings that map AST definitions
/// onto it.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<ScopeData>,
    symbols: Vec<SymbolData>,
    global: ScopeId,
    /// Class name to class scope; first definition wins.
    classes_by_name: HashMap<String, ScopeId>,
    class_bindings: Vec<ClassBinding>,
    entry: Option<EntryBinding>,
    /// Block expression to the scope created for it.
    block_scopes: HashMap<ExprId, ScopeId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let global = ScopeData {
            kind: ScopeKind::Global,
            name: "global".to_string(),
            parent: None,
            symbols: Vec::new(),
        };
        Self {
            scopes: vec![global],
            symbols: Vec::new(),
            global: ScopeId(0),
            classes_by_name: HashMap::new(),
            class_bindings: Vec::new(),
            entry: None,
            block_scopes: HashMap::new(),
        }
    }

    pub fn global(&self) -> ScopeId {
        self.global
    }

    pub fn scope(&self, id: ScopeId) -> &ScopeData {
        &self.scopes[id.0 as usize]
    }

    pub fn symbol(&self, id: SymbolId) -> &SymbolData {
        &self.symbols[id.0 as usize]
    }

    /// Scope of the class `name`, if a kept definition exists.
    pub fn class_scope(&self, name: &str) -> Option<ScopeId> {
        self.classes_by_name.get(name).copied()
    }

    pub fn class_binding(&self, class_index: usize) -> &ClassBinding {
        &self.class_bindings[class_index]
    }

    pub fn entry(&self) -> Option<EntryBinding> {
        self.entry
    }

    pub fn block_scope(&self, block: ExprId) -> Option<ScopeId> {
        self.block_scopes.get(&block).copied()
    }

    // ── Construction (define pass only) ──────────────────────────────────

    pub(crate) fn add_scope(
        &mut self,
        kind: ScopeKind,
        name: impl Into<String>,
        parent: ScopeId,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(ScopeData {
            kind,
            name: name.into(),
            parent: Some(parent),
            symbols: Vec::new(),
        });
        id
    }

    /// Declare `name` in `scope`. Returns `Err` with the previous symbol
    /// when the name is already taken on that side; the first declaration
    /// keeps its slot. `Block` symbols are bookkeeping entries and take
    /// part in no name checks, in either direction.
    pub(crate) fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: SymbolKind,
        class_side: bool,
    ) -> Result<SymbolId, SymbolId> {
        if kind != SymbolKind::Block {
            if let Some(existing) = self.find_declared(scope, name, class_side) {
                return Err(existing);
            }
        }
        let index = self.next_group_index(scope, kind, class_side);
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(SymbolData {
            name: name.to_string(),
            kind,
            class_side,
            index,
            scope,
        });
        self.scopes[scope.0 as usize].symbols.push(id);
        Ok(id)
    }

    pub(crate) fn register_class_name(&mut self, name: &str, scope: ScopeId) {
        self.classes_by_name.entry(name.to_string()).or_insert(scope);
    }

    pub(crate) fn push_class_binding(&mut self, binding: ClassBinding) {
        self.class_bindings.push(binding);
    }

    pub(crate) fn set_entry(&mut self, entry: EntryBinding) {
        self.entry = Some(entry);
    }

    pub(crate) fn insert_block_scope(&mut self, block: ExprId, scope: ScopeId) {
        self.block_scopes.insert(block, scope);
    }

    pub(crate) fn set_block_count(&mut self, method: ScopeId, count: u16) {
        if let ScopeKind::Method { block_count } = &mut self.scopes[method.0 as usize].kind {
            *block_count = count;
        }
    }

    // ── Lookups ──────────────────────────────────────────────────────────

    /// Name check within one scope: any non-`Block` symbol with the same
    /// name on the same side.
    fn find_declared(&self, scope: ScopeId, name: &str, class_side: bool) -> Option<SymbolId> {
        self.scope(scope).symbols.iter().copied().find(|&id| {
            let sym = self.symbol(id);
            sym.kind != SymbolKind::Block && sym.class_side == class_side && sym.name == name
        })
    }

    /// An `Arg` or `Local` named `name` declared directly in `scope`.
    pub fn find_variable(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scope(scope).symbols.iter().copied().find(|&id| {
            let sym = self.symbol(id);
            matches!(sym.kind, SymbolKind::Arg | SymbolKind::Local) && sym.name == name
        })
    }

    /// A field named `name` declared directly in `class_scope`, on the
    /// requested side.
    pub fn find_field(&self, class_scope: ScopeId, name: &str, class_side: bool) -> Option<SymbolId> {
        self.scope(class_scope).symbols.iter().copied().find(|&id| {
            let sym = self.symbol(id);
            sym.kind == SymbolKind::Field && sym.class_side == class_side && sym.name == name
        })
    }

    /// Args and locals declared in `scope`, as `(args, locals)`.
    pub fn var_counts(&self, scope: ScopeId) -> (u16, u16) {
        let mut args = 0;
        let mut locals = 0;
        for &id in &self.scope(scope).symbols {
            match self.symbol(id).kind {
                SymbolKind::Arg => args += 1,
                SymbolKind::Local => locals += 1,
                _ => {}
            }
        }
        (args, locals)
    }

    pub fn method_block_count(&self, method: ScopeId) -> u16 {
        match self.scope(method).kind {
            ScopeKind::Method { block_count } => block_count,
            _ => 0,
        }
    }

    // ── Inheritance ──────────────────────────────────────────────────────

    /// Superclass scopes of `class`, nearest first. The walk stops at a
    /// class without a superclass, at a name with no kept definition
    /// (external classes are legal), or when it would revisit a scope.
    /// The flag is `true` in the revisit case.
    pub fn superclass_chain(&self, class: ScopeId) -> (Vec<ScopeId>, bool) {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([class]);
        let mut cursor = class;
        loop {
            let ScopeKind::Class { superclass: Some(name) } = &self.scope(cursor).kind else {
                return (chain, false);
            };
            let Some(next) = self.class_scope(name) else {
                return (chain, false);
            };
            if !seen.insert(next) {
                return (chain, true);
            }
            chain.push(next);
            cursor = next;
        }
    }

    /// Fields declared directly in `class_scope` on one side.
    pub fn field_count(&self, class_scope: ScopeId, class_side: bool) -> u16 {
        self.scope(class_scope)
            .symbols
            .iter()
            .filter(|&&id| {
                let sym = self.symbol(id);
                sym.kind == SymbolKind::Field && sym.class_side == class_side
            })
            .count() as u16
    }

    /// Slots taken by inherited fields, so the first own field of
    /// `class_scope` lives at this index.
    pub fn inherited_field_offset(&self, class_scope: ScopeId, class_side: bool) -> u16 {
        let (chain, _) = self.superclass_chain(class_scope);
        chain.iter().map(|&c| self.field_count(c, class_side)).sum()
    }

    /// Own plus inherited fields on one side.
    pub fn total_field_count(&self, class_scope: ScopeId, class_side: bool) -> u16 {
        self.inherited_field_offset(class_scope, class_side) + self.field_count(class_scope, class_side)
    }

    // ── Diagnostics support ──────────────────────────────────────────────

    /// Human-readable position of a scope, e.g. `Point>>x:y:` or
    /// `Point>>draw>>block0`. The global scope reads `global`.
    pub fn qualifier(&self, scope: ScopeId) -> String {
        let mut parts = Vec::new();
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let data = self.scope(id);
            if !matches!(data.kind, ScopeKind::Global) {
                parts.push(data.name.as_str());
            }
            cursor = data.parent;
        }
        if parts.is_empty() {
            return "global".to_string();
        }
        parts.reverse();
        parts.join(">>")
    }

    fn next_group_index(&self, scope: ScopeId, kind: SymbolKind, class_side: bool) -> u16 {
        let same_group = |sym: &SymbolData| match kind {
            SymbolKind::Arg | SymbolKind::Local => {
                matches!(sym.kind, SymbolKind::Arg | SymbolKind::Local)
            }
            SymbolKind::Field => sym.kind == SymbolKind::Field && sym.class_side == class_side,
            SymbolKind::Method => sym.kind == SymbolKind::Method && sym.class_side == class_side,
            SymbolKind::Class => sym.kind == SymbolKind::Class,
            SymbolKind::Block => sym.kind == SymbolKind::Block,
        };
        self.scope(scope)
            .symbols
            .iter()
            .filter(|&&id| same_group(self.symbol(id)))
            .count() as u16
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
