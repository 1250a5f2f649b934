//! Compiled output records.
//!
//! These are plain data: everything a virtual machine needs to load a
//! program, with no references back into the AST or the symbol table.

// ── Literal pool ─────────────────────────────────────────────────────────

/// Interning pool for the strings a class's bytecode refers to by index:
/// selectors, global names, string and symbol literals, file names.
///
/// Indices are handed out in first-use order and never change, so the
/// pool is deterministic for a given compilation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `text`, interning it on first use.
    pub fn add(&mut self, text: &str) -> u16 {
        if let Some(pos) = self.strings.iter().position(|s| s == text) {
            return pos as u16;
        }
        self.strings.push(text.to_string());
        (self.strings.len() - 1) as u16
    }

    pub fn get(&self, idx: u16) -> Option<&str> {
        self.strings.get(idx as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.strings
    }

    pub fn into_vec(self) -> Vec<String> {
        self.strings
    }
}

// ── Units ────────────────────────────────────────────────────────────────

/// One compiled unit: a method or a block literal.
///
/// Either `bytecode` is populated, or `primitive` names the built-in
/// routine the virtual machine should run instead; never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledBlock {
    /// Name of the class the unit belongs to.
    pub owner_class: String,
    /// Selector for methods, `<selector>-block<N>` for block literals.
    pub name: String,
    pub num_args: u16,
    pub num_locals: u16,
    /// `None` for methods, the per-method block number for blocks.
    pub block_index: Option<u16>,
    pub bytecode: Vec<u8>,
    /// Built-in routine name for primitive methods.
    pub primitive: Option<String>,
    /// Block literals of a method, positioned by `block_index`. Always
    /// empty on block units; nested blocks live in the method's table.
    pub blocks: Vec<CompiledBlock>,
}

impl CompiledBlock {
    pub fn is_primitive(&self) -> bool {
        self.primitive.is_some()
    }
}

/// One compiled class.
///
/// Field counts are totals including inherited slots, so the VM can size
/// instances without chasing the superclass chain itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledClass {
    pub name: String,
    pub superclass: Option<String>,
    pub field_count: u16,
    pub class_field_count: u16,
    /// Shared literal pool; bytecode indices point in here.
    pub literals: Vec<String>,
    pub methods: Vec<CompiledBlock>,
    pub class_methods: Vec<CompiledBlock>,
}

/// Everything produced for one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledProgram {
    pub classes: Vec<CompiledClass>,
}

impl CompiledProgram {
    pub fn class(&self, name: &str) -> Option<&CompiledClass> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Every compiled unit in the program: each method on both sides,
    /// followed by its block literals.
    pub fn units(&self) -> impl Iterator<Item = &CompiledBlock> {
        self.classes
            .iter()
            .flat_map(|class| class.methods.iter().chain(class.class_methods.iter()))
            .flat_map(|method| std::iter::once(method).chain(method.blocks.iter()))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
