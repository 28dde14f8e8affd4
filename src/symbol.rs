use lasso::{Spur, ThreadedRodeo};

/// An interned identifier: fact ids, task and method ids, variable names,
/// constant names and symbol literals all share one id space.
pub type Sym = Spur;

/// Thread-safe symbol store shared by a domain and the world states planned
/// against it.
///
/// Guarantees:
/// - Same string always produces same Sym
/// - Different strings always produce different Syms
/// - A Sym can be resolved back to the original string
pub struct SymbolStore {
    rodeo: ThreadedRodeo,
}

impl SymbolStore {
    /// Create a new empty symbol store.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Intern a name, returning its Sym.
    /// If the name was already interned, returns the existing Sym.
    pub fn intern(&self, name: &str) -> Sym {
        self.rodeo.get_or_intern(name)
    }

    /// Resolve a Sym back to its string.
    /// Returns None if the Sym was not created by this store.
    pub fn resolve(&self, id: Sym) -> Option<&str> {
        self.rodeo.try_resolve(&id)
    }

    /// Resolve a Sym for display, falling back to a placeholder for ids
    /// that belong to another store.
    pub fn name(&self, id: Sym) -> &str {
        self.resolve(id).unwrap_or("<unknown>")
    }

    /// Check if a name has already been interned.
    pub fn contains(&self, name: &str) -> bool {
        self.rodeo.contains(name)
    }

    /// Get the Sym for a name if it exists, without interning.
    pub fn get(&self, name: &str) -> Option<Sym> {
        self.rodeo.get(name)
    }

    /// Number of distinct names interned so far.
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

impl Default for SymbolStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SymbolStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolStore")
            .field("len", &self.len())
            .finish()
    }
}
