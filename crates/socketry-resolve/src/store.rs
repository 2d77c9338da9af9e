//! Finished-module store
//!
//! Modules finished by an earlier generation run are only known through
//! their [`ModuleExport`]. The scheduler consults a [`CompiledModuleStore`]
//! for components that are not declared in the current workspace.

use indexmap::IndexMap;
use socketry_model::{Identifier, ModuleExport};

/// Lookup of previously compiled modules.
pub trait CompiledModuleStore {
    fn lookup(&self, module: &Identifier) -> Option<ModuleExport>;

    fn contains(&self, module: &Identifier) -> bool {
        self.lookup(module).is_some()
    }
}

impl<S: CompiledModuleStore + ?Sized> CompiledModuleStore for &S {
    fn lookup(&self, module: &Identifier) -> Option<ModuleExport> {
        (**self).lookup(module)
    }
}

/// A store that knows no modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyStore;

impl CompiledModuleStore for EmptyStore {
    fn lookup(&self, _module: &Identifier) -> Option<ModuleExport> {
        None
    }
}

/// Exports held in memory, keyed by module name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    exports: IndexMap<Identifier, ModuleExport>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an export.
    pub fn insert(&mut self, export: ModuleExport) {
        self.exports.insert(export.name.clone(), export);
    }

    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

impl FromIterator<ModuleExport> for InMemoryStore {
    fn from_iter<I: IntoIterator<Item = ModuleExport>>(iter: I) -> Self {
        let mut store = Self::new();
        for export in iter {
            store.insert(export);
        }
        store
    }
}

impl CompiledModuleStore for InMemoryStore {
    fn lookup(&self, module: &Identifier) -> Option<ModuleExport> {
        self.exports.get(module).cloned()
    }

    fn contains(&self, module: &Identifier) -> bool {
        self.exports.contains_key(module)
    }
}
