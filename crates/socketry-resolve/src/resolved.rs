//! Resolution output for one module.
//!
//! A [`ResolvedModule`] never modifies the declarations it was built from;
//! it refers to them by qualified name. A code-emission backend takes it as
//! input together with the declared [`socketry_model::Module`].

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;
use socketry_model::{Diagnostic, Identifier, ModuleExport, QualifiedName, Severity};

use crate::resolve::cycles::Cycle;
use crate::resolve::sockets::SocketBinding;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedModule {
    pub name: Identifier,
    /// Every socket site, in declaration order
    pub bindings: IndexMap<QualifiedName, SocketBinding>,
    /// Eager dependency cycles
    pub cycles: Vec<Cycle>,
    /// Local beans with a conflict, a failed socket or on an eager cycle
    pub faulty_beans: BTreeSet<QualifiedName>,
    /// Whether any error was reported for the module
    pub faulty: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub export: ModuleExport,
}

impl ResolvedModule {
    /// Look up a binding by its qualified socket name (`app:service:repo`).
    pub fn binding(&self, socket: &str) -> Option<&SocketBinding> {
        let name = QualifiedName::parse(socket).ok()?;
        self.bindings.get(&name)
    }

    /// Names of the beans bound to `socket`; empty if unknown or unbound.
    pub fn bound_beans(&self, socket: &str) -> Vec<String> {
        self.binding(socket)
            .map(SocketBinding::bean_names)
            .unwrap_or_default()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn is_bean_faulty(&self, bean: &str) -> bool {
        QualifiedName::parse(bean)
            .map(|name| self.faulty_beans.contains(&name))
            .unwrap_or(false)
    }
}
