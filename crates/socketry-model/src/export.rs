//! Public surface of a finished module.
//!
//! A [`ModuleExport`] is all an enclosing module learns about a component:
//! which beans it may wire, which boundary sockets it must resolve on the
//! component's behalf, and which of those sockets each bean transitively
//! depends on for its eager construction. The last part lets the enclosing
//! module detect cycles that pass through the component without looking at
//! its internals.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::foundation::{Identifier, QualifiedName, TypeRef};
use crate::socket::{SocketDecl, Tag};

/// A public bean of a finished module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedBean {
    /// Simple (possibly dotted) bean name within the module.
    pub name: Identifier,

    #[serde(rename = "type")]
    pub ty: TypeRef,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,

    /// Bean this nested bean is read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Identifier>,

    /// Boundary sockets of the module this bean eagerly depends on.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub reachable_sockets: BTreeSet<Identifier>,
}

impl ExportedBean {
    pub fn new(name: Identifier, ty: TypeRef) -> Self {
        Self {
            name,
            ty,
            tags: Vec::new(),
            provider: None,
            reachable_sockets: BTreeSet::new(),
        }
    }

    pub fn reaching(mut self, socket: Identifier) -> Self {
        self.reachable_sockets.insert(socket);
        self
    }
}

/// How a boundary socket came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    /// Declared on the module.
    Declared,
    /// Mutating socket of the mutator bean with the same name.
    Mutating,
    /// Overriding socket of the overridable bean with the same name.
    Overriding,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedSocket {
    #[serde(flatten)]
    pub decl: SocketDecl,
    pub kind: BoundaryKind,
}

impl ExportedSocket {
    pub fn name(&self) -> &Identifier {
        &self.decl.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleExport {
    pub name: Identifier,
    #[serde(default)]
    pub beans: Vec<ExportedBean>,
    #[serde(default)]
    pub sockets: Vec<ExportedSocket>,
}

impl ModuleExport {
    pub fn new(name: Identifier) -> Self {
        Self {
            name,
            beans: Vec::new(),
            sockets: Vec::new(),
        }
    }

    pub fn with_bean(mut self, bean: ExportedBean) -> Self {
        self.beans.push(bean);
        self
    }

    pub fn with_socket(mut self, decl: SocketDecl, kind: BoundaryKind) -> Self {
        self.sockets.push(ExportedSocket { decl, kind });
        self
    }

    pub fn bean(&self, name: &str) -> Option<&ExportedBean> {
        self.beans.iter().find(|b| b.name.as_str() == name)
    }

    pub fn socket(&self, name: &str) -> Option<&ExportedSocket> {
        self.sockets.iter().find(|s| s.name().as_str() == name)
    }

    /// Qualified name of an exported bean or boundary socket (`module:name`).
    pub fn qualify(&self, name: &Identifier) -> QualifiedName {
        QualifiedName::bean(&self.name, name)
    }
}
