//! Modules and workspaces
//!
//! A [`Module`] groups beans, its own sockets, references to component
//! modules and explicit wire directives. A [`Workspace`] is everything one
//! generation run sees: the type hierarchy, the module declarations and the
//! exports of modules finished by an earlier run.

use serde::{Deserialize, Serialize};

use crate::bean::BeanDecl;
use crate::export::ModuleExport;
use crate::foundation::{Identifier, TypeHierarchy};
use crate::socket::SocketDecl;

/// An explicit wire directive, kept in surface syntax until resolution.
///
/// `into` is `module:bean:socket`, `bean:socket` or `component:socket`;
/// each entry of `beans` is `bean`, `module:bean` or a dotted nested bean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDecl {
    pub beans: Vec<String>,
    pub into: String,
}

impl WireDecl {
    pub fn new<I, S>(beans: I, into: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            beans: beans.into_iter().map(Into::into).collect(),
            into: into.into(),
        }
    }
}

/// A declared module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: Identifier,

    #[serde(default)]
    pub beans: Vec<BeanDecl>,

    /// Dependencies the enclosing context must provide; visible inside the
    /// module as socket beans.
    #[serde(default)]
    pub sockets: Vec<SocketDecl>,

    /// Modules whose public beans and sockets this module composes.
    #[serde(default)]
    pub components: Vec<Identifier>,

    #[serde(default)]
    pub wires: Vec<WireDecl>,
}

impl Module {
    pub fn new(name: Identifier) -> Self {
        Self {
            name,
            beans: Vec::new(),
            sockets: Vec::new(),
            components: Vec::new(),
            wires: Vec::new(),
        }
    }

    pub fn with_bean(mut self, bean: BeanDecl) -> Self {
        self.beans.push(bean);
        self
    }

    pub fn with_socket(mut self, socket: SocketDecl) -> Self {
        self.sockets.push(socket);
        self
    }

    pub fn with_component(mut self, component: Identifier) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_wire(mut self, wire: WireDecl) -> Self {
        self.wires.push(wire);
        self
    }

    pub fn bean(&self, name: &str) -> Option<&BeanDecl> {
        self.beans.iter().find(|b| b.name.as_str() == name)
    }
}

/// A module submitted for generation.
///
/// `preparation_steps` counts rounds of external preparation (for example
/// another processing stage producing part of the declaration) the module
/// still awaits before it can be built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDeclaration {
    #[serde(flatten)]
    pub module: Module,

    #[serde(default)]
    pub preparation_steps: u32,
}

impl ModuleDeclaration {
    pub fn new(module: Module) -> Self {
        Self {
            module,
            preparation_steps: 0,
        }
    }

    pub fn with_preparation_steps(mut self, steps: u32) -> Self {
        self.preparation_steps = steps;
        self
    }

    pub fn name(&self) -> &Identifier {
        &self.module.name
    }

    pub fn is_prepared(&self) -> bool {
        self.preparation_steps == 0
    }
}

impl From<Module> for ModuleDeclaration {
    fn from(module: Module) -> Self {
        Self::new(module)
    }
}

/// All inputs of one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub types: TypeHierarchy,

    #[serde(default)]
    pub modules: Vec<ModuleDeclaration>,

    /// Exports of modules finished by an earlier run.
    #[serde(default)]
    pub compiled: Vec<ModuleExport>,
}

impl Workspace {
    pub fn new(types: TypeHierarchy) -> Self {
        Self {
            types,
            modules: Vec::new(),
            compiled: Vec::new(),
        }
    }

    pub fn with_module(mut self, module: impl Into<ModuleDeclaration>) -> Self {
        self.modules.push(module.into());
        self
    }
}
