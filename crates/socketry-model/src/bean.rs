//! Bean declarations
//!
//! A bean describes one injectable instance: its type, the sockets its
//! construction needs and how it is exposed. Variants are tagged with
//! [`BeanKind`]; socket beans (a module's own sockets) and nested beans
//! (accessors on another bean) are derived by the resolver from the module
//! and never declared as `BeanDecl`s.

use serde::{Deserialize, Serialize};

use crate::foundation::{Identifier, TypeRef};
use crate::socket::{SocketDecl, Tag};

// =============================================================================
// Bean Attributes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Instantiation strategy of a bean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Singleton,
    Prototype,
}

/// What kind of bean this is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeanKind {
    /// Constructed from its sockets.
    #[default]
    Simple,

    /// The exposed instance is obtained by calling `supplier` on a constructed
    /// `wrapper_type` object. The bean's own type is the supplied type.
    Wrapper {
        wrapper_type: TypeRef,
        supplier: String,
    },

    /// Receives an externally wired instance of `mutating_type` through a
    /// boundary socket named after the bean.
    Mutator {
        mutating_type: TypeRef,
        #[serde(default)]
        optional: bool,
    },

    /// May be replaced by an enclosing module through an optional boundary
    /// socket named after the bean.
    Overridable,
}

/// A bean reached through an accessor on another bean (`parent.accessor`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedBeanDecl {
    pub accessor: Identifier,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<NestedBeanDecl>,
}

impl NestedBeanDecl {
    pub fn new(accessor: Identifier, ty: TypeRef) -> Self {
        Self {
            accessor,
            ty,
            nested: Vec::new(),
        }
    }

    pub fn with_nested(mut self, nested: NestedBeanDecl) -> Self {
        self.nested.push(nested);
        self
    }
}

// =============================================================================
// Bean Declaration
// =============================================================================

/// A declared bean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeanDecl {
    pub name: Identifier,

    /// Natural type of the instance.
    #[serde(rename = "type")]
    pub ty: TypeRef,

    /// Explicit type the bean is exposed as, overriding `ty` for wiring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provided_type: Option<TypeRef>,

    #[serde(default)]
    pub kind: BeanKind,

    #[serde(default)]
    pub visibility: Visibility,

    #[serde(default)]
    pub strategy: Strategy,

    /// Construction sockets in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sockets: Vec<SocketDecl>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destroy: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<NestedBeanDecl>,
}

impl BeanDecl {
    /// A public singleton simple bean with no sockets.
    pub fn new(name: Identifier, ty: TypeRef) -> Self {
        Self {
            name,
            ty,
            provided_type: None,
            kind: BeanKind::Simple,
            visibility: Visibility::Public,
            strategy: Strategy::Singleton,
            sockets: Vec::new(),
            init: None,
            destroy: None,
            tags: Vec::new(),
            nested: Vec::new(),
        }
    }

    pub fn with_socket(mut self, socket: SocketDecl) -> Self {
        self.sockets.push(socket);
        self
    }

    pub fn with_kind(mut self, kind: BeanKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_provided_type(mut self, ty: TypeRef) -> Self {
        self.provided_type = Some(ty);
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn prototype(mut self) -> Self {
        self.strategy = Strategy::Prototype;
        self
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn with_nested(mut self, nested: NestedBeanDecl) -> Self {
        self.nested.push(nested);
        self
    }

    pub fn with_lifecycle(mut self, init: Option<String>, destroy: Option<String>) -> Self {
        self.init = init;
        self.destroy = destroy;
        self
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// The type used for wiring: the provided type if declared, else the natural type.
    pub fn exposed_type(&self) -> &TypeRef {
        self.provided_type.as_ref().unwrap_or(&self.ty)
    }

    /// The socket this bean exposes at its module's boundary, if any.
    ///
    /// Mutators always expose their mutating socket; overridable beans expose
    /// an optional overriding socket only when public.
    pub fn boundary_socket(&self) -> Option<SocketDecl> {
        match &self.kind {
            BeanKind::Mutator {
                mutating_type,
                optional,
            } => {
                let socket = SocketDecl::required(self.name.clone(), mutating_type.clone());
                Some(SocketDecl {
                    optional: *optional,
                    ..socket
                })
            }
            BeanKind::Overridable if self.is_public() => Some(SocketDecl::optional(
                self.name.clone(),
                self.exposed_type().clone(),
            )),
            BeanKind::Simple | BeanKind::Wrapper { .. } | BeanKind::Overridable => None,
        }
    }
}
