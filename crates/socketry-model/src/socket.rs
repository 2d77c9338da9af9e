//! Socket declarations
//!
//! A socket is a typed injection point. Sockets are owned either by a bean
//! (its constructor dependencies) or by a module (dependencies the module
//! expects its enclosing context to provide).

use serde::{Deserialize, Serialize};

use crate::foundation::{Identifier, TypeRef, COLLECTION, LIST, SET};

/// Container shape of a multi-socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiKind {
    Array,
    Collection,
    List,
    Set,
}

/// Whether a socket receives one bean or a collection of beans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    Single,
    Multi(MultiKind),
}

/// A metadata tag carried by a bean.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Tag {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

/// A predicate narrowing which beans a socket accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// The candidate's type must be assignable to this type.
    Type(TypeRef),
    /// The candidate must carry a tag with this key (and value, when given).
    Tag {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

impl Selector {
    pub fn tag(key: impl Into<String>) -> Self {
        Selector::Tag {
            key: key.into(),
            value: None,
        }
    }

    pub fn tag_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Selector::Tag {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

/// A declared socket.
///
/// For a multi-socket, `ty` is the element type; the bean injected into
/// the socket is the container (see [`SocketDecl::container_type`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketDecl {
    pub name: Identifier,

    /// Element type for multi-sockets, target type otherwise.
    #[serde(rename = "type")]
    pub ty: TypeRef,

    #[serde(default)]
    pub optional: bool,

    #[serde(default)]
    pub cardinality: Cardinality,

    /// Lazy sockets receive a deferred provider and do not impose
    /// construction order.
    #[serde(default)]
    pub lazy: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<Selector>,
}

impl SocketDecl {
    pub fn required(name: Identifier, ty: TypeRef) -> Self {
        Self {
            name,
            ty,
            optional: false,
            cardinality: Cardinality::Single,
            lazy: false,
            selectors: Vec::new(),
        }
    }

    pub fn optional(name: Identifier, ty: TypeRef) -> Self {
        Self {
            optional: true,
            ..Self::required(name, ty)
        }
    }

    pub fn multi(mut self, kind: MultiKind) -> Self {
        self.cardinality = Cardinality::Multi(kind);
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selectors.push(selector);
        self
    }

    pub fn is_multi(&self) -> bool {
        matches!(self.cardinality, Cardinality::Multi(_))
    }

    /// Type of the value a multi-socket delivers (`Repo[]`, `List<Repo>`, ...).
    ///
    /// Single sockets deliver their declared type.
    pub fn container_type(&self) -> TypeRef {
        let elem = self.ty.clone();
        match self.cardinality {
            Cardinality::Single => elem,
            Cardinality::Multi(MultiKind::Array) => TypeRef::array(elem),
            Cardinality::Multi(MultiKind::Collection) => TypeRef::generic(COLLECTION, vec![elem]),
            Cardinality::Multi(MultiKind::List) => TypeRef::generic(LIST, vec![elem]),
            Cardinality::Multi(MultiKind::Set) => TypeRef::generic(SET, vec![elem]),
        }
    }
}
