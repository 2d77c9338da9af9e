//! Foundation types
//!
//! Names and types shared by every declared entity and by the resolver.

pub mod name;
pub mod types;

pub use name::{Identifier, NameError, QualifiedName};
pub use types::{TypeHierarchy, TypeRef, TypeSyntaxError, COLLECTION, LIST, SET};
