// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Declared entities for the socketry dependency-injection resolver
//!
//! This crate contains the names, types, module/bean/socket declarations,
//! module exports and diagnostics shared by the resolver and its tools.
//! Declarations are immutable inputs; resolution results live in
//! `socketry-resolve` and refer back to declarations by qualified name.

pub mod bean;
pub mod error;
pub mod export;
pub mod foundation;
pub mod module;
pub mod socket;

pub use bean::{BeanDecl, BeanKind, NestedBeanDecl, Strategy, Visibility};
pub use error::{
    has_errors, Diagnostic, DiagnosticFormatter, DiagnosticKind, DiagnosticSink, Label, Severity,
};
pub use export::{BoundaryKind, ExportedBean, ExportedSocket, ModuleExport};
pub use foundation::{
    Identifier, NameError, QualifiedName, TypeHierarchy, TypeRef, TypeSyntaxError, COLLECTION, LIST,
    SET,
};
pub use module::{Module, ModuleDeclaration, WireDecl, Workspace};
pub use socket::{Cardinality, MultiKind, Selector, SocketDecl, Tag};
