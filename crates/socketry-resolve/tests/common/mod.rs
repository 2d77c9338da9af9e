//! Shared builders for resolver integration tests.

#![allow(dead_code)]

use socketry_model::{BeanDecl, Identifier, Module, SocketDecl, TypeHierarchy, TypeRef};
use socketry_resolve::{BuildConfig, ModuleBuilder};

pub fn id(s: &str) -> Identifier {
    Identifier::new(s).expect("valid identifier")
}

pub fn ty(s: &str) -> TypeRef {
    TypeRef::parse(s).expect("valid type")
}

/// A public bean of type `ty` with required eager sockets `(name, type)`.
pub fn bean(name: &str, ty_name: &str, sockets: &[(&str, &str)]) -> BeanDecl {
    sockets.iter().fold(BeanDecl::new(id(name), ty(ty_name)), |bean, (socket, socket_ty)| {
        bean.with_socket(SocketDecl::required(id(socket), ty(socket_ty)))
    })
}

/// Standard hierarchy used across scenarios.
pub fn types() -> TypeHierarchy {
    let mut types = TypeHierarchy::with_collections();
    types.declare("RepoImpl", "Repo");
    types
}

pub fn builder() -> ModuleBuilder {
    ModuleBuilder::new(types(), BuildConfig::default())
}

pub fn module(name: &str) -> Module {
    Module::new(id(name))
}
