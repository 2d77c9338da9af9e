//! Wiring strategies
//!
//! A bean may be injected into a socket only if every registered
//! [`WiringStrategy`] accepts it. The standard set checks type
//! compatibility and the socket's selectors; callers may register more.

use std::fmt;

use socketry_model::{Selector, SocketDecl, TypeHierarchy, TypeRef, COLLECTION};

use super::scope::Candidate;

/// A compatibility predicate between a candidate bean and a socket.
pub trait WiringStrategy: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn is_wirable(&self, types: &TypeHierarchy, candidate: &Candidate, socket: &SocketDecl)
        -> bool;
}

/// The candidate's exposed type must be assignable to the socket type.
///
/// Multi-sockets also accept a bean that already is a container of the
/// element type (`Elem[]` or `Collection<Elem>`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeStrategy;

impl WiringStrategy for TypeStrategy {
    fn name(&self) -> &'static str {
        "type"
    }

    fn is_wirable(
        &self,
        types: &TypeHierarchy,
        candidate: &Candidate,
        socket: &SocketDecl,
    ) -> bool {
        if types.is_assignable(&candidate.ty, &socket.ty) {
            return true;
        }
        socket.is_multi()
            && (types.is_assignable(&candidate.ty, &TypeRef::array(socket.ty.clone()))
                || types.is_assignable(
                    &candidate.ty,
                    &TypeRef::generic(COLLECTION, vec![socket.ty.clone()]),
                ))
    }
}

/// Every selector on the socket must accept the candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorStrategy;

impl WiringStrategy for SelectorStrategy {
    fn name(&self) -> &'static str {
        "selector"
    }

    fn is_wirable(
        &self,
        types: &TypeHierarchy,
        candidate: &Candidate,
        socket: &SocketDecl,
    ) -> bool {
        socket.selectors.iter().all(|selector| match selector {
            Selector::Type(ty) => types.is_assignable(&candidate.ty, ty),
            Selector::Tag { key, value } => candidate.tags.iter().any(|tag| {
                tag.key == *key && (value.is_none() || tag.value.as_ref() == value.as_ref())
            }),
        })
    }
}

/// The registered strategies, applied as a conjunction.
#[derive(Debug)]
pub struct WiringStrategies {
    strategies: Vec<Box<dyn WiringStrategy>>,
}

impl WiringStrategies {
    /// No strategies: every candidate is wirable.
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Type and selector compatibility.
    pub fn standard() -> Self {
        Self::empty()
            .with(Box::new(TypeStrategy))
            .with(Box::new(SelectorStrategy))
    }

    pub fn with(mut self, strategy: Box<dyn WiringStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn is_wirable(
        &self,
        types: &TypeHierarchy,
        candidate: &Candidate,
        socket: &SocketDecl,
    ) -> bool {
        self.strategies
            .iter()
            .all(|s| s.is_wirable(types, candidate, socket))
    }
}

impl Default for WiringStrategies {
    fn default() -> Self {
        Self::standard()
    }
}
