//! Socket resolution
//!
//! Binds every socket site of a module to the beans that satisfy it.
//!
//! # Resolution Rules
//!
//! For each socket site, in declaration order:
//!
//! 1. **Explicit wires** take precedence. A single wire directive binds
//!    exactly the beans it names; each unknown, ambiguous or type-incompatible
//!    name is an error. A single socket may only be wired with one bean.
//!    Several directives on one socket are all rejected.
//! 2. **Autowiring** otherwise: every visible candidate accepted by all
//!    wiring strategies, except the socket's own bean (or, for a component
//!    socket, the component's own beans). Multi-sockets take the whole set;
//!    single sockets need exactly one match, or none if optional.
//!
//! An explicit wire never falls back to autowiring: a defective wire that
//! binds nothing leaves its socket failed.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;
use socketry_model::{
    has_errors, Diagnostic, DiagnosticKind, DiagnosticSink, QualifiedName, TypeHierarchy, WireDecl,
};
use tracing::debug;

use super::scope::{Candidate, ModuleScope, SocketOwner, SocketSite};
use super::wires::{collect_directives, resolve_source, Directive};
use super::wiring::{TypeStrategy, WiringStrategies, WiringStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingState {
    /// At least one bean is bound
    Wired,
    /// Legitimately empty (optional single socket, or multi-socket with no match)
    Unwired,
    /// Resolution failed; an error was reported
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingSource {
    Wire,
    Autowire,
}

/// The resolved state of one socket site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocketBinding {
    pub socket: QualifiedName,
    pub owner: SocketOwner,
    /// Bound beans in declaration (or wire) order
    pub beans: Vec<QualifiedName>,
    pub state: BindingState,
    pub source: BindingSource,
    pub lazy: bool,
    pub optional: bool,
    pub multi: bool,
    /// Boundary sockets of the module the bound beans eagerly depend on,
    /// filled in once the dependency graph is known
    pub reaches: BTreeSet<QualifiedName>,
}

impl SocketBinding {
    fn new(
        site: &SocketSite,
        beans: &[&Candidate],
        state: BindingState,
        source: BindingSource,
    ) -> Self {
        Self {
            socket: site.name.clone(),
            owner: site.owner.clone(),
            beans: beans.iter().map(|c| c.name.clone()).collect(),
            state,
            source,
            lazy: site.decl.lazy,
            optional: site.decl.optional,
            multi: site.decl.is_multi(),
            reaches: BTreeSet::new(),
        }
    }

    /// Bound bean names as strings, for assertions and reports.
    pub fn bean_names(&self) -> Vec<String> {
        self.beans.iter().map(ToString::to_string).collect()
    }
}

/// Output of [`SocketResolver::resolve`].
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub bindings: IndexMap<QualifiedName, SocketBinding>,
    /// Local beans owning a socket that failed to resolve
    pub faulty_beans: BTreeSet<QualifiedName>,
}

/// Resolves the socket sites of one module scope.
pub struct SocketResolver<'a> {
    scope: &'a ModuleScope,
    types: &'a TypeHierarchy,
    strategies: &'a WiringStrategies,
}

impl<'a> SocketResolver<'a> {
    pub fn new(
        scope: &'a ModuleScope,
        types: &'a TypeHierarchy,
        strategies: &'a WiringStrategies,
    ) -> Self {
        Self {
            scope,
            types,
            strategies,
        }
    }

    pub fn resolve(&self, wires: &[WireDecl], sink: &mut impl DiagnosticSink) -> Resolution {
        let directives = collect_directives(self.scope, wires, sink);
        let mut resolution = Resolution::default();

        for site in &self.scope.sites {
            let mut diagnostics = Vec::new();
            let binding = match directives.get(&site.name).map(Vec::as_slice) {
                None | Some([]) => self.autowire(site, &mut diagnostics),
                Some([directive]) => self.apply_wire(site, directive, &mut diagnostics),
                Some(several) => conflicting_wires(site, several, &mut diagnostics),
            };

            debug!(
                socket = %site.name,
                state = ?binding.state,
                source = ?binding.source,
                beans = binding.beans.len(),
                "socket resolved"
            );

            if has_errors(&diagnostics) || binding.state == BindingState::Failed {
                if let SocketOwner::Bean(bean) = &site.owner {
                    resolution.faulty_beans.insert(bean.clone());
                }
            }
            sink.report_all(diagnostics);
            resolution.bindings.insert(site.name.clone(), binding);
        }

        resolution
    }

    fn apply_wire(
        &self,
        site: &SocketSite,
        directive: &Directive,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> SocketBinding {
        if !site.decl.is_multi() && directive.beans.len() > 1 {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::InvalidWire,
                    site.name.clone(),
                    format!(
                        "wire #{} names {} beans but `{}` is a single socket",
                        directive.index,
                        directive.beans.len(),
                        site.name
                    ),
                )
                .with_note("wire exactly one bean into a single socket".to_string()),
            );
            return SocketBinding::new(site, &[], BindingState::Failed, BindingSource::Wire);
        }

        let mut bound = Vec::new();
        for raw in &directive.beans {
            let candidate = match resolve_source(self.scope, raw, &site.name) {
                Ok(candidate) => candidate,
                Err(diagnostic) => {
                    diagnostics.push(diagnostic);
                    continue;
                }
            };
            if !TypeStrategy.is_wirable(self.types, candidate, &site.decl) {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::IncompatibleBean,
                        site.name.clone(),
                        format!(
                            "bean `{}` of type `{}` cannot be wired into socket of type `{}`",
                            candidate.name, candidate.ty, site.decl.ty
                        ),
                    )
                    .with_label(candidate.name.clone(), "wired here".to_string()),
                );
                continue;
            }
            bound.push(candidate);
        }

        let state = if bound.is_empty() {
            BindingState::Failed
        } else {
            BindingState::Wired
        };
        SocketBinding::new(site, &bound, state, BindingSource::Wire)
    }

    fn autowire(&self, site: &SocketSite, diagnostics: &mut Vec<Diagnostic>) -> SocketBinding {
        let matches: Vec<&Candidate> = self
            .scope
            .candidates
            .iter()
            .filter(|c| !is_excluded(site, c))
            .filter(|c| self.strategies.is_wirable(self.types, c, &site.decl))
            .collect();

        if site.decl.is_multi() {
            let state = if matches.is_empty() {
                BindingState::Unwired
            } else {
                BindingState::Wired
            };
            return SocketBinding::new(site, &matches, state, BindingSource::Autowire);
        }

        match matches.as_slice() {
            [_] => SocketBinding::new(site, &matches, BindingState::Wired, BindingSource::Autowire),
            [] if site.decl.optional => {
                SocketBinding::new(site, &[], BindingState::Unwired, BindingSource::Autowire)
            }
            [] => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnresolvedSocket,
                    site.name.clone(),
                    format!(
                        "no bean of type `{}` can be wired into required socket `{}`",
                        site.decl.ty, site.name
                    ),
                ));
                SocketBinding::new(site, &[], BindingState::Failed, BindingSource::Autowire)
            }
            several => {
                let names = several
                    .iter()
                    .map(|c| format!("`{}`", c.name))
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut diagnostic = Diagnostic::new(
                    DiagnosticKind::MultipleCandidates,
                    site.name.clone(),
                    format!(
                        "{} beans can be wired into single socket `{}`: {}",
                        several.len(),
                        site.name,
                        names
                    ),
                );
                for candidate in several {
                    diagnostic = diagnostic.with_label(candidate.name.clone(), "candidate".into());
                }
                diagnostics.push(diagnostic.with_note(format!(
                    "add an explicit wire into `{}` naming one of the candidates",
                    site.name
                )));
                SocketBinding::new(site, &[], BindingState::Failed, BindingSource::Autowire)
            }
        }
    }
}

fn conflicting_wires(
    site: &SocketSite,
    directives: &[Directive],
    diagnostics: &mut Vec<Diagnostic>,
) -> SocketBinding {
    for directive in directives {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::ConflictingWires,
            site.name.clone(),
            format!(
                "wire #{} conflicts with {} other wire(s) into `{}`",
                directive.index,
                directives.len() - 1,
                site.name
            ),
        ));
    }
    SocketBinding::new(site, &[], BindingState::Failed, BindingSource::Wire)
}

/// A socket never autowires its own bean, and a component socket never
/// autowires a bean of the same component.
fn is_excluded(site: &SocketSite, candidate: &Candidate) -> bool {
    match &site.owner {
        SocketOwner::Bean(bean) => &candidate.name == bean,
        SocketOwner::Component { module, .. } => candidate.component() == Some(module),
    }
}
