//! Module builder.
//!
//! Runs the per-module passes in order and collects their diagnostics:
//!
//! ```text
//! Name conflicts → Socket resolution → Cycle check → Export → Unwired warnings
//! ```
//!
//! No pass aborts the build; a module is faulty iff any pass reported an
//! error.

use std::collections::BTreeSet;

use socketry_model::{
    has_errors, BeanKind, BoundaryKind, Diagnostic, DiagnosticKind, ExportedBean, Identifier,
    Module, ModuleExport, NestedBeanDecl, QualifiedName, TypeHierarchy,
};
use tracing::{debug, instrument};

use super::cycles::{check_cycles, DependencyGraph, NodeId};
use super::names::validate_names;
use super::scope::{ModuleScope, SocketOwner};
use super::sockets::{BindingState, SocketBinding, SocketResolver};
use super::wiring::WiringStrategies;
use crate::config::BuildConfig;
use crate::resolved::ResolvedModule;

/// Builds one module against the exports of its components.
#[derive(Debug)]
pub struct ModuleBuilder {
    types: TypeHierarchy,
    strategies: WiringStrategies,
    config: BuildConfig,
}

impl ModuleBuilder {
    pub fn new(types: TypeHierarchy, config: BuildConfig) -> Self {
        Self {
            types,
            strategies: WiringStrategies::standard(),
            config,
        }
    }

    /// Replace the wiring strategies (the standard set by default).
    pub fn with_strategies(mut self, strategies: WiringStrategies) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn types(&self) -> &TypeHierarchy {
        &self.types
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Resolve `module`.
    ///
    /// `components` must hold the export of every component the module
    /// lists; a missing export is reported as a faulty component.
    #[instrument(skip_all, fields(module = %module.name))]
    pub fn build(&self, module: &Module, components: &[&ModuleExport]) -> ResolvedModule {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();

        // 1. Name conflicts
        let mut faulty_beans = validate_names(module, &mut diagnostics);
        for component in &module.components {
            if !components.iter().any(|export| &export.name == component) {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::FaultyComponent,
                    QualifiedName::bean(&module.name, component),
                    format!("component module `{}` has no export", component),
                ));
            }
        }

        // 2. Socket resolution
        let scope = ModuleScope::new(module, components);
        debug!(
            candidates = scope.candidates.len(),
            sites = scope.sites.len(),
            "scope built"
        );
        let mut resolution = SocketResolver::new(&scope, &self.types, &self.strategies)
            .resolve(&module.wires, &mut diagnostics);
        faulty_beans.extend(std::mem::take(&mut resolution.faulty_beans));

        // 3. Cycle check
        let graph = DependencyGraph::build(module, &scope, &resolution.bindings);
        let cycle_report = check_cycles(&graph, &module.name, &mut diagnostics);
        faulty_beans.extend(cycle_report.faulty_beans);
        for binding in resolution.bindings.values_mut() {
            binding.reaches = graph.binding_reach(binding, &module.name);
        }

        // 4. Export; reachability is only meaningful on an acyclic graph
        let export = export_module(module, &graph, cycle_report.cycles.is_empty());

        // 5. Unwired sockets
        if self.config.warn_unwired {
            for binding in resolution.bindings.values() {
                if let Some(diagnostic) = unwired_diagnostic(binding) {
                    diagnostics.push(diagnostic);
                }
            }
        }

        let faulty = has_errors(&diagnostics);
        debug!(
            faulty,
            faulty_beans = faulty_beans.len(),
            cycles = cycle_report.cycles.len(),
            diagnostics = diagnostics.len(),
            "module resolved"
        );

        ResolvedModule {
            name: module.name.clone(),
            bindings: resolution.bindings,
            cycles: cycle_report.cycles,
            faulty_beans,
            faulty,
            diagnostics,
            export,
        }
    }
}

fn unwired_diagnostic(binding: &SocketBinding) -> Option<Diagnostic> {
    if binding.state != BindingState::Unwired {
        return None;
    }
    // An empty overriding socket keeps the component's own bean.
    if let SocketOwner::Component {
        kind: BoundaryKind::Overriding,
        ..
    } = binding.owner
    {
        return Some(Diagnostic::note(
            DiagnosticKind::UnwiredSocket,
            binding.socket.clone(),
            format!("`{}` keeps the component's own bean", binding.socket),
        ));
    }
    let message = if binding.multi {
        format!("no bean matches multi-socket `{}`", binding.socket)
    } else {
        format!("optional socket `{}` is left unwired", binding.socket)
    };
    Some(Diagnostic::warning(
        DiagnosticKind::UnwiredSocket,
        binding.socket.clone(),
        message,
    ))
}

fn export_module(module: &Module, graph: &DependencyGraph, propagate: bool) -> ModuleExport {
    let reachable = |local: &Identifier| {
        if propagate {
            graph.reachable_boundaries(
                &NodeId::Bean(QualifiedName::bean(&module.name, local)),
                &module.name,
            )
        } else {
            BTreeSet::new()
        }
    };

    let mut export = ModuleExport::new(module.name.clone());
    for bean in module.beans.iter().filter(|b| b.is_public()) {
        export.beans.push(ExportedBean {
            name: bean.name.clone(),
            ty: bean.exposed_type().clone(),
            tags: bean.tags.clone(),
            provider: None,
            reachable_sockets: reachable(&bean.name),
        });
        export_nested(&bean.name, &bean.nested, &reachable, &mut export);
    }

    for socket in &module.sockets {
        export = export.with_socket(socket.clone(), BoundaryKind::Declared);
    }
    for bean in &module.beans {
        let Some(socket) = bean.boundary_socket() else {
            continue;
        };
        let kind = match bean.kind {
            BeanKind::Mutator { .. } => BoundaryKind::Mutating,
            _ => BoundaryKind::Overriding,
        };
        export = export.with_socket(socket, kind);
    }
    export
}

fn export_nested(
    parent: &Identifier,
    nested: &[NestedBeanDecl],
    reachable: &impl Fn(&Identifier) -> BTreeSet<Identifier>,
    export: &mut ModuleExport,
) {
    for decl in nested {
        let local = parent.nested(&decl.accessor);
        export.beans.push(ExportedBean {
            name: local.clone(),
            ty: decl.ty.clone(),
            tags: Vec::new(),
            provider: Some(parent.clone()),
            reachable_sockets: reachable(&local),
        });
        export_nested(&local, &decl.nested, reachable, export);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socketry_model::{BeanDecl, MultiKind, Severity, SocketDecl, TypeRef, WireDecl};

    fn id(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    fn builder() -> ModuleBuilder {
        let mut types = TypeHierarchy::with_collections();
        types.declare("RepoImpl", "Repo");
        ModuleBuilder::new(types, BuildConfig::default())
    }

    #[test]
    fn test_clean_module() {
        let module = Module::new(id("app"))
            .with_bean(
                BeanDecl::new(id("service"), TypeRef::named("Service"))
                    .with_socket(SocketDecl::required(id("repo"), TypeRef::named("Repo"))),
            )
            .with_bean(BeanDecl::new(id("repoImpl"), TypeRef::named("RepoImpl")).private());
        let resolved = builder().build(&module, &[]);

        assert!(!resolved.faulty);
        assert!(resolved.diagnostics.is_empty());
        assert_eq!(resolved.bound_beans("app:service:repo"), vec!["app:repoImpl"]);
        let exported: Vec<_> = resolved.export.beans.iter().map(|b| b.name.to_string()).collect();
        assert_eq!(exported, vec!["service"]);
    }

    #[test]
    fn test_unwired_warning_is_configurable() {
        let module = Module::new(id("app")).with_bean(
            BeanDecl::new(id("service"), TypeRef::named("Service"))
                .with_socket(SocketDecl::optional(id("cache"), TypeRef::named("Cache")))
                .with_socket(
                    SocketDecl::required(id("plugins"), TypeRef::named("Plugin"))
                        .multi(MultiKind::List),
                ),
        );

        let resolved = builder().build(&module, &[]);
        assert!(!resolved.faulty);
        assert_eq!(resolved.warnings().count(), 2);
        assert!(resolved
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::UnwiredSocket && d.severity == Severity::Warning));

        let quiet = ModuleBuilder::new(
            TypeHierarchy::new(),
            BuildConfig {
                warn_unwired: false,
                ..BuildConfig::default()
            },
        );
        assert!(quiet.build(&module, &[]).diagnostics.is_empty());
    }

    #[test]
    fn test_conflict_faults_module() {
        let module = Module::new(id("app"))
            .with_bean(BeanDecl::new(id("db"), TypeRef::named("Db")))
            .with_socket(SocketDecl::required(id("db"), TypeRef::named("Db")));
        let resolved = builder().build(&module, &[]);

        assert!(resolved.faulty);
        assert!(resolved.is_bean_faulty("app:db"));
        assert_eq!(resolved.errors().count(), 2);
    }

    #[test]
    fn test_export_boundary_sockets_and_reachability() {
        let module = Module::new(id("app"))
            .with_bean(
                BeanDecl::new(id("service"), TypeRef::named("Service"))
                    .with_socket(SocketDecl::required(id("db"), TypeRef::named("Db")))
                    .with_nested(socketry_model::NestedBeanDecl::new(
                        id("stats"),
                        TypeRef::named("Stats"),
                    )),
            )
            .with_bean(
                BeanDecl::new(id("clock"), TypeRef::named("Clock"))
                    .with_kind(BeanKind::Overridable),
            )
            .with_bean(
                BeanDecl::new(id("props"), TypeRef::named("Props"))
                    .private()
                    .with_kind(BeanKind::Mutator {
                        mutating_type: TypeRef::named("Raw"),
                        optional: true,
                    }),
            )
            .with_socket(SocketDecl::required(id("db"), TypeRef::named("Db")));
        let resolved = builder().build(&module, &[]);
        let export = &resolved.export;

        let service = export.bean("service").unwrap();
        assert_eq!(service.reachable_sockets.iter().cloned().collect::<Vec<_>>(), vec![id("db")]);
        let stats = export.bean("service.stats").unwrap();
        assert_eq!(stats.provider, Some(id("service")));
        assert!(stats.reachable_sockets.contains(&id("db")));
        let clock = export.bean("clock").unwrap();
        assert!(clock.reachable_sockets.contains(&id("clock")));
        assert!(export.bean("props").is_none());

        let sockets: Vec<_> = export
            .sockets
            .iter()
            .map(|s| (s.name().to_string(), s.kind))
            .collect();
        assert_eq!(
            sockets,
            vec![
                ("db".to_string(), BoundaryKind::Declared),
                ("clock".to_string(), BoundaryKind::Overriding),
                ("props".to_string(), BoundaryKind::Mutating),
            ]
        );
    }

    #[test]
    fn test_cycle_suppresses_reachability() {
        let module = Module::new(id("app"))
            .with_bean(
                BeanDecl::new(id("service"), TypeRef::named("Service"))
                    .with_socket(SocketDecl::required(id("helper"), TypeRef::named("Helper")))
                    .with_socket(SocketDecl::required(id("db"), TypeRef::named("Db"))),
            )
            .with_bean(
                BeanDecl::new(id("helper"), TypeRef::named("Helper"))
                    .with_socket(SocketDecl::required(id("service"), TypeRef::named("Service"))),
            )
            .with_socket(SocketDecl::required(id("db"), TypeRef::named("Db")));
        let resolved = builder().build(&module, &[]);

        assert!(resolved.faulty);
        assert_eq!(resolved.cycles.len(), 1);
        assert!(resolved
            .export
            .beans
            .iter()
            .all(|b| b.reachable_sockets.is_empty()));
    }

    #[test]
    fn test_binding_reaches_boundary_sockets_transitively() {
        let module = Module::new(id("app"))
            .with_bean(
                BeanDecl::new(id("service"), TypeRef::named("Service"))
                    .with_socket(SocketDecl::required(id("helper"), TypeRef::named("Helper"))),
            )
            .with_bean(
                BeanDecl::new(id("helper"), TypeRef::named("Helper"))
                    .with_socket(SocketDecl::required(id("db"), TypeRef::named("Db")))
                    .with_socket(SocketDecl::required(id("clock"), TypeRef::named("Clock")).lazy()),
            )
            .with_socket(SocketDecl::required(id("db"), TypeRef::named("Db")))
            .with_socket(SocketDecl::required(id("clock"), TypeRef::named("Clock")));
        let resolved = builder().build(&module, &[]);
        let reaches = |socket: &str| {
            resolved
                .binding(socket)
                .unwrap()
                .reaches
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        };

        assert!(!resolved.faulty, "{:?}", resolved.diagnostics);
        assert_eq!(reaches("app:service:helper"), vec!["app:db"]);
        assert_eq!(reaches("app:helper:db"), vec!["app:db"]);
        assert_eq!(reaches("app:helper:clock"), vec!["app:clock"]);
    }

    #[test]
    fn test_custom_strategies() {
        let module = Module::new(id("app"))
            .with_bean(
                BeanDecl::new(id("service"), TypeRef::named("Service"))
                    .with_socket(SocketDecl::required(id("repo"), TypeRef::named("Repo"))),
            )
            .with_bean(BeanDecl::new(id("clock"), TypeRef::named("Clock")));

        assert!(builder().build(&module, &[]).faulty);

        let permissive = builder().with_strategies(WiringStrategies::empty());
        let resolved = permissive.build(&module, &[]);
        assert!(!resolved.faulty, "{:?}", resolved.diagnostics);
        assert_eq!(resolved.bound_beans("app:service:repo"), vec!["app:clock"]);
    }

    #[test]
    fn test_missing_component_export() {
        let module = Module::new(id("app"))
            .with_component(id("lib"))
            .with_wire(WireDecl::new(["x"], "lib:db"));
        let resolved = builder().build(&module, &[]);

        assert!(resolved.faulty);
        let kinds: Vec<_> = resolved.errors().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![DiagnosticKind::FaultyComponent, DiagnosticKind::UnknownSocket]
        );
    }
}
