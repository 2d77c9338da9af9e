//! Module scope: what a module can see while it is being resolved.
//!
//! The scope flattens a module into two lists:
//! - candidates: every bean that may be injected (local beans, nested beans
//!   at any depth, socket beans and the public beans of components)
//! - socket sites: every socket that must be bound (sockets of local beans
//!   and the boundary sockets of components)
//!
//! Both lists keep declaration order; the resolver relies on it for
//! deterministic output. Candidates are not deduplicated by name so that
//! conflicting declarations surface as ambiguous references.

use std::collections::BTreeSet;

use serde::Serialize;
use socketry_model::{
    BoundaryKind, Identifier, Module, ModuleExport, NestedBeanDecl, QualifiedName, SocketDecl, Tag,
    TypeRef,
};

/// A bean that may be injected into a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: QualifiedName,
    /// Exposed type used for wiring
    pub ty: TypeRef,
    pub tags: Vec<Tag>,
    pub origin: CandidateOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOrigin {
    /// A bean declared in the module
    Local,
    /// Read through an accessor on `provider`
    Nested { provider: QualifiedName },
    /// One of the module's own sockets
    SocketBean,
    /// A public bean of a component module
    Component {
        module: Identifier,
        reachable_sockets: BTreeSet<Identifier>,
    },
}

impl Candidate {
    pub fn is_socket_bean(&self) -> bool {
        matches!(self.origin, CandidateOrigin::SocketBean)
    }

    pub fn component(&self) -> Option<&Identifier> {
        match &self.origin {
            CandidateOrigin::Component { module, .. } => Some(module),
            _ => None,
        }
    }
}

/// Who a socket belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketOwner {
    /// A construction socket of a local bean
    Bean(QualifiedName),
    /// A boundary socket of a component module
    Component {
        module: Identifier,
        kind: BoundaryKind,
    },
}

/// A socket that must be bound while building the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketSite {
    /// `module:bean:socket` or `component:socket`
    pub name: QualifiedName,
    pub decl: SocketDecl,
    pub owner: SocketOwner,
}

/// Candidates and socket sites of one module.
#[derive(Debug, Clone)]
pub struct ModuleScope {
    pub module: Identifier,
    pub candidates: Vec<Candidate>,
    pub sites: Vec<SocketSite>,
    pub components: Vec<Identifier>,
}

impl ModuleScope {
    /// Build the scope of `module`.
    ///
    /// `exports` are matched to the module's components by name; exports of
    /// modules that are not components are ignored.
    pub fn new(module: &Module, exports: &[&ModuleExport]) -> Self {
        let name = &module.name;
        let mut candidates = Vec::new();
        let mut sites = Vec::new();

        for bean in &module.beans {
            let bean_name = QualifiedName::bean(name, &bean.name);
            candidates.push(Candidate {
                name: bean_name.clone(),
                ty: bean.exposed_type().clone(),
                tags: bean.tags.clone(),
                origin: CandidateOrigin::Local,
            });
            collect_nested(name, &bean.name, &bean_name, &bean.nested, &mut candidates);

            for socket in &bean.sockets {
                sites.push(SocketSite {
                    name: QualifiedName::socket(name, &bean.name, &socket.name),
                    decl: socket.clone(),
                    owner: SocketOwner::Bean(bean_name.clone()),
                });
            }
        }

        for socket in &module.sockets {
            candidates.push(Candidate {
                name: QualifiedName::bean(name, &socket.name),
                ty: socket.container_type(),
                tags: Vec::new(),
                origin: CandidateOrigin::SocketBean,
            });
        }

        for component in &module.components {
            let Some(export) = exports.iter().find(|e| &e.name == component) else {
                continue;
            };
            for bean in &export.beans {
                candidates.push(Candidate {
                    name: export.qualify(&bean.name),
                    ty: bean.ty.clone(),
                    tags: bean.tags.clone(),
                    origin: CandidateOrigin::Component {
                        module: component.clone(),
                        reachable_sockets: bean.reachable_sockets.clone(),
                    },
                });
            }
            for socket in &export.sockets {
                sites.push(SocketSite {
                    name: export.qualify(socket.name()),
                    decl: socket.decl.clone(),
                    owner: SocketOwner::Component {
                        module: component.clone(),
                        kind: socket.kind,
                    },
                });
            }
        }

        Self {
            module: name.clone(),
            candidates,
            sites,
            components: module.components.clone(),
        }
    }

    /// Every candidate with the given name, in declaration order.
    pub fn candidates_named(&self, name: &QualifiedName) -> Vec<&Candidate> {
        self.candidates.iter().filter(|c| &c.name == name).collect()
    }

    pub fn candidate(&self, name: &QualifiedName) -> Option<&Candidate> {
        self.candidates.iter().find(|c| &c.name == name)
    }

    pub fn site(&self, name: &QualifiedName) -> Option<&SocketSite> {
        self.sites.iter().find(|s| &s.name == name)
    }

    pub fn is_component(&self, name: &Identifier) -> bool {
        self.components.contains(name)
    }
}

fn collect_nested(
    module: &Identifier,
    parent: &Identifier,
    provider: &QualifiedName,
    nested: &[NestedBeanDecl],
    out: &mut Vec<Candidate>,
) {
    for decl in nested {
        let local = parent.nested(&decl.accessor);
        let name = QualifiedName::bean(module, &local);
        out.push(Candidate {
            name: name.clone(),
            ty: decl.ty.clone(),
            tags: Vec::new(),
            origin: CandidateOrigin::Nested {
                provider: provider.clone(),
            },
        });
        collect_nested(module, &local, &name, &decl.nested, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socketry_model::{BeanDecl, ExportedBean, MultiKind};

    fn id(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    fn qn(s: &str) -> QualifiedName {
        QualifiedName::parse(s).unwrap()
    }

    #[test]
    fn test_scope_flattens_module() {
        let module = Module::new(id("app"))
            .with_bean(
                BeanDecl::new(id("service"), TypeRef::named("Service"))
                    .with_socket(SocketDecl::required(id("repo"), TypeRef::named("Repo")))
                    .with_nested(
                        NestedBeanDecl::new(id("config"), TypeRef::named("Config")).with_nested(
                            NestedBeanDecl::new(id("url"), TypeRef::named("Url")),
                        ),
                    ),
            )
            .with_socket(
                SocketDecl::required(id("plugins"), TypeRef::named("Plugin")).multi(MultiKind::List),
            )
            .with_component(id("storage"));

        let storage = ModuleExport::new(id("storage"))
            .with_bean(ExportedBean::new(id("repo"), TypeRef::named("Repo")).reaching(id("db")))
            .with_socket(
                SocketDecl::required(id("db"), TypeRef::named("Db")),
                BoundaryKind::Declared,
            );
        let unrelated = ModuleExport::new(id("other"));

        let scope = ModuleScope::new(&module, &[&storage, &unrelated]);

        let names: Vec<_> = scope.candidates.iter().map(|c| c.name.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "app:service",
                "app:service.config",
                "app:service.config.url",
                "app:plugins",
                "storage:repo"
            ]
        );
        assert_eq!(
            scope.candidate(&qn("app:service.config.url")).unwrap().origin,
            CandidateOrigin::Nested {
                provider: qn("app:service.config")
            }
        );
        assert_eq!(scope.candidate(&qn("app:plugins")).unwrap().ty.to_string(), "List<Plugin>");
        assert_eq!(
            scope.candidate(&qn("storage:repo")).unwrap().component(),
            Some(&id("storage"))
        );

        let sites: Vec<_> = scope.sites.iter().map(|s| s.name.to_string()).collect();
        assert_eq!(sites, vec!["app:service:repo", "storage:db"]);
        assert!(scope.is_component(&id("storage")));
        assert!(!scope.is_component(&id("other")));
    }
}
