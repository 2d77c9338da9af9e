//! Name conflict validation.
//!
//! Inside a module, beans, nested beans, the module's own sockets and
//! component modules share one namespace: wires refer to all of them by
//! simple name. Sockets of one bean form a second, per-bean namespace.
//! Every entity involved in a collision is reported, not just the later one.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use socketry_model::{
    Diagnostic, DiagnosticKind, DiagnosticSink, Identifier, Module, NestedBeanDecl, QualifiedName,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntityKind {
    Bean,
    NestedBean,
    Socket,
    Component,
    BeanSocket,
}

impl EntityKind {
    fn describe(self) -> &'static str {
        match self {
            EntityKind::Bean => "bean",
            EntityKind::NestedBean => "nested bean",
            EntityKind::Socket => "socket",
            EntityKind::Component => "component module",
            EntityKind::BeanSocket => "bean socket",
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    kind: EntityKind,
    location: QualifiedName,
    /// Local bean made faulty by a conflict on this entry
    bean: Option<QualifiedName>,
}

/// Validates that no two locally visible entities share a simple name.
///
/// Returns the local beans involved in a conflict.
pub fn validate_names(module: &Module, sink: &mut impl DiagnosticSink) -> BTreeSet<QualifiedName> {
    let name = &module.name;
    let mut namespace: IndexMap<String, Vec<Entry>> = IndexMap::new();
    let mut faulty = BTreeSet::new();

    let mut register = |key: &Identifier, entry: Entry| {
        namespace.entry(key.to_string()).or_default().push(entry);
    };

    for bean in &module.beans {
        let bean_name = QualifiedName::bean(name, &bean.name);
        register(
            &bean.name,
            Entry {
                kind: EntityKind::Bean,
                location: bean_name.clone(),
                bean: Some(bean_name.clone()),
            },
        );
        let mut nested = Vec::new();
        collect_nested(&bean.name, &bean.nested, &mut nested);
        for local in nested {
            register(
                &local,
                Entry {
                    kind: EntityKind::NestedBean,
                    location: QualifiedName::bean(name, &local),
                    bean: Some(bean_name.clone()),
                },
            );
        }
    }
    for socket in &module.sockets {
        register(
            &socket.name,
            Entry {
                kind: EntityKind::Socket,
                location: QualifiedName::bean(name, &socket.name),
                bean: None,
            },
        );
    }
    for component in &module.components {
        register(
            component,
            Entry {
                kind: EntityKind::Component,
                location: QualifiedName::bean(name, component),
                bean: None,
            },
        );
    }

    for (simple, entries) in &namespace {
        report_collisions(simple, entries, sink, &mut faulty);
    }

    for bean in &module.beans {
        let bean_name = QualifiedName::bean(name, &bean.name);
        let mut sockets: IndexMap<String, Vec<Entry>> = IndexMap::new();
        for socket in &bean.sockets {
            sockets.entry(socket.name.to_string()).or_default().push(Entry {
                kind: EntityKind::BeanSocket,
                location: QualifiedName::socket(name, &bean.name, &socket.name),
                bean: Some(bean_name.clone()),
            });
        }
        for (simple, entries) in &sockets {
            report_collisions(simple, entries, sink, &mut faulty);
        }
    }

    faulty
}

fn report_collisions(
    simple: &str,
    entries: &[Entry],
    sink: &mut impl DiagnosticSink,
    faulty: &mut BTreeSet<QualifiedName>,
) {
    if entries.len() < 2 {
        return;
    }
    for (i, entry) in entries.iter().enumerate() {
        let mut diagnostic = Diagnostic::new(
            DiagnosticKind::NameConflict,
            entry.location.clone(),
            format!(
                "{} `{}` conflicts with {} other declaration(s) of the same name",
                entry.kind.describe(),
                simple,
                entries.len() - 1
            ),
        );
        for (j, other) in entries.iter().enumerate() {
            if i != j {
                diagnostic = diagnostic.with_label(
                    other.location.clone(),
                    format!("{} declared here", other.kind.describe()),
                );
            }
        }
        sink.report(diagnostic);
        if let Some(bean) = &entry.bean {
            faulty.insert(bean.clone());
        }
    }
}

fn collect_nested(parent: &Identifier, nested: &[NestedBeanDecl], out: &mut Vec<Identifier>) {
    for decl in nested {
        let local = parent.nested(&decl.accessor);
        out.push(local.clone());
        collect_nested(&local, &decl.nested, out);
    }
}
