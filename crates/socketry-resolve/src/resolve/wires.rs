//! Wire directives
//!
//! Turns the surface syntax of [`WireDecl`] into socket sites and candidate
//! beans of a [`ModuleScope`].
//!
//! Targets:
//! - `module:bean:socket` (module must be the current module)
//! - `component:socket` (boundary socket of a component module)
//! - `bean:socket` (current module implied)
//!
//! Sources: `bean`, `bean.accessor` or `module:bean`.

use indexmap::IndexMap;
use socketry_model::{Diagnostic, DiagnosticKind, DiagnosticSink, QualifiedName, WireDecl};
use tracing::debug;

use super::scope::{Candidate, ModuleScope};

/// A validated wire directive attached to one socket site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Position of the wire in the module's wire list
    pub index: usize,
    /// Bean references in surface syntax, deduplicated
    pub beans: Vec<String>,
}

/// Group the module's wires by target socket site.
///
/// Wires whose target cannot be resolved are reported and dropped. Empty
/// wires are reported but kept so that their socket stays unresolved.
pub fn collect_directives(
    scope: &ModuleScope,
    wires: &[WireDecl],
    sink: &mut impl DiagnosticSink,
) -> IndexMap<QualifiedName, Vec<Directive>> {
    let mut directives: IndexMap<QualifiedName, Vec<Directive>> = IndexMap::new();

    for (index, wire) in wires.iter().enumerate() {
        let site = match resolve_target(scope, &wire.into) {
            Ok(site) => site,
            Err(diagnostic) => {
                sink.report(diagnostic);
                continue;
            }
        };

        if wire.beans.is_empty() {
            sink.report(Diagnostic::new(
                DiagnosticKind::InvalidWire,
                site.clone(),
                format!("wire #{} into `{}` names no bean", index, wire.into),
            ));
        }

        let mut beans: Vec<String> = Vec::with_capacity(wire.beans.len());
        for bean in &wire.beans {
            if beans.contains(bean) {
                sink.report(Diagnostic::warning(
                    DiagnosticKind::DuplicateWiredBean,
                    site.clone(),
                    format!("bean `{}` is named more than once in wire #{}", bean, index),
                ));
            } else {
                beans.push(bean.clone());
            }
        }

        debug!(wire = index, site = %site, beans = beans.len(), "wire directive");
        directives
            .entry(site)
            .or_default()
            .push(Directive { index, beans });
    }

    directives
}

/// Resolve a wire target to the qualified name of a socket site.
pub fn resolve_target(scope: &ModuleScope, raw: &str) -> Result<QualifiedName, Diagnostic> {
    let module = QualifiedName::of_module(&scope.module);
    let parsed = QualifiedName::parse(raw).map_err(|e| {
        Diagnostic::new(
            DiagnosticKind::InvalidName,
            module.clone(),
            format!("invalid wire target `{}`: {}", raw, e),
        )
    })?;

    let site = match parsed.parts() {
        [owner, bean, socket] => {
            if owner != &scope.module {
                return Err(Diagnostic::new(
                    DiagnosticKind::UnknownSocket,
                    module,
                    format!(
                        "wire target `{}` belongs to module `{}`, not `{}`",
                        raw, owner, scope.module
                    ),
                ));
            }
            QualifiedName::socket(owner, bean, socket)
        }
        [owner, socket] if scope.is_component(owner) => QualifiedName::bean(owner, socket),
        // A bean may share the module's name; its socket sites take precedence.
        [owner, socket]
            if owner == &scope.module
                && scope.site(&QualifiedName::socket(owner, owner, socket)).is_none() =>
        {
            return Err(Diagnostic::new(
                DiagnosticKind::InvalidWire,
                module,
                format!(
                    "wire target `{}` is a socket of the module itself; it is provided by the enclosing module",
                    raw
                ),
            ));
        }
        [bean, socket] => QualifiedName::socket(&scope.module, bean, socket),
        _ => {
            return Err(Diagnostic::new(
                DiagnosticKind::InvalidWire,
                module,
                format!("wire target `{}` does not name a socket", raw),
            ));
        }
    };

    if scope.site(&site).is_none() {
        return Err(Diagnostic::new(
            DiagnosticKind::UnknownSocket,
            module,
            format!("wire target `{}` names no known socket", raw),
        ));
    }
    Ok(site)
}

/// Resolve a wire source to exactly one visible candidate.
pub fn resolve_source<'s>(
    scope: &'s ModuleScope,
    raw: &str,
    site: &QualifiedName,
) -> Result<&'s Candidate, Diagnostic> {
    let parsed = QualifiedName::parse(raw).map_err(|e| {
        Diagnostic::new(
            DiagnosticKind::InvalidName,
            site.clone(),
            format!("invalid bean reference `{}`: {}", raw, e),
        )
    })?;

    let name = match parsed.len() {
        1 => QualifiedName::bean(&scope.module, parsed.simple_name()),
        2 => parsed,
        _ => {
            return Err(Diagnostic::new(
                DiagnosticKind::InvalidName,
                site.clone(),
                format!("bean reference `{}` has too many parts", raw),
            ));
        }
    };

    let matches = scope.candidates_named(&name);
    match matches.as_slice() {
        [] => Err(Diagnostic::new(
            DiagnosticKind::UnknownBean,
            site.clone(),
            format!("no visible bean named `{}`", raw),
        )),
        [candidate] => Ok(*candidate),
        several => {
            let mut diagnostic = Diagnostic::new(
                DiagnosticKind::AmbiguousBean,
                site.clone(),
                format!("`{}` matches {} visible beans", raw, several.len()),
            );
            for candidate in several {
                diagnostic = diagnostic.with_label(candidate.name.clone(), "declared here".into());
            }
            Err(diagnostic)
        }
    }
}
