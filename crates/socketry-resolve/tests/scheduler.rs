//! Round scheduler behavior across modules.
//!
//! Verifies:
//! - components are built before the modules that use them
//! - completion order does not depend on submission order
//! - stalls, faulty components and preparation deferral
//! - previously compiled modules and round limits

mod common;

use common::{bean, id, module, ty, types};
use socketry_model::{
    BeanKind, BoundaryKind, DiagnosticKind, ExportedBean, Module, ModuleDeclaration, ModuleExport,
    Severity, SocketDecl, Workspace,
};
use socketry_resolve::{
    BuildConfig, GenerationError, InMemoryStore, ModuleGenerator, WaitReason,
};

fn generator() -> ModuleGenerator {
    ModuleGenerator::new(types(), BuildConfig::default())
}

fn declare(modules: impl IntoIterator<Item = Module>) -> Vec<ModuleDeclaration> {
    modules.into_iter().map(ModuleDeclaration::from).collect()
}

/// x uses y, y uses z; each module provides one bean the next one needs.
fn chain() -> Vec<Module> {
    vec![
        module("x")
            .with_component(id("y"))
            .with_bean(bean("service", "Service", &[("repo", "Repo")])),
        module("y")
            .with_component(id("z"))
            .with_bean(bean("repoImpl", "RepoImpl", &[("clock", "Clock")])),
        module("z").with_bean(bean("clock", "Clock", &[])),
    ]
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_components_finish_first() {
    let report = generator().generate(declare(chain())).unwrap();

    assert!(report.is_success(), "{:?}", report.faulty);
    assert_eq!(report.finish_order_names(), vec!["z", "y", "x"]);
    assert_eq!(report.rounds, 1);
    assert_eq!(
        report.module("x").unwrap().bound_beans("x:service:repo"),
        vec!["y:repoImpl"]
    );
    assert_eq!(
        report.module("y").unwrap().bound_beans("y:repoImpl:clock"),
        vec!["z:clock"]
    );
}

#[test]
fn test_finish_order_independent_of_submission_order() {
    let expected = generator().generate(declare(chain())).unwrap();

    let mut reversed = chain();
    reversed.reverse();
    let report = generator().generate(declare(reversed)).unwrap();
    assert_eq!(report.finish_order_names(), vec!["z", "y", "x"]);
    assert_eq!(report, expected);

    let mut rotated = chain();
    rotated.rotate_left(1);
    let report = generator().generate(declare(rotated)).unwrap();
    assert_eq!(report, expected);
}

// =============================================================================
// Fatal Scheduling Errors
// =============================================================================

#[test]
fn test_mutual_components_stall() {
    let modules = vec![
        module("x").with_component(id("y")),
        module("y").with_component(id("x")),
    ];

    let err = generator().generate(declare(modules)).unwrap_err();

    match &err {
        GenerationError::Stalled { round, pending, .. } => {
            assert_eq!(*round, 1);
            assert_eq!(pending.len(), 2);
            assert_eq!(pending[0].module, "x");
            assert_eq!(pending[0].waiting_on, vec![WaitReason::Component(id("y"))]);
            assert_eq!(pending[1].module, "y");
            assert_eq!(pending[1].waiting_on, vec![WaitReason::Component(id("x"))]);
        }
        other => panic!("expected a stall, got {other:?}"),
    }
    assert!(err.report().unwrap().finish_order.is_empty());
}

#[test]
fn test_missing_component_stalls_after_other_modules_finish() {
    let modules = vec![
        module("app").with_component(id("ghost")),
        module("lib").with_bean(bean("clock", "Clock", &[])),
    ];

    let err = generator().generate(declare(modules)).unwrap_err();

    let GenerationError::Stalled { round, pending, report } = &err else {
        panic!("expected a stall, got {err:?}");
    };
    assert_eq!(*round, 2);
    assert_eq!(pending.len(), 1);
    assert_eq!(
        pending[0].waiting_on,
        vec![WaitReason::MissingComponent(id("ghost"))]
    );
    assert_eq!(report.finish_order_names(), vec!["lib"]);
    assert!(err.to_string().contains("stalled in round 2"));
}

#[test]
fn test_duplicate_declaration_is_rejected() {
    let modules = vec![module("app"), module("app")];

    let err = generator().generate(declare(modules)).unwrap_err();

    assert!(matches!(err, GenerationError::DuplicateModule(ref name) if *name == "app"));
    assert!(err.report().is_none());
}

#[test]
fn test_declared_module_shadowing_compiled_module_is_rejected() {
    let store: InMemoryStore = [ModuleExport::new(id("lib"))].into_iter().collect();
    let generator = ModuleGenerator::with_store(types(), BuildConfig::default(), store);

    let err = generator.generate(declare([module("lib")])).unwrap_err();

    assert!(matches!(err, GenerationError::DuplicateModule(ref name) if *name == "lib"));
}

#[test]
fn test_round_limit() {
    let config = BuildConfig {
        max_rounds: 2,
        ..BuildConfig::default()
    };
    let generator = ModuleGenerator::new(types(), config);
    let modules = vec![ModuleDeclaration::new(module("slow")).with_preparation_steps(5)];

    let err = generator.generate(modules).unwrap_err();

    let GenerationError::RoundLimitExceeded { limit, report } = &err else {
        panic!("expected round limit, got {err:?}");
    };
    assert_eq!(*limit, 2);
    assert_eq!(report.rounds, 2);
    assert!(report.modules.is_empty());
}

// =============================================================================
// Faulty Components and Preparation
// =============================================================================

#[test]
fn test_faulty_component_propagates_without_building() {
    let modules = vec![
        module("app")
            .with_component(id("lib"))
            .with_bean(bean("service", "Service", &[("repo", "Repo")])),
        module("lib").with_bean(bean("repoImpl", "RepoImpl", &[("clock", "Clock")])),
    ];

    let report = generator().generate(declare(modules)).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.finish_order_names(), vec!["lib", "app"]);
    assert!(report.faulty.contains(&id("lib")));
    assert!(report.faulty.contains(&id("app")));
    assert!(report.module("lib").unwrap().faulty);
    assert!(report.module("app").is_none());
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::FaultyComponent);
    assert_eq!(report.diagnostics[0].location, "app");
    let kinds: Vec<_> = report.all_diagnostics().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![DiagnosticKind::UnresolvedSocket, DiagnosticKind::FaultyComponent]
    );
}

#[test]
fn test_preparation_defers_module_and_its_users() {
    let modules = vec![
        ModuleDeclaration::new(module("app").with_component(id("lib"))),
        ModuleDeclaration::new(module("lib")).with_preparation_steps(2),
        ModuleDeclaration::new(module("other")),
    ];

    let report = generator().generate(modules).unwrap();

    assert!(report.is_success());
    assert_eq!(report.rounds, 3);
    assert_eq!(report.finish_order_names(), vec!["other", "lib", "app"]);
}

// =============================================================================
// Compiled Modules
// =============================================================================

#[test]
fn test_compiled_component_from_workspace() {
    let compiled = ModuleExport::new(id("storage"))
        .with_bean(ExportedBean::new(id("repoImpl"), ty("RepoImpl")));
    let mut workspace = Workspace::new(types()).with_module(
        module("app")
            .with_component(id("storage"))
            .with_bean(bean("service", "Service", &[("repo", "Repo")])),
    );
    workspace.compiled.push(compiled);

    let report = ModuleGenerator::generate_workspace(workspace, BuildConfig::default()).unwrap();

    assert!(report.is_success());
    assert_eq!(report.finish_order_names(), vec!["app"]);
    assert_eq!(
        report.module("app").unwrap().bound_beans("app:service:repo"),
        vec!["storage:repoImpl"]
    );
}

#[test]
fn test_component_socket_wired_by_user_module() {
    let lib = module("lib")
        .with_bean(bean("repoImpl", "RepoImpl", &[("database", "Db")]))
        .with_socket(SocketDecl::required(id("db"), ty("Db")));
    let app = module("app")
        .with_component(id("lib"))
        .with_bean(bean("dbImpl", "Db", &[]));

    let report = generator().generate(declare([app, lib])).unwrap();

    assert!(report.is_success());
    let lib = report.module("lib").unwrap();
    let exported = lib.export.bean("repoImpl").unwrap();
    assert!(exported.reachable_sockets.contains(&id("db")));
    assert_eq!(
        lib.export.socket("db").unwrap().kind,
        BoundaryKind::Declared
    );
    assert_eq!(
        report.module("app").unwrap().bound_beans("lib:db"),
        vec!["app:dbImpl"]
    );
}

#[test]
fn test_cycle_through_component_boundary() {
    let lib = module("lib")
        .with_bean(bean("repoImpl", "RepoImpl", &[("database", "Db")]))
        .with_socket(SocketDecl::required(id("db"), ty("Db")));
    let app = module("app")
        .with_component(id("lib"))
        .with_bean(bean("dbImpl", "Db", &[("repo", "Repo")]));

    let report = generator().generate(declare([app, lib])).unwrap();

    assert!(!report.module("lib").unwrap().faulty);
    let app = report.module("app").unwrap();
    assert!(app.faulty);
    assert_eq!(app.cycles.len(), 1);
    assert!(app.is_bean_faulty("app:dbImpl"));
    assert_eq!(report.faulty.iter().map(|m| m.as_str()).collect::<Vec<_>>(), vec!["app"]);
}

#[test]
fn test_overriding_socket_left_unwired_keeps_component_bean() {
    let lib = module("lib").with_bean(bean("clock", "Clock", &[]).with_kind(BeanKind::Overridable));
    let app = module("app")
        .with_component(id("lib"))
        .with_bean(bean("service", "Service", &[]));

    let report = generator().generate(declare([app, lib])).unwrap();

    assert!(report.is_success(), "{:?}", report.faulty);
    assert_eq!(
        report.module("lib").unwrap().export.socket("clock").unwrap().kind,
        BoundaryKind::Overriding
    );
    let app = report.module("app").unwrap();
    assert!(app.bound_beans("lib:clock").is_empty());
    assert_eq!(app.warnings().count(), 0);
    assert_eq!(app.diagnostics.len(), 1);
    assert_eq!(app.diagnostics[0].severity, Severity::Note);
    assert_eq!(app.diagnostics[0].kind, DiagnosticKind::UnwiredSocket);
    assert_eq!(app.diagnostics[0].location.to_string(), "lib:clock");
}

#[test]
fn test_overriding_socket_replaced_by_user_bean() {
    let lib = module("lib")
        .with_bean(bean("clock", "Clock", &[]).with_kind(BeanKind::Overridable))
        .with_bean(bean("scheduler", "Scheduler", &[("clock", "Clock")]));
    let app = module("app")
        .with_component(id("lib"))
        .with_bean(bean("fakeClock", "Clock", &[]));

    let report = generator().generate(declare([app, lib])).unwrap();

    assert!(report.is_success(), "{:?}", report.faulty);
    assert_eq!(
        report.module("lib").unwrap().bound_beans("lib:scheduler:clock"),
        vec!["lib:clock"]
    );
    assert_eq!(
        report.module("app").unwrap().bound_beans("lib:clock"),
        vec!["app:fakeClock"]
    );
}

#[test]
fn test_mutating_socket_wired_by_user_module() {
    let lib = module("lib").with_bean(bean("props", "Props", &[]).with_kind(BeanKind::Mutator {
        mutating_type: ty("Raw"),
        optional: false,
    }));
    let app = module("app")
        .with_component(id("lib"))
        .with_bean(bean("raw", "Raw", &[]))
        .with_bean(bean("service", "Service", &[("props", "Props")]));

    let report = generator().generate(declare([app, lib])).unwrap();

    assert!(report.is_success(), "{:?}", report.faulty);
    let lib = report.module("lib").unwrap();
    assert_eq!(lib.export.socket("props").unwrap().kind, BoundaryKind::Mutating);
    assert!(lib.export.bean("props").unwrap().reachable_sockets.contains(&id("props")));
    let app = report.module("app").unwrap();
    assert_eq!(app.bound_beans("lib:props"), vec!["app:raw"]);
    assert_eq!(app.bound_beans("app:service:props"), vec!["lib:props"]);
}

#[test]
fn test_mutated_bean_consuming_its_own_mutator_is_a_cycle() {
    let lib = module("lib").with_bean(bean("props", "Props", &[]).with_kind(BeanKind::Mutator {
        mutating_type: ty("Raw"),
        optional: false,
    }));
    let app = module("app")
        .with_component(id("lib"))
        .with_bean(bean("raw", "Raw", &[("props", "Props")]));

    let report = generator().generate(declare([app, lib])).unwrap();

    assert!(!report.module("lib").unwrap().faulty);
    let app = report.module("app").unwrap();
    assert!(app.faulty);
    assert_eq!(app.cycles.len(), 1);
    assert!(app.is_bean_faulty("app:raw"));
    assert_eq!(
        app.errors().map(|d| d.kind).collect::<Vec<_>>(),
        vec![DiagnosticKind::CyclicDependency]
    );
}
