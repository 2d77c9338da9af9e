//! Cross-module round scheduler.
//!
//! Modules may only be built once all their components are built. The
//! generator runs rounds until every declared module is finished or faulty:
//!
//! - each round visits pending modules in name order and builds those whose
//!   components are ready, building pending components first (depth-first,
//!   at most once per round)
//! - a module (or a component it needs) still awaiting external preparation
//!   is deferred; preparations advance by one step at the end of each round
//! - a module whose component is faulty becomes faulty without being built
//! - a round without any progress is fatal: the remaining modules wait on
//!   each other or on modules nobody declared
//!
//! All scheduler state lives in [`WorkspaceState`] and is threaded through
//! the round functions explicitly.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use socketry_model::{
    Diagnostic, DiagnosticKind, Identifier, ModuleDeclaration, ModuleExport, QualifiedName,
    TypeHierarchy, Workspace,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::builder::ModuleBuilder;
use crate::config::BuildConfig;
use crate::resolved::ResolvedModule;
use crate::store::{CompiledModuleStore, EmptyStore, InMemoryStore};

/// Fatal generation errors.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("module `{0}` is declared more than once")]
    DuplicateModule(Identifier),

    #[error("generation stalled in round {round}: {} module(s) cannot make progress", .pending.len())]
    Stalled {
        round: usize,
        pending: Vec<StalledModule>,
        report: Box<GenerationReport>,
    },

    #[error("generation did not finish within {limit} rounds")]
    RoundLimitExceeded {
        limit: usize,
        report: Box<GenerationReport>,
    },
}

impl GenerationError {
    /// The partial report, if generation got far enough to have one.
    pub fn report(&self) -> Option<&GenerationReport> {
        match self {
            GenerationError::DuplicateModule(_) => None,
            GenerationError::Stalled { report, .. }
            | GenerationError::RoundLimitExceeded { report, .. } => Some(&**report),
        }
    }
}

/// Why a pending module could not be built in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitReason {
    /// The module still awaits external preparation
    Preparation { remaining: u32 },
    /// A component is pending and could not be built this round
    Component(Identifier),
    /// A component is neither declared nor previously compiled
    MissingComponent(Identifier),
}

impl fmt::Display for WaitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitReason::Preparation { remaining } => {
                write!(f, "preparation ({} step(s) left)", remaining)
            }
            WaitReason::Component(name) => write!(f, "component `{}`", name),
            WaitReason::MissingComponent(name) => write!(f, "unknown module `{}`", name),
        }
    }
}

/// A module left pending by a stalled round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StalledModule {
    pub module: Identifier,
    pub waiting_on: Vec<WaitReason>,
}

impl fmt::Display for StalledModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` waits on ", self.module)?;
        for (i, reason) in self.waiting_on.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", reason)?;
        }
        Ok(())
    }
}

/// Result of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Built modules in completion order
    pub modules: IndexMap<Identifier, ResolvedModule>,
    /// Modules that are faulty, built or not
    pub faulty: BTreeSet<Identifier>,
    /// Every completed module (finished or faulty) in completion order
    pub finish_order: Vec<Identifier>,
    pub rounds: usize,
    /// Diagnostics not attached to a built module
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.faulty.is_empty()
    }

    pub fn module(&self, name: &str) -> Option<&ResolvedModule> {
        self.modules.iter().find(|(n, _)| n.as_str() == name).map(|(_, m)| m)
    }

    /// Every diagnostic: per module in completion order, then scheduler ones.
    pub fn all_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.modules
            .values()
            .flat_map(|m| m.diagnostics.iter())
            .chain(self.diagnostics.iter())
    }

    pub fn finish_order_names(&self) -> Vec<String> {
        self.finish_order.iter().map(ToString::to_string).collect()
    }
}

/// Scheduler state threaded through rounds.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceState {
    pub finished: BTreeSet<Identifier>,
    pub faulty: BTreeSet<Identifier>,
    pub pending: BTreeMap<Identifier, ModuleDeclaration>,
    pub report: GenerationReport,
}

impl WorkspaceState {
    /// Seed the state; rejects duplicate declarations.
    pub fn new(modules: Vec<ModuleDeclaration>) -> Result<Self, GenerationError> {
        let mut pending = BTreeMap::new();
        for declaration in modules {
            let name = declaration.name().clone();
            if pending.contains_key(&name) {
                return Err(GenerationError::DuplicateModule(name));
            }
            pending.insert(name, declaration);
        }
        Ok(Self {
            pending,
            ..Self::default()
        })
    }

    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }

    fn complete(&mut self, resolved: ResolvedModule) {
        let name = resolved.name.clone();
        self.pending.remove(&name);
        if resolved.faulty {
            self.faulty.insert(name.clone());
            self.report.faulty.insert(name.clone());
        } else {
            self.finished.insert(name.clone());
        }
        self.report.finish_order.push(name.clone());
        self.report.modules.insert(name, resolved);
    }

    fn fail(&mut self, name: &Identifier, diagnostic: Diagnostic) {
        self.pending.remove(name);
        self.faulty.insert(name.clone());
        self.report.faulty.insert(name.clone());
        self.report.finish_order.push(name.clone());
        self.report.diagnostics.push(diagnostic);
    }
}

/// What happened to a module when it was attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Attempt {
    Finished,
    Faulty,
    Deferred,
}

/// Per-round bookkeeping.
#[derive(Debug, Default)]
struct Round {
    visited: BTreeSet<Identifier>,
    waiting: BTreeMap<Identifier, Vec<WaitReason>>,
    progressed: bool,
}

/// Schedules module builds across a workspace.
#[derive(Debug)]
pub struct ModuleGenerator<S = EmptyStore> {
    builder: ModuleBuilder,
    store: S,
}

impl ModuleGenerator<EmptyStore> {
    pub fn new(types: TypeHierarchy, config: BuildConfig) -> Self {
        Self::with_store(types, config, EmptyStore)
    }
}

impl ModuleGenerator<InMemoryStore> {
    /// A generator for a whole workspace; its compiled exports seed the store.
    pub fn for_workspace(workspace: &Workspace, config: BuildConfig) -> Self {
        let store = workspace.compiled.iter().cloned().collect();
        Self::with_store(workspace.types.clone(), config, store)
    }

    /// Generate every module of a workspace.
    pub fn generate_workspace(
        workspace: Workspace,
        config: BuildConfig,
    ) -> Result<GenerationReport, GenerationError> {
        Self::for_workspace(&workspace, config).generate(workspace.modules)
    }
}

impl<S: CompiledModuleStore> ModuleGenerator<S> {
    pub fn with_store(types: TypeHierarchy, config: BuildConfig, store: S) -> Self {
        Self {
            builder: ModuleBuilder::new(types, config),
            store,
        }
    }

    pub fn builder(&self) -> &ModuleBuilder {
        &self.builder
    }

    /// Build every module, or fail if scheduling cannot finish.
    pub fn generate(
        &self,
        modules: Vec<ModuleDeclaration>,
    ) -> Result<GenerationReport, GenerationError> {
        let mut state = WorkspaceState::new(modules)?;
        for name in state.pending.keys() {
            if self.store.contains(name) {
                return Err(GenerationError::DuplicateModule(name.clone()));
            }
        }

        let limit = self.builder.config().max_rounds;
        info!(modules = state.pending.len(), "generation starting");

        while !state.is_done() {
            let round = state.report.rounds + 1;
            if round > limit {
                warn!(limit, pending = state.pending.len(), "round limit exceeded");
                return Err(GenerationError::RoundLimitExceeded {
                    limit,
                    report: Box::new(state.report),
                });
            }
            state.report.rounds = round;

            let outcome = self.run_round(&mut state, round);
            if !outcome.progressed {
                let pending = state
                    .pending
                    .keys()
                    .map(|module| StalledModule {
                        module: module.clone(),
                        waiting_on: outcome.waiting.get(module).cloned().unwrap_or_default(),
                    })
                    .collect::<Vec<_>>();
                for stalled in &pending {
                    warn!(round, "stalled: {}", stalled);
                }
                return Err(GenerationError::Stalled {
                    round,
                    pending,
                    report: Box::new(state.report),
                });
            }
        }

        info!(
            rounds = state.report.rounds,
            finished = state.finished.len(),
            faulty = state.faulty.len(),
            "generation complete"
        );
        Ok(state.report)
    }

    fn run_round(&self, state: &mut WorkspaceState, round: usize) -> Round {
        debug!(round, pending = state.pending.len(), "round starting");
        let mut progress = Round::default();

        let names: Vec<Identifier> = state.pending.keys().cloned().collect();
        for name in names {
            if state.pending.contains_key(&name) && !progress.visited.contains(&name) {
                self.attempt(&name, state, &mut progress);
            }
        }

        for declaration in state.pending.values_mut() {
            if declaration.preparation_steps > 0 {
                declaration.preparation_steps -= 1;
                progress.progressed = true;
            }
        }

        debug!(
            round,
            progressed = progress.progressed,
            pending = state.pending.len(),
            "round finished"
        );
        progress
    }

    fn attempt(&self, name: &Identifier, state: &mut WorkspaceState, round: &mut Round) -> Attempt {
        if state.finished.contains(name) {
            return Attempt::Finished;
        }
        if state.faulty.contains(name) {
            return Attempt::Faulty;
        }
        // Re-entering a module in the same round: it is either in progress
        // further up the stack or was already deferred.
        if !round.visited.insert(name.clone()) {
            return Attempt::Deferred;
        }
        let Some(declaration) = state.pending.get(name) else {
            return Attempt::Deferred;
        };
        if declaration.preparation_steps > 0 {
            let remaining = declaration.preparation_steps;
            debug!(module = %name, remaining, "awaiting preparation");
            round
                .waiting
                .entry(name.clone())
                .or_default()
                .push(WaitReason::Preparation { remaining });
            return Attempt::Deferred;
        }
        let components = declaration.module.components.clone();

        let mut exports: Vec<ModuleExport> = Vec::with_capacity(components.len());
        let mut waiting = Vec::new();
        for component in &components {
            if let Some(export) = self.component_export(component, state) {
                exports.push(export);
                continue;
            }
            if state.faulty.contains(component) {
                self.fail_on_component(name, component, state, round);
                return Attempt::Faulty;
            }
            if !state.pending.contains_key(component) {
                waiting.push(WaitReason::MissingComponent(component.clone()));
                continue;
            }
            match self.attempt(component, state, round) {
                Attempt::Finished => {
                    if let Some(export) = self.component_export(component, state) {
                        exports.push(export);
                    }
                }
                Attempt::Faulty => {
                    self.fail_on_component(name, component, state, round);
                    return Attempt::Faulty;
                }
                Attempt::Deferred => waiting.push(WaitReason::Component(component.clone())),
            }
        }

        if !waiting.is_empty() {
            debug!(module = %name, waiting = waiting.len(), "module deferred");
            round.waiting.entry(name.clone()).or_default().extend(waiting);
            return Attempt::Deferred;
        }

        let Some(declaration) = state.pending.get(name) else {
            return Attempt::Deferred;
        };
        let refs: Vec<&ModuleExport> = exports.iter().collect();
        let resolved = self.builder.build(&declaration.module, &refs);
        let faulty = resolved.faulty;
        info!(module = %name, faulty, "module built");

        state.complete(resolved);
        round.progressed = true;
        if faulty {
            Attempt::Faulty
        } else {
            Attempt::Finished
        }
    }

    /// Export of a component that is finished in this run or previously compiled.
    fn component_export(&self, component: &Identifier, state: &WorkspaceState) -> Option<ModuleExport> {
        if state.finished.contains(component) {
            return state
                .report
                .modules
                .get(component)
                .map(|resolved| resolved.export.clone());
        }
        self.store.lookup(component)
    }

    fn fail_on_component(
        &self,
        name: &Identifier,
        component: &Identifier,
        state: &mut WorkspaceState,
        round: &mut Round,
    ) {
        warn!(module = %name, component = %component, "component is faulty");
        let diagnostic = Diagnostic::new(
            DiagnosticKind::FaultyComponent,
            QualifiedName::of_module(name),
            format!("component module `{}` is faulty", component),
        )
        .with_label(
            QualifiedName::of_module(component),
            "faulty component".to_string(),
        );
        state.fail(name, diagnostic);
        round.progressed = true;
    }
}
