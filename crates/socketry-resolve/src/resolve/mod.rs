//! Resolution passes
//!
//! ```text
//! scope → wires/wiring → sockets → cycles → builder → generator
//! ```
//!
//! Each pass reads immutable declarations and writes its findings to a
//! diagnostic sink; only the generator returns a fatal error.

pub mod builder;
pub mod cycles;
pub mod generator;
pub mod names;
pub mod scope;
pub mod sockets;
pub mod wires;
pub mod wiring;

pub use builder::ModuleBuilder;
pub use cycles::{check_cycles, Cycle, CycleReport, CycleStep, DependencyGraph, NodeId};
pub use generator::{
    GenerationError, GenerationReport, ModuleGenerator, StalledModule, WaitReason, WorkspaceState,
};
pub use names::validate_names;
pub use scope::{Candidate, CandidateOrigin, ModuleScope, SocketOwner, SocketSite};
pub use sockets::{BindingSource, BindingState, Resolution, SocketBinding, SocketResolver};
pub use wiring::{SelectorStrategy, TypeStrategy, WiringStrategies, WiringStrategy};
