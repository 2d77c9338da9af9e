// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Socketry Tools
//!
//! CLI tools for checking socketry workspaces.
//!
//! A workspace manifest is a JSON document holding the type hierarchy,
//! the declared modules, the exports of previously compiled modules and an
//! optional `config` block:
//!
//! ```json
//! {
//!   "config": { "warn_unwired": false },
//!   "types": { "RepoImpl": ["Repo"] },
//!   "modules": [{ "name": "app", "beans": [{ "name": "repo", "type": "RepoImpl" }] }],
//!   "compiled": []
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use socketry_model::Workspace;
use socketry_resolve::{BuildConfig, GenerationError, GenerationReport, ModuleGenerator};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging with a default filter.
///
/// Use `RUST_LOG` environment variable to override the default filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,socketry_resolve=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// A workspace together with its build configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub config: BuildConfig,

    #[serde(flatten)]
    pub workspace: Workspace,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a manifest from JSON text.
pub fn parse_manifest(text: &str) -> Result<Manifest, LoadError> {
    Ok(serde_json::from_str(text)?)
}

/// Read and parse the manifest at `path`.
pub fn load_manifest(path: &Path) -> Result<Manifest, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest = parse_manifest(&text)?;
    debug!(
        path = %path.display(),
        modules = manifest.workspace.modules.len(),
        compiled = manifest.workspace.compiled.len(),
        "manifest loaded"
    );
    Ok(manifest)
}

/// Generate every module of the manifest.
pub fn check(manifest: Manifest) -> Result<GenerationReport, GenerationError> {
    ModuleGenerator::generate_workspace(manifest.workspace, manifest.config)
}
