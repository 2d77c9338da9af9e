//! Names for modules, beans and sockets
//!
//! Every declared entity is addressed by a [`QualifiedName`] made of up to
//! three colon-separated [`Identifier`] parts:
//! - `app` (a module)
//! - `app:service` (a bean, or a module socket)
//! - `app:service:repo` (a socket owned by a bean)
//!
//! Module names and nested bean names may be dotted (`app.core`,
//! `service.config`); each dotted segment must itself be a valid identifier.
//! The resolver uses qualified names as map keys throughout.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building names from raw strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,

    #[error("invalid identifier `{value}`: {reason}")]
    InvalidIdentifier { value: String, reason: &'static str },

    #[error("qualified name `{value}` has {parts} parts, at most {max} allowed")]
    TooManyParts {
        value: String,
        parts: usize,
        max: usize,
    },
}

/// A validated name part.
///
/// Holds one or more `.`-separated segments, each matching
/// `[A-Za-z_$][A-Za-z0-9_$]*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Validate and wrap a raw identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, NameError> {
        let value = value.into();
        if value.is_empty() {
            return Err(NameError::Empty);
        }
        for segment in value.split('.') {
            validate_segment(&value, segment)?;
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The dotted segments of this identifier.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// The last dotted segment (`core` for `app.core`).
    pub fn last_segment(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Derive the identifier of a nested bean (`service` + `config` → `service.config`).
    pub fn nested(&self, accessor: &Identifier) -> Identifier {
        Identifier(format!("{}.{}", self.0, accessor.0))
    }
}

fn validate_segment(value: &str, segment: &str) -> Result<(), NameError> {
    let mut chars = segment.chars();
    let Some(first) = chars.next() else {
        return Err(NameError::InvalidIdentifier {
            value: value.to_string(),
            reason: "empty segment",
        });
    };
    if !(first.is_ascii_alphabetic() || first == '_' || first == '$') {
        return Err(NameError::InvalidIdentifier {
            value: value.to_string(),
            reason: "segment must start with a letter, `_` or `$`",
        });
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return Err(NameError::InvalidIdentifier {
            value: value.to_string(),
            reason: "segment contains an invalid character",
        });
    }
    Ok(())
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identifier {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl FromStr for Identifier {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl PartialEq<&str> for Identifier {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A hierarchical name: module, bean, socket.
///
/// Qualified names are immutable and compare, hash and order by their parts,
/// so they are used as keys for every resolution map.
///
/// # Examples
///
/// ```
/// # use socketry_model::foundation::QualifiedName;
/// let name = QualifiedName::parse("app:service:repo").unwrap();
/// assert_eq!(name.module().as_str(), "app");
/// assert_eq!(name.simple_name().as_str(), "repo");
/// assert_eq!(name.to_string(), "app:service:repo");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName {
    parts: Vec<Identifier>,
}

impl QualifiedName {
    /// Separator between parts.
    pub const SEPARATOR: char = ':';

    /// Maximum number of parts (module, bean, socket).
    pub const MAX_PARTS: usize = 3;

    /// A module-level name.
    pub fn of_module(name: &Identifier) -> Self {
        Self {
            parts: vec![name.clone()],
        }
    }

    /// A bean-level name (`module:bean`), also used for module sockets.
    pub fn bean(module: &Identifier, bean: &Identifier) -> Self {
        Self {
            parts: vec![module.clone(), bean.clone()],
        }
    }

    /// A bean-owned socket name (`module:bean:socket`).
    pub fn socket(module: &Identifier, bean: &Identifier, socket: &Identifier) -> Self {
        Self {
            parts: vec![module.clone(), bean.clone(), socket.clone()],
        }
    }

    /// Parse a colon-separated name.
    pub fn parse(value: &str) -> Result<Self, NameError> {
        if value.is_empty() {
            return Err(NameError::Empty);
        }
        let parts = value
            .split(Self::SEPARATOR)
            .map(Identifier::new)
            .collect::<Result<Vec<_>, _>>()?;
        if parts.len() > Self::MAX_PARTS {
            return Err(NameError::TooManyParts {
                value: value.to_string(),
                parts: parts.len(),
                max: Self::MAX_PARTS,
            });
        }
        Ok(Self { parts })
    }

    /// Append a part (module → bean → socket).
    ///
    /// Returns `None` if the name already has [`Self::MAX_PARTS`] parts.
    pub fn child(&self, part: &Identifier) -> Option<Self> {
        if self.parts.len() >= Self::MAX_PARTS {
            return None;
        }
        let mut parts = self.parts.clone();
        parts.push(part.clone());
        Some(Self { parts })
    }

    pub fn parts(&self) -> &[Identifier] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Qualified names are never empty; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The module part (always the first part).
    pub fn module(&self) -> &Identifier {
        &self.parts[0]
    }

    /// The last part (module, bean or socket name).
    pub fn simple_name(&self) -> &Identifier {
        &self.parts[self.parts.len() - 1]
    }

    /// The enclosing name (all parts except the last).
    ///
    /// Returns None for a module-level name.
    pub fn parent(&self) -> Option<Self> {
        if self.parts.len() <= 1 {
            None
        } else {
            Some(Self {
                parts: self.parts[..self.parts.len() - 1].to_vec(),
            })
        }
    }

    /// Whether this name belongs to the given module.
    pub fn is_in_module(&self, module: &Identifier) -> bool {
        self.module() == module
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", Self::SEPARATOR)?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl FromStr for QualifiedName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<QualifiedName> for String {
    fn from(name: QualifiedName) -> Self {
        name.to_string()
    }
}

impl PartialEq<&str> for QualifiedName {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}
