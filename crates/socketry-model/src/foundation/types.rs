//! Type references and the declared subtype hierarchy.
//!
//! Types are erased to names plus type arguments. The resolver never looks
//! inside a type beyond what [`TypeHierarchy::is_assignable`] needs.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the collection supertype used by multi-sockets.
pub const COLLECTION: &str = "Collection";
/// Name of the list container type.
pub const LIST: &str = "List";
/// Name of the set container type.
pub const SET: &str = "Set";

/// Errors raised when parsing a type reference string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeSyntaxError {
    #[error("type reference is empty")]
    Empty,

    #[error("unexpected `{found}` at offset {offset} in `{input}`")]
    Unexpected {
        input: String,
        offset: usize,
        found: char,
    },

    #[error("unexpected end of type reference `{input}`")]
    UnexpectedEnd { input: String },
}

/// A reference to a type.
///
/// Written as `Name`, `Name<Arg, ...>`, `Elem[]` or `?`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Named { name: String, args: Vec<TypeRef> },
    Array(Box<TypeRef>),
    Wildcard,
}

impl TypeRef {
    /// A non-generic named type.
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args,
        }
    }

    pub fn array(elem: TypeRef) -> Self {
        TypeRef::Array(Box::new(elem))
    }

    pub fn parse(input: &str) -> Result<Self, TypeSyntaxError> {
        TypeParser::new(input).parse()
    }

    /// The erased name, if this is a named type.
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeRef::Named { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeRef::Array(elem) => write!(f, "{}[]", elem),
            TypeRef::Wildcard => write!(f, "?"),
        }
    }
}

impl FromStr for TypeRef {
    type Err = TypeSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeSyntaxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TypeRef> for String {
    fn from(ty: TypeRef) -> Self {
        ty.to_string()
    }
}

struct TypeParser<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<TypeRef, TypeSyntaxError> {
        self.skip_ws();
        if self.peek().is_none() {
            return Err(TypeSyntaxError::Empty);
        }
        let ty = self.parse_type()?;
        self.skip_ws();
        match self.peek() {
            None => Ok(ty),
            Some(_) => Err(self.unexpected()),
        }
    }

    fn parse_type(&mut self) -> Result<TypeRef, TypeSyntaxError> {
        self.skip_ws();
        let mut ty = match self.peek() {
            Some('?') => {
                self.pos += 1;
                TypeRef::Wildcard
            }
            Some(c) if is_name_start(c) => {
                let name = self.parse_name();
                let args = self.parse_args()?;
                TypeRef::Named { name, args }
            }
            Some(_) => return Err(self.unexpected()),
            None => return Err(self.end()),
        };

        loop {
            self.skip_ws();
            if self.peek() != Some('[') {
                break;
            }
            self.pos += 1;
            self.skip_ws();
            self.expect(']')?;
            ty = TypeRef::array(ty);
        }
        Ok(ty)
    }

    fn parse_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        name
    }

    fn parse_args(&mut self) -> Result<Vec<TypeRef>, TypeSyntaxError> {
        self.skip_ws();
        if self.peek() != Some('<') {
            return Ok(Vec::new());
        }
        self.pos += 1;
        let mut args = vec![self.parse_type()?];
        loop {
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    args.push(self.parse_type()?);
                }
                Some('>') => {
                    self.pos += 1;
                    return Ok(args);
                }
                Some(_) => return Err(self.unexpected()),
                None => return Err(self.end()),
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), TypeSyntaxError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(self.unexpected()),
            None => Err(self.end()),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn unexpected(&self) -> TypeSyntaxError {
        let (offset, found) = self.chars[self.pos];
        TypeSyntaxError::Unexpected {
            input: self.input.to_string(),
            offset,
            found,
        }
    }

    fn end(&self) -> TypeSyntaxError {
        TypeSyntaxError::UnexpectedEnd {
            input: self.input.to_string(),
        }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
}

/// Declared subtype relations between erased type names.
///
/// Subtyping is reflexive and transitive. Declaring a cycle is allowed and
/// simply makes the involved names mutually assignable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeHierarchy {
    supertypes: IndexMap<String, Vec<String>>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hierarchy with the container types multi-sockets rely on.
    pub fn with_collections() -> Self {
        let mut hierarchy = Self::new();
        hierarchy.declare(LIST, COLLECTION);
        hierarchy.declare(SET, COLLECTION);
        hierarchy
    }

    /// Declare `sub <: sup`.
    pub fn declare(&mut self, sub: impl Into<String>, sup: impl Into<String>) -> &mut Self {
        let sup = sup.into();
        let entry = self.supertypes.entry(sub.into()).or_default();
        if !entry.contains(&sup) {
            entry.push(sup);
        }
        self
    }

    /// Direct supertypes declared for `name`.
    pub fn supertypes_of(&self, name: &str) -> &[String] {
        self.supertypes.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `sub` is `sup` or a (transitive) declared subtype of it.
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return true;
        }
        let mut visited = HashSet::new();
        let mut stack = vec![sub];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            for parent in self.supertypes_of(current) {
                if parent == sup {
                    return true;
                }
                stack.push(parent);
            }
        }
        false
    }

    /// Whether a value of type `source` may be injected where `target` is expected.
    pub fn is_assignable(&self, source: &TypeRef, target: &TypeRef) -> bool {
        match (source, target) {
            (_, TypeRef::Wildcard) => true,
            (TypeRef::Wildcard, _) => false,
            (TypeRef::Array(s), TypeRef::Array(t)) => self.is_assignable(s, t),
            (
                TypeRef::Named { name: sn, args: sa },
                TypeRef::Named { name: tn, args: ta },
            ) => self.is_subtype(sn, tn) && args_compatible(sa, ta),
            _ => false,
        }
    }
}

/// Type arguments are invariant; a raw target or a `?` argument accepts anything.
fn args_compatible(source: &[TypeRef], target: &[TypeRef]) -> bool {
    if target.is_empty() {
        return true;
    }
    if source.len() != target.len() {
        return target.iter().all(|t| *t == TypeRef::Wildcard);
    }
    source
        .iter()
        .zip(target)
        .all(|(s, t)| *t == TypeRef::Wildcard || s == t)
}
