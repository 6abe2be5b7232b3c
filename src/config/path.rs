//! Navigation into JSON documents by a path of keys and array indices.
//!
//! A path expression like `cfkit_postgres.connection.max_open` names an
//! environment variable (`cfkit_postgres`) followed by the segments to walk
//! inside its JSON value. Whether a segment addresses an object key or an
//! array index is decided by the value it is applied to: a segment which
//! parses as a non-negative integer selects an array element, any segment
//! selects an object field.

use crate::config::error::ConfigError;
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// Separator between the segments of a path expression.
pub const PATH_DELIMITER: char = '.';

/// The empty path, selecting a whole variable.
pub const ROOT: &[&str] = &[];

/// A single step of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    /// Selects an object field (or, for arrays, nothing).
    Key(&'a str),
    /// Selects an array element or an object field named by the digits.
    Index(usize, &'a str),
}

impl<'a> PathSegment<'a> {
    pub fn parse(segment: &'a str) -> Self {
        match segment.parse::<usize>() {
            Ok(index) => PathSegment::Index(index, segment),
            Err(_) => PathSegment::Key(segment),
        }
    }

    fn as_key(&self) -> &'a str {
        match *self {
            PathSegment::Key(key) | PathSegment::Index(_, key) => key,
        }
    }

    fn select<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        match (value, self) {
            (Value::Array(items), PathSegment::Index(index, _)) => items.get(*index),
            (Value::Object(fields), segment) => fields.get(segment.as_key()),
            _ => None,
        }
    }
}

/// Walks `path` starting at `root` and returns the addressed sub-value.
///
/// An empty path yields `root`. Every intermediate value must be an array or
/// an object, otherwise the walk stops and yields `None`. Missing keys and
/// out of range indices yield `None` as well.
pub fn traverse<'v, S: AsRef<str>>(path: &[S], root: &'v Value) -> Option<&'v Value> {
    let Some((head, rest)) = path.split_first() else {
        return Some(root);
    };

    let next = PathSegment::parse(head.as_ref()).select(root)?;
    if rest.is_empty() {
        return Some(next);
    }

    match next {
        Value::Array(_) | Value::Object(_) => traverse(rest, next),
        _ => None,
    }
}

/// A parsed path expression: a variable name plus the JSON path inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    pub name: String,
    pub path: Vec<String>,
}

impl PathExpr {
    /// Splits `expression` at [PATH_DELIMITER].
    ///
    /// The first segment is the environment variable, the rest is the path.
    /// Empty segments are rejected.
    pub fn parse(expression: &str) -> Result<Self, ConfigError> {
        let mut segments = expression.split(PATH_DELIMITER).map(str::trim);

        let name = match segments.next() {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => return Err(ConfigError::binding(expression, "missing variable name")),
        };

        let path = segments
            .map(|segment| {
                if segment.is_empty() {
                    Err(ConfigError::binding(expression, "empty path segment"))
                } else {
                    Ok(segment.to_owned())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PathExpr { name, path })
    }
}

impl Display for PathExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        for segment in &self.path {
            write!(f, "{}{}", PATH_DELIMITER, segment)?;
        }

        Ok(())
    }
}
