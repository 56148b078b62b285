//! Key paths into the state tree.

use std::fmt;
use std::slice;

use serde::{Deserialize, Serialize};

/// An ordered sequence of keys identifying a location in a [`Value`](crate::Value).
///
/// Keys name map entries; on lists they are parsed as decimal indices.
/// A key is never split, so `"a.b"` is a single key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<String>);

impl Path {
    /// The empty path, addressing the value it is applied to.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenates `self` and `suffix` into a new path.
    #[must_use]
    pub fn join(&self, suffix: impl Into<Path>) -> Path {
        let suffix = suffix.into();
        let mut keys = Vec::with_capacity(self.0.len() + suffix.0.len());
        keys.extend_from_slice(&self.0);
        keys.extend(suffix.0);
        Path(keys)
    }

    /// The first `len` keys of this path.
    #[must_use]
    pub fn prefix(&self, len: usize) -> Path {
        Path(self.0[..len.min(self.0.len())].to_vec())
    }

    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn iter(&self) -> slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        f.write_str(&self.0.join("."))
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a String;
    type IntoIter = slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for Path {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Path(iter.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for Path {
    fn from(key: &str) -> Self {
        Path(vec![key.to_string()])
    }
}

impl From<String> for Path {
    fn from(key: String) -> Self {
        Path(vec![key])
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(keys: [&str; N]) -> Self {
        keys.into_iter().collect()
    }
}

impl From<&[&str]> for Path {
    fn from(keys: &[&str]) -> Self {
        keys.iter().copied().collect()
    }
}

impl From<Vec<&str>> for Path {
    fn from(keys: Vec<&str>) -> Self {
        keys.into_iter().collect()
    }
}

impl From<Vec<String>> for Path {
    fn from(keys: Vec<String>) -> Self {
        Path(keys)
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Self {
        path.clone()
    }
}
