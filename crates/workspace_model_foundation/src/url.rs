//! Virtual file urls and their interning manager.
//!
//! Urls appear in many entities (library roots, sdk homes, artifact outputs)
//! and are compared constantly by the url index. They are interned so equal
//! urls share one allocation and clone in O(1).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const PROTOCOL_SEPARATOR: &str = "://";

/// A url of a file or directory in the virtual file system.
///
/// Cloning is O(1). Equality, ordering, and hashing use the url text.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VirtualFileUrl(Arc<str>);

impl VirtualFileUrl {
    /// Creates a url without interning it.
    ///
    /// Prefer [`VirtualFileUrlManager::get_or_create`] when many copies of the
    /// same url are expected.
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self(Arc::from(normalize(url)))
    }

    /// Returns the url text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the protocol part (`file`, `jar`, ...), if present.
    #[must_use]
    pub fn protocol(&self) -> Option<&str> {
        self.0.find(PROTOCOL_SEPARATOR).map(|pos| &self.0[..pos])
    }

    /// Returns the path part after the protocol separator.
    #[must_use]
    pub fn path(&self) -> &str {
        match self.0.find(PROTOCOL_SEPARATOR) {
            Some(pos) => &self.0[pos + PROTOCOL_SEPARATOR.len()..],
            None => &self.0,
        }
    }

    /// Returns the last path segment.
    #[must_use]
    pub fn file_name(&self) -> &str {
        let path = self.path().trim_end_matches(['!', '/']);
        path.rsplit('/').next().unwrap_or(path)
    }

    /// Returns the url of the parent directory, or `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<VirtualFileUrl> {
        let path = self.path();
        let cut = path.rfind('/')?;
        if cut == 0 && path.len() == 1 {
            return None;
        }
        let prefix_len = self.0.len() - path.len();
        let end = if cut == 0 { prefix_len + 1 } else { prefix_len + cut };
        Some(Self(Arc::from(&self.0[..end])))
    }

    /// Returns true if `other` is this url or lies underneath it.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &VirtualFileUrl) -> bool {
        if self == other {
            return true;
        }
        other
            .as_str()
            .strip_prefix(self.as_str())
            .is_some_and(|rest| rest.starts_with('/') || self.0.ends_with('/'))
    }
}

fn normalize(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    if trimmed.is_empty() || trimmed.ends_with(':') {
        url
    } else {
        trimmed
    }
}

impl fmt::Debug for VirtualFileUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtualFileUrl({})", self.0)
    }
}

impl fmt::Display for VirtualFileUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VirtualFileUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Interner for [`VirtualFileUrl`]s.
///
/// Not thread-safe; share it behind external synchronization if needed.
#[derive(Clone, Debug, Default)]
pub struct VirtualFileUrlManager {
    urls: HashMap<Arc<str>, VirtualFileUrl>,
}

impl VirtualFileUrlManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the interned url for `url`, creating it on first use.
    pub fn get_or_create(&mut self, url: &str) -> VirtualFileUrl {
        let key = normalize(url);
        if let Some(existing) = self.urls.get(key) {
            return existing.clone();
        }
        let interned = VirtualFileUrl(Arc::from(key));
        self.urls.insert(interned.0.clone(), interned.clone());
        interned
    }

    /// Interns a local file system path as a `file://` url.
    pub fn from_path(&mut self, path: &str) -> VirtualFileUrl {
        let path = path.replace('\\', "/");
        self.get_or_create(&format!("file://{path}"))
    }

    /// Looks up an already interned url.
    #[must_use]
    pub fn find_by_url(&self, url: &str) -> Option<VirtualFileUrl> {
        self.urls.get(normalize(url)).cloned()
    }

    /// Returns the number of interned urls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Returns true if no url has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
