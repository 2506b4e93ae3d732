use std::fmt;
use std::path::{Path, PathBuf};

const FILE_SCHEME: &str = "file://";

/// Opaque URI naming where a recorded or remote clip lives
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// `file://` URI with each path segment percent-encoded
    pub fn from_path(path: &Path) -> Self {
        let raw = path.to_string_lossy();
        let encoded: Vec<_> = raw.split('/').map(urlencoding::encode).collect();
        Self(format!("{}{}", FILE_SCHEME, encoded.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_remote(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }

    /// Local filesystem path for `file://` URIs and bare paths
    pub fn to_path(&self) -> Option<PathBuf> {
        if self.is_remote() {
            return None;
        }
        let Some(encoded) = self.0.strip_prefix(FILE_SCHEME) else {
            return (!self.0.is_empty()).then(|| PathBuf::from(&self.0));
        };
        if encoded.is_empty() {
            return None;
        }
        let decoded = urlencoding::decode(encoded).ok()?;
        Some(PathBuf::from(decoded.into_owned()))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locator {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}
