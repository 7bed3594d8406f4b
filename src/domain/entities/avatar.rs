//! Avatar storage and resolution entities.

use bytes::Bytes;

use super::{SubjectId, VersionToken};

/// File extension of the canonical avatar encoding.
pub const CANONICAL_EXTENSION: &str = "webp";

/// Content type of the canonical avatar encoding.
pub const CANONICAL_CONTENT_TYPE: &str = "image/webp";

/// Extensions written by earlier releases, probed after the canonical one.
pub const DEFAULT_LEGACY_EXTENSIONS: &[&str] = &["jpg", "png"];

/// Key of a stored object, e.g. `avatars/u1.webp`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoredObjectName(String);

impl StoredObjectName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoredObjectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Naming convention for stored avatars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarNaming {
    prefix: String,
    legacy_extensions: Vec<String>,
}

impl AvatarNaming {
    /// Creates a naming scheme. Legacy extensions equal to the canonical one
    /// are dropped, as are duplicates.
    #[must_use]
    pub fn new(prefix: impl Into<String>, legacy_extensions: &[String]) -> Self {
        let mut legacy: Vec<String> = Vec::with_capacity(legacy_extensions.len());
        for ext in legacy_extensions {
            let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
            if ext.is_empty() || ext == CANONICAL_EXTENSION || legacy.contains(&ext) {
                continue;
            }
            legacy.push(ext);
        }
        Self {
            prefix: prefix.into(),
            legacy_extensions: legacy,
        }
    }

    #[must_use]
    pub fn legacy_extensions(&self) -> &[String] {
        &self.legacy_extensions
    }

    /// Name a fresh save always writes.
    #[must_use]
    pub fn canonical(&self, subject: &SubjectId) -> StoredObjectName {
        self.with_extension(subject, CANONICAL_EXTENSION)
    }

    /// Every recognised name, canonical first, then legacy in probe order.
    #[must_use]
    pub fn candidates(&self, subject: &SubjectId) -> Vec<StoredObjectName> {
        std::iter::once(CANONICAL_EXTENSION)
            .chain(self.legacy_extensions.iter().map(String::as_str))
            .map(|ext| self.with_extension(subject, ext))
            .collect()
    }

    fn with_extension(&self, subject: &SubjectId, ext: &str) -> StoredObjectName {
        StoredObjectName(format!("{}{}.{}", self.prefix, subject.as_str(), ext))
    }
}

impl Default for AvatarNaming {
    fn default() -> Self {
        let legacy: Vec<String> = DEFAULT_LEGACY_EXTENSIONS
            .iter()
            .map(ToString::to_string)
            .collect();
        Self::new("", &legacy)
    }
}

/// Cache key: one subject under one invalidation epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub subject: SubjectId,
    pub version: VersionToken,
}

impl CacheKey {
    #[must_use]
    pub const fn new(subject: SubjectId, version: VersionToken) -> Self {
        Self { subject, version }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.subject, self.version)
    }
}

/// Fully resolved avatar lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// The subject has an avatar at `url`.
    Found {
        /// Display URL, possibly carrying a cache-busting parameter.
        url: String,
        /// Stored object the URL points at.
        name: StoredObjectName,
    },
    /// Resolved, and the subject has no avatar (or it could not be probed).
    Missing,
}

impl CacheEntry {
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Found { url, .. } => Some(url),
            Self::Missing => None,
        }
    }

    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Output of the image transformer: a fixed-size square WebP image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalImageBlob {
    bytes: Bytes,
    size: u32,
}

impl CanonicalImageBlob {
    #[must_use]
    pub const fn new(bytes: Bytes, size: u32) -> Self {
        Self { bytes, size }
    }

    #[must_use]
    pub const fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Edge length in pixels.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        CANONICAL_CONTENT_TYPE
    }
}
