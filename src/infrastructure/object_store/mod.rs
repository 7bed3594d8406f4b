//! Object store adapters.

mod fs_object_store;
mod http_object_store;

pub use fs_object_store::FsObjectStore;
pub use http_object_store::HttpObjectStore;

use reqwest::Url;

use crate::domain::entities::StoredObjectName;
use crate::domain::errors::StoreError;

/// Parses a base URL that object names are appended to.
fn parse_base_url(raw: &str) -> Result<Url, StoreError> {
    let url = Url::parse(raw).map_err(|e| StoreError::invalid_url(raw, e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(StoreError::invalid_url(raw, "url cannot have path segments"));
    }
    Ok(url)
}

/// Appends each `/`-separated segment of `name` to `base`, percent-encoded,
/// so reserved characters in a subject id stay inside its own segment.
fn object_url(base: &Url, name: &StoredObjectName) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(name.as_str().split('/'));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://cdn.example.com", "u1.webp", "https://cdn.example.com/u1.webp" ; "bare_host")]
    #[test_case("https://cdn.example.com/avatars/", "u1.webp", "https://cdn.example.com/avatars/u1.webp" ; "trailing_slash")]
    #[test_case("https://cdn.example.com/avatars", "p/u1.webp", "https://cdn.example.com/avatars/p/u1.webp" ; "prefixed_name")]
    #[test_case("https://cdn.example.com", "team#1.webp", "https://cdn.example.com/team%231.webp" ; "hash")]
    #[test_case("https://cdn.example.com", "a?b.webp", "https://cdn.example.com/a%3Fb.webp" ; "question_mark")]
    #[test_case("https://cdn.example.com", "100%.webp", "https://cdn.example.com/100%25.webp" ; "percent")]
    fn test_object_url(base: &str, name: &str, expected: &str) {
        let base = parse_base_url(base).unwrap();
        assert_eq!(object_url(&base, &StoredObjectName::new(name)).as_str(), expected);
    }

    #[test]
    fn test_reserved_characters_keep_subjects_apart() {
        let base = parse_base_url("https://storage.example.com/bucket").unwrap();
        let first = object_url(&base, &StoredObjectName::new("team#1.webp"));
        let second = object_url(&base, &StoredObjectName::new("team#2.webp"));

        assert_ne!(first.path(), second.path());
        assert_eq!(first.fragment(), None);
        assert_eq!(second.query(), None);
    }

    #[test_case("not a url" ; "unparseable")]
    #[test_case("mailto:avatars@example.com" ; "cannot_be_a_base")]
    fn test_parse_base_url_rejects(raw: &str) {
        assert!(matches!(parse_base_url(raw), Err(StoreError::InvalidUrl { .. })));
    }
}
