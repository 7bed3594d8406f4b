//! Cache-busting query parameters for avatar URLs.

use crate::domain::entities::VersionToken;

/// Query parameter carrying the invalidation epoch.
pub const VERSION_PARAM: &str = "v";

/// Appends `v={version}` to `url`, replacing any existing `v` parameter and
/// preserving the others.
#[must_use]
pub fn with_version_param(url: &str, version: VersionToken) -> String {
    let (base, existing) = split_query(url);

    let mut params = Vec::new();
    if let Some(existing) = existing {
        for param in existing.split('&').filter(|p| !p.is_empty()) {
            let key = param.split('=').next().unwrap_or("");
            if key != VERSION_PARAM {
                params.push(param.to_string());
            }
        }
    }
    params.push(format!("{VERSION_PARAM}={version}"));

    format!("{}?{}", base, params.join("&"))
}

/// Removes the `v` parameter, yielding the URL without its cache-busting suffix.
#[cfg(test)]
#[must_use]
pub fn without_version_param(url: &str) -> String {
    let (base, existing) = split_query(url);
    let kept: Vec<&str> = existing
        .into_iter()
        .flat_map(|q| q.split('&'))
        .filter(|p| !p.is_empty() && p.split('=').next() != Some(VERSION_PARAM))
        .collect();

    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, kept.join("&"))
    }
}

fn split_query(url: &str) -> (&str, Option<&str>) {
    url.split_once('?')
        .map_or((url, None), |(base, query)| (base, Some(query)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_version() {
        let url = with_version_param("https://cdn.test/u1.webp", VersionToken::new(7));
        assert_eq!(url, "https://cdn.test/u1.webp?v=7");
    }

    #[test]
    fn test_replaces_version_and_keeps_other_params() {
        let url = with_version_param(
            "https://cdn.test/u1.webp?token=abc&v=3",
            VersionToken::new(9),
        );
        assert_eq!(url, "https://cdn.test/u1.webp?token=abc&v=9");
    }

    #[test]
    fn test_without_version_param() {
        assert_eq!(
            without_version_param("https://cdn.test/u1.webp?v=9"),
            "https://cdn.test/u1.webp"
        );
        assert_eq!(
            without_version_param("https://cdn.test/u1.webp?token=abc&v=9"),
            "https://cdn.test/u1.webp?token=abc"
        );
    }
}
