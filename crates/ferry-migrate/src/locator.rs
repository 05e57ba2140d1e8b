//! Resolution of Bitbucket repository locators.
//!
//! A locator is whatever an operator pastes: a browse URL, an HTTP or SSH
//! clone URL, or a bare path. Only the path matters; it is matched against
//! the accepted shapes in priority order.

use crate::error::{MigrationError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Accepted locator paths, in the order they are tried.
pub const ACCEPTED_SHAPES: &[&str] = &[
    "/projects/{PROJECT}/repos/{REPO}",
    "/scm/{PROJECT}/{REPO}.git",
    "/{PROJECT}/{REPO}[.git]",
];

/// `/projects/KEY/repos/slug`, optionally under a context path and followed
/// by more segments such as `/browse`.
static PROJECTS_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:/[^/]+)*?/projects/([A-Za-z0-9._~-]+)/repos/([A-Za-z0-9._-]+)(?:/.*)?$")
        .expect("valid regex")
});

/// `/scm/KEY/slug.git`, optionally under a context path.
static SCM_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:/[^/]+)*?/scm/([A-Za-z0-9._~-]+)/([A-Za-z0-9._-]+)/?$").expect("valid regex")
});

/// `/KEY/slug.git`, as used by SSH clone URLs.
static DIRECT_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/([A-Za-z0-9._~-]+)/([A-Za-z0-9._-]+)/?$").expect("valid regex")
});

/// Resolves a locator to `(project_key, repo_slug)`.
pub fn resolve(locator: &str) -> Result<(String, String)> {
    let malformed = || MigrationError::MalformedLocator {
        locator: locator.to_string(),
    };

    let path = locator_path(locator.trim()).ok_or_else(malformed)?;

    let (project, slug) = if let Some(caps) = PROJECTS_PATH.captures(&path) {
        (caps[1].to_string(), caps[2].to_string())
    } else if let Some(caps) = SCM_PATH
        .captures(&path)
        .or_else(|| DIRECT_PATH.captures(&path))
    {
        let slug = caps[2].strip_suffix(".git").unwrap_or(&caps[2]);
        (caps[1].to_string(), slug.to_string())
    } else {
        return Err(malformed());
    };

    if slug.is_empty() || slug == "." || slug == ".." || project == "." || project == ".." {
        return Err(malformed());
    }
    Ok((project, slug))
}

/// Path component of a URL locator, or the locator itself when it is a bare
/// path. Query and fragment are dropped.
fn locator_path(locator: &str) -> Option<String> {
    if locator.is_empty() {
        return None;
    }
    if locator.contains("://") {
        let url = Url::parse(locator).ok()?;
        return Some(url.path().to_string());
    }
    let path = locator.split(['?', '#']).next().unwrap_or_default();
    if path.starts_with('/') {
        Some(path.to_string())
    } else {
        Some(format!("/{path}"))
    }
}

/// Rewrites `ssh://user@host[:port]/path` as `https://host[:port]/path`.
///
/// Ports 22 and 443 are dropped. Anything that is not an `ssh://` URL is
/// returned unchanged.
pub fn ssh_to_https(locator: &str) -> String {
    if !locator.starts_with("ssh://") {
        return locator.to_string();
    }
    let Ok(url) = Url::parse(locator) else {
        return locator.to_string();
    };
    let Some(host) = url.host_str() else {
        return locator.to_string();
    };

    match url.port() {
        Some(port) if port != 22 && port != 443 => format!("https://{host}:{port}{}", url.path()),
        _ => format!("https://{host}{}", url.path()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(project: &str, slug: &str) -> (String, String) {
        (project.to_string(), slug.to_string())
    }

    #[test]
    fn test_projects_shape() {
        assert_eq!(resolve("/projects/PROJ/repos/app").unwrap(), pair("PROJ", "app"));
        assert_eq!(
            resolve("https://bitbucket.example.com/projects/PROJ/repos/app/browse").unwrap(),
            pair("PROJ", "app")
        );
        assert_eq!(
            resolve("https://host/bitbucket/projects/PROJ/repos/app/browse?at=refs/heads/dev").unwrap(),
            pair("PROJ", "app")
        );
    }

    #[test]
    fn test_scm_shape() {
        assert_eq!(resolve("/scm/PROJ/app.git").unwrap(), pair("PROJ", "app"));
        assert_eq!(resolve("/scm/PROJ/app").unwrap(), pair("PROJ", "app"));
        assert_eq!(
            resolve("https://alice@bitbucket.example.com/scm/proj/app.git").unwrap(),
            pair("proj", "app")
        );
        assert_eq!(resolve("/scm/~alice/dotfiles.git").unwrap(), pair("~alice", "dotfiles"));
    }

    #[test]
    fn test_direct_shape() {
        assert_eq!(resolve("/PROJ/app.git").unwrap(), pair("PROJ", "app"));
        assert_eq!(resolve("PROJ/app").unwrap(), pair("PROJ", "app"));
        assert_eq!(
            resolve("ssh://git@bitbucket.example.com:2222/PROJ/app.git").unwrap(),
            pair("PROJ", "app")
        );
    }

    #[test]
    fn test_priority_order() {
        // A projects path is never read as a direct path.
        assert_eq!(resolve("/projects/PROJ/repos/app").unwrap(), pair("PROJ", "app"));
        // A scm path with a project named "scm" still resolves through scm.
        assert_eq!(resolve("/scm/scm/app.git").unwrap(), pair("scm", "app"));
    }

    #[test]
    fn test_malformed() {
        for locator in [
            "",
            "/",
            "/app.git",
            "/a/b/c",
            "/projects/PROJ/repos/",
            "/scm/PROJ/.git",
            "git@host:PROJ/app.git",
            "https://",
        ] {
            let err = resolve(locator).unwrap_err();
            assert!(
                matches!(err, MigrationError::MalformedLocator { .. }),
                "{locator:?} resolved"
            );
        }
    }

    #[test]
    fn test_ssh_to_https() {
        assert_eq!(
            ssh_to_https("ssh://git@bitbucket.example.com:7999/proj/app.git"),
            "https://bitbucket.example.com:7999/proj/app.git"
        );
        assert_eq!(
            ssh_to_https("ssh://git@bitbucket.example.com:22/proj/app.git"),
            "https://bitbucket.example.com/proj/app.git"
        );
        assert_eq!(
            ssh_to_https("ssh://git@bitbucket.example.com:443/proj/app.git"),
            "https://bitbucket.example.com/proj/app.git"
        );
        assert_eq!(
            ssh_to_https("ssh://git@bitbucket.example.com/proj/app.git"),
            "https://bitbucket.example.com/proj/app.git"
        );
    }

    #[test]
    fn test_ssh_to_https_passthrough() {
        for locator in [
            "https://bitbucket.example.com/scm/proj/app.git",
            "http://host:8080/scm/proj/app.git",
            "/scm/proj/app.git",
        ] {
            assert_eq!(ssh_to_https(locator), locator);
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn project() -> impl Strategy<Value = String> {
        "[A-Z][A-Z0-9_]{0,9}"
    }

    fn slug() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,19}"
    }

    proptest! {
        #[test]
        fn prop_all_shapes_resolve(project in project(), slug in slug(), port in 1u16..65535) {
            let expected = (project.clone(), slug.clone());
            let shapes = [
                format!("/projects/{project}/repos/{slug}"),
                format!("https://bitbucket.example.com/projects/{project}/repos/{slug}/browse"),
                format!("/scm/{project}/{slug}.git"),
                format!("https://bitbucket.example.com/scm/{project}/{slug}.git"),
                format!("/{project}/{slug}.git"),
                format!("/{project}/{slug}"),
                format!("ssh://git@bitbucket.example.com:{port}/{project}/{slug}.git"),
            ];
            for locator in shapes {
                prop_assert_eq!(resolve(&locator).unwrap(), expected.clone());
            }
        }

        #[test]
        fn prop_https_is_fixed_point(host in "[a-z]{1,10}\\.example\\.com", path in "(/[a-z0-9]{1,8}){1,4}") {
            let https = format!("https://{host}{path}");
            prop_assert_eq!(ssh_to_https(&https), https.clone());
            let converted = ssh_to_https(&format!("ssh://git@{host}{path}"));
            prop_assert_eq!(ssh_to_https(&converted), converted.clone());
        }

        #[test]
        fn prop_ssh_port_kept_unless_default(port in 1u16..65535) {
            let https = ssh_to_https(&format!("ssh://git@host.example.com:{port}/p/r.git"));
            if port == 22 || port == 443 {
                prop_assert_eq!(https, "https://host.example.com/p/r.git".to_string());
            } else {
                prop_assert_eq!(https, format!("https://host.example.com:{port}/p/r.git"));
            }
        }

        #[test]
        fn prop_resolve_never_panics(locator in ".{0,80}") {
            let _ = resolve(&locator);
        }
    }
}
