//! URL canonicalization.
//!
//! A raw URL is reduced by an ordered list of [`Rule`]s, then truncated to
//! `https://github.com/<org>/<repo>` when it points into a GitHub repository.
//! Every rule is idempotent on its own; the chain is re-applied until the
//! string stops changing, so [`canonicalize`] is idempotent as a whole.

use std::sync::LazyLock;

use regex::Regex;

use super::CanonicalKey;
use crate::error::RegistryError;

pub const GITHUB_PREFIX: &str = "https://github.com/";

static GITHUB_REPO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://github\.com/([^/]+)/([^/]+)").unwrap());
static GITHUB_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://github\.com/[^/]+/[^/]+$").unwrap());

/// Path markers after which everything is repository navigation noise.
const PATH_SUFFIXES: &[&str] = &["/tree/", "/blob/", "/issues", "/pulls", "/releases"];

/// One normalization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Trim surrounding whitespace and lowercase.
    LowercaseTrim,
    /// Drop trailing `/`.
    TrimTrailingSlash,
    /// Drop a trailing `.git` (repeated suffixes included).
    StripGitSuffix,
    /// Drop `?...`.
    StripQuery,
    /// Drop `#...`.
    StripFragment,
    /// Drop everything from the first `/tree/`, `/blob/`, `/issues`, `/pulls`
    /// or `/releases` in the path.
    StripPathSuffix,
}

/// Rules in application order.
pub const RULES: &[Rule] = &[
    Rule::LowercaseTrim,
    Rule::TrimTrailingSlash,
    Rule::StripGitSuffix,
    Rule::StripQuery,
    Rule::StripFragment,
    Rule::StripPathSuffix,
];

impl Rule {
    pub fn apply(self, url: &str) -> String {
        match self {
            Rule::LowercaseTrim => url.trim().to_lowercase(),
            Rule::TrimTrailingSlash => url.trim_end_matches('/').to_string(),
            Rule::StripGitSuffix => {
                let mut rest = url;
                while let Some(stripped) = rest.strip_suffix(".git") {
                    rest = stripped;
                }
                rest.to_string()
            }
            Rule::StripQuery => cut_at(url, url.find('?')),
            Rule::StripFragment => cut_at(url, url.find('#')),
            Rule::StripPathSuffix => {
                let path_start = path_offset(url);
                let cut = PATH_SUFFIXES
                    .iter()
                    .filter_map(|marker| url[path_start..].find(marker))
                    .min()
                    .map(|i| path_start + i);
                cut_at(url, cut)
            }
        }
    }
}

fn cut_at(url: &str, idx: Option<usize>) -> String {
    match idx {
        Some(i) => url[..i].to_string(),
        None => url.to_string(),
    }
}

/// Byte offset where the path begins, so host names never match a path marker.
fn path_offset(url: &str) -> usize {
    match url.find("://") {
        Some(scheme_end) => {
            let authority = scheme_end + 3;
            url[authority..]
                .find('/')
                .map(|i| authority + i)
                .unwrap_or(url.len())
        }
        None => 0,
    }
}

/// Run the rule chain once, in order.
pub fn normalize(url: &str) -> String {
    RULES
        .iter()
        .fold(url.to_string(), |acc, rule| rule.apply(&acc))
}

/// One reduction step: normalize, then keep only `org/repo` for GitHub URLs.
fn reduce(url: &str) -> String {
    let normalized = normalize(url);
    match GITHUB_REPO_RE.captures(&normalized) {
        Some(caps) => format!("{}{}/{}", GITHUB_PREFIX, &caps[1], &caps[2]),
        None => normalized,
    }
}

/// Lenient canonicalization.
///
/// GitHub repository URLs reduce to `https://github.com/<org>/<repo>`; any
/// other URL is returned in normalized form. Empty or whitespace-only input
/// has no key.
pub fn canonicalize(raw: &str) -> Option<CanonicalKey> {
    let mut current = reduce(raw);
    loop {
        let next = reduce(&current);
        if next == current {
            break;
        }
        current = next;
    }
    if current.is_empty() {
        None
    } else {
        Some(CanonicalKey::new(current))
    }
}

/// Strict canonicalization: only a GitHub repository key is accepted.
pub fn github_key(raw: &str) -> Result<CanonicalKey, RegistryError> {
    canonicalize(raw)
        .filter(CanonicalKey::is_github)
        .ok_or_else(|| RegistryError::NotCanonicalizable(raw.to_string()))
}

pub(crate) fn is_github_key(key: &str) -> bool {
    GITHUB_KEY_RE.is_match(key)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> Option<String> {
        canonicalize(raw).map(|k| k.to_string())
    }

    #[test]
    fn equivalent_github_forms() {
        let forms = [
            "https://GitHub.com/Org/Repo",
            "https://github.com/org/repo/",
            "https://github.com/org/repo.git",
            "https://github.com/org/repo/tree/main",
            "https://github.com/org/repo?tab=readme",
            "https://github.com/org/repo#readme",
            "  https://github.com/org/repo  ",
            "https://github.com/org/repo/blob/main/README.md",
            "https://github.com/org/repo/issues/12",
            "https://github.com/org/repo/pulls",
            "https://github.com/org/repo/releases/tag/v1.0",
        ];
        for form in forms {
            assert_eq!(key(form).as_deref(), Some("https://github.com/org/repo"), "{}", form);
        }
    }

    #[test]
    fn residual_subpath_truncated() {
        assert_eq!(
            key("https://github.com/org/repo/src/server").as_deref(),
            Some("https://github.com/org/repo")
        );
        assert_eq!(
            key("https://github.com/org/repo/tree/main/src").as_deref(),
            Some("https://github.com/org/repo")
        );
    }

    #[test]
    fn noise_combinations_fully_reduce() {
        assert_eq!(
            key("https://github.com/org/repo.git?x=1").as_deref(),
            Some("https://github.com/org/repo")
        );
        assert_eq!(
            key("https://github.com/org/repo.git/tree/main").as_deref(),
            Some("https://github.com/org/repo")
        );
        assert_eq!(
            key("https://github.com/org/repo.git/extra").as_deref(),
            Some("https://github.com/org/repo")
        );
    }

    #[test]
    fn non_github_normalized_but_unkeyed() {
        let k = canonicalize("https://Hub.Docker.com/r/acme/mcp-server/ ").unwrap();
        assert_eq!(k.as_str(), "https://hub.docker.com/r/acme/mcp-server");
        assert!(!k.is_github());
    }

    #[test]
    fn host_is_not_a_path_marker() {
        assert_eq!(
            key("https://releases.example.com/mcp").as_deref(),
            Some("https://releases.example.com/mcp")
        );
    }

    #[test]
    fn empty_has_no_key() {
        assert_eq!(key(""), None);
        assert_eq!(key("   \t"), None);
        assert_eq!(key("/"), None);
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "https://GitHub.com/Org/Repo/",
            "https://github.com/org/repo/?tab=readme",
            "https://github.com/org/repo.git/",
            "https://example.com/path/?q=1#x",
            "not a url at all",
            "HTTPS://GITHUB.COM/ORG",
            "https://github.com/org/repo.git#frag.git",
        ];
        for input in inputs {
            let once = key(input).unwrap();
            assert_eq!(key(&once).as_deref(), Some(once.as_str()), "{}", input);
        }
    }

    #[test]
    fn each_rule_idempotent() {
        let input = "  HTTPS://GitHub.com/Org/Repo.git/tree/main?x=1#top/ ";
        for rule in RULES {
            let once = rule.apply(input);
            assert_eq!(rule.apply(&once), once, "{:?}", rule);
        }
    }

    #[test]
    fn strict_rejects_non_github() {
        assert_eq!(
            github_key("https://github.com/org/repo/").unwrap().as_str(),
            "https://github.com/org/repo"
        );
        assert!(matches!(
            github_key("https://gitlab.com/org/repo"),
            Err(RegistryError::NotCanonicalizable(_))
        ));
        assert!(github_key("https://github.com/org").is_err());
        assert!(github_key("").is_err());
    }
}
