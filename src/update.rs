//! The end-to-end flow: scan a parsed tree for `fetchgit` calls, prefetch
//! fresh metadata for each, and rewrite the source file in place.
//!
//! The tree arrives from an external front end; this module never parses.
//! Call sites are prefetched sequentially, and the patcher runs at most once
//! per file, after every reply has been validated.

use crate::expr::{App, Expr};
use crate::fetch::{FetchError, Prefetch};
use crate::patch::{apply_replacements, PatchError, Replacement};
use crate::scan::{find_calls, MatchedCall, StringAndPos};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// The function name recognized in the tree.
pub const FETCH_GIT: &str = "fetchgit";

/// The string fields a call must bind for an update to be possible.
pub const REQUIRED_FIELDS: &[&str] = &["url", "rev", "sha256"];

/// One `fetchgit` call site with its three located string literals.
#[derive(Debug, Clone)]
pub struct FetchGitCall<'a> {
    pub app: &'a App,
    pub url: StringAndPos<'a>,
    pub rev: StringAndPos<'a>,
    pub sha256: StringAndPos<'a>,
}

impl<'a> FetchGitCall<'a> {
    fn from_match(matched: MatchedCall<'a>) -> Option<Self> {
        Some(FetchGitCall {
            app: matched.app,
            url: *matched.field("url")?,
            rev: *matched.field("rev")?,
            sha256: *matched.field("sha256")?,
        })
    }
}

/// All `fetchgit` call sites under `root`, in document order.
pub fn find_fetch_git_calls(root: &Expr) -> Vec<FetchGitCall<'_>> {
    find_calls(root, FETCH_GIT, REQUIRED_FIELDS)
        .into_iter()
        .filter_map(FetchGitCall::from_match)
        .collect()
}

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// What [`update_file`] did to the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The file was rewritten with this many replacements.
    Updated { replacements: usize },
    /// Every call site already pointed at the latest revision; the file was
    /// not opened for writing at all.
    AlreadyUpToDate,
}

/// Prefetch every call site under `root` and plan the resulting
/// replacements, dropping the ones that would change nothing.
///
/// A reply whose `url` differs from the matched literal is rejected: the
/// substitution would silently retarget the wrong repository.
pub fn plan_replacements(
    root: &Expr,
    prefetcher: &dyn Prefetch,
) -> Result<Vec<Replacement>, UpdateError> {
    let calls = find_fetch_git_calls(root);
    debug!(call_sites = calls.len(), "scanned tree");

    let mut replacements = Vec::new();
    for call in &calls {
        let url = call.url.value();
        let info = prefetcher.prefetch(url)?;
        if info.url != url {
            return Err(FetchError::UrlMismatch {
                want: url.to_string(),
                got: info.url,
            }
            .into());
        }
        let hash = info.hash()?.to_string();

        for replacement in [
            call.rev.replacement(&info.rev),
            call.sha256.replacement(&hash),
        ] {
            if !replacement.is_noop() {
                replacements.push(replacement);
            }
        }
    }

    Ok(replacements)
}

/// Update every `fetchgit` call in `path`, whose parsed tree is `root`.
///
/// No write happens unless at least one replacement is pending and all of
/// them verify against the file's current content.
pub fn update_file(
    path: &Path,
    root: &Expr,
    prefetcher: &dyn Prefetch,
) -> Result<UpdateOutcome, UpdateError> {
    let replacements = plan_replacements(root, prefetcher)?;

    if replacements.is_empty() {
        info!(path = %path.display(), "already up-to-date");
        return Ok(UpdateOutcome::AlreadyUpToDate);
    }

    apply_replacements(path, &replacements)?;
    info!(
        path = %path.display(),
        replacements = replacements.len(),
        "updated"
    );
    Ok(UpdateOutcome::Updated {
        replacements: replacements.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{AttrSet, List, Pos};
    use crate::fetch::GitInfo;
    use std::cell::RefCell;

    /// Canned prefetcher recording the urls it was asked about.
    struct Canned {
        rev: String,
        sha256: String,
        url_override: Option<String>,
        asked: RefCell<Vec<String>>,
    }

    impl Canned {
        fn new(rev: &str, sha256: &str) -> Self {
            Canned {
                rev: rev.to_string(),
                sha256: sha256.to_string(),
                url_override: None,
                asked: RefCell::new(Vec::new()),
            }
        }
    }

    impl Prefetch for Canned {
        fn prefetch(&self, url: &str) -> Result<GitInfo, FetchError> {
            self.asked.borrow_mut().push(url.to_string());
            Ok(GitInfo {
                url: self.url_override.clone().unwrap_or_else(|| url.to_string()),
                rev: self.rev.clone(),
                sha256: Some(self.sha256.clone()),
                hash: None,
            })
        }
    }

    fn call(url: &str, line: u32) -> Expr {
        let mut set = AttrSet::default();
        set.bind("url", Pos::new(line, 3), Expr::string(url));
        set.bind("rev", Pos::new(line + 1, 3), Expr::string("abc123"));
        set.bind("sha256", Pos::new(line + 2, 3), Expr::string("0sha"));
        Expr::app(Pos::new(line - 1, 9), Expr::var(FETCH_GIT), Expr::Attrs(set))
    }

    #[test]
    fn plans_rev_and_hash_replacements_per_call_site() {
        let tree = Expr::List(List {
            elems: vec![call("https://a.example/x.git", 2), call("https://b.example/y.git", 10)],
        });
        let prefetcher = Canned::new("def456", "1newsha");

        let planned = plan_replacements(&tree, &prefetcher).unwrap();

        assert_eq!(planned.len(), 4);
        assert_eq!(
            prefetcher.asked.borrow().as_slice(),
            ["https://a.example/x.git", "https://b.example/y.git"]
        );
        assert_eq!(planned[0].new_text, "\"def456\"");
        assert_eq!(planned[1].new_text, "\"1newsha\"");
    }

    #[test]
    fn unchanged_metadata_plans_nothing() {
        let tree = call("https://a.example/x.git", 2);
        let prefetcher = Canned::new("abc123", "0sha");

        assert!(plan_replacements(&tree, &prefetcher).unwrap().is_empty());
    }

    #[test]
    fn mismatched_reply_url_is_rejected() {
        let tree = call("https://a.example/x.git", 2);
        let mut prefetcher = Canned::new("def456", "1newsha");
        prefetcher.url_override = Some("https://evil.example/other.git".into());

        let err = plan_replacements(&tree, &prefetcher).unwrap_err();
        assert!(matches!(
            err,
            UpdateError::Fetch(FetchError::UrlMismatch { .. })
        ));
    }

    #[test]
    fn tree_without_calls_is_up_to_date() {
        let tree = Expr::Int(7);
        let prefetcher = Canned::new("def456", "1newsha");

        let outcome = update_file(
            Path::new("/nonexistent/never-opened.nix"),
            &tree,
            &prefetcher,
        )
        .unwrap();

        assert_eq!(outcome, UpdateOutcome::AlreadyUpToDate);
        assert!(prefetcher.asked.borrow().is_empty());
    }
}
