//! Upstream repository metadata via `nix-prefetch-git`.
//!
//! The command is an external collaborator: its standard output is captured
//! as UTF-8 and decoded as JSON, its diagnostics stay attached to this
//! process's stderr (unless quieted), and any failure to start, exit cleanly
//! or produce decodable output is a hard error carrying the command line.

use serde::Deserialize;
use std::io;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

/// Decoded reply of a prefetch run.
///
/// Newer `nix-prefetch-git` versions emit both `sha256` and an SRI `hash`;
/// older ones only `sha256`. `url` and `rev` are always required.
#[derive(Debug, Clone, Deserialize)]
pub struct GitInfo {
    pub url: String,
    pub rev: String,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
}

impl GitInfo {
    /// The hash to substitute, preferring the `sha256` key.
    pub fn hash(&self) -> Result<&str, FetchError> {
        self.sha256
            .as_deref()
            .or(self.hash.as_deref())
            .ok_or(FetchError::MissingHash)
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` failed{}", exit_code_suffix(.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("output of `{command}` is not valid UTF-8")]
    InvalidUtf8 { command: String },

    #[error("output of `{command}` did not decode to the expected record: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("prefetch reply carries neither a sha256 nor a hash key")]
    MissingHash,

    #[error("prefetch reply is for {got:?}, expected {want:?}")]
    UrlMismatch { want: String, got: String },
}

fn exit_code_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => String::new(),
    }
}

/// Something that can fetch fresh metadata for a repository url.
///
/// The production implementation shells out; tests substitute a canned one.
pub trait Prefetch {
    fn prefetch(&self, url: &str) -> Result<GitInfo, FetchError>;
}

/// Runs `nix-prefetch-git <url>`, blocking until the subprocess exits.
///
/// Requires network access. With `quiet` set, the subprocess's stderr is
/// discarded instead of inherited.
#[derive(Debug, Clone, Default)]
pub struct NixPrefetchGit {
    pub quiet: bool,
}

impl NixPrefetchGit {
    const PROGRAM: &'static str = "nix-prefetch-git";

    fn command_line(url: &str) -> String {
        format!("{} {url}", Self::PROGRAM)
    }
}

impl Prefetch for NixPrefetchGit {
    fn prefetch(&self, url: &str) -> Result<GitInfo, FetchError> {
        let command = Self::command_line(url);
        debug!(%url, quiet = self.quiet, "prefetching");

        let output = Command::new(Self::PROGRAM)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if self.quiet {
                Stdio::null()
            } else {
                Stdio::inherit()
            })
            .output()
            .map_err(|source| FetchError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(FetchError::CommandFailed {
                command,
                code: output.status.code(),
            });
        }

        let stdout = std::str::from_utf8(&output.stdout)
            .map_err(|_| FetchError::InvalidUtf8 {
                command: command.clone(),
            })?;

        serde_json::from_str(stdout).map_err(|source| FetchError::Decode { command, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_reply_with_sha256() {
        let info: GitInfo = serde_json::from_str(
            r#"{
                "url": "https://example.com/repo.git",
                "rev": "def456",
                "sha256": "1aaa",
                "date": "2024-01-01T00:00:00+00:00"
            }"#,
        )
        .unwrap();

        assert_eq!(info.rev, "def456");
        assert_eq!(info.hash().unwrap(), "1aaa");
    }

    #[test]
    fn hash_key_is_a_fallback() {
        let info: GitInfo = serde_json::from_str(
            r#"{"url": "u", "rev": "r", "hash": "sha256-xyz"}"#,
        )
        .unwrap();
        assert_eq!(info.hash().unwrap(), "sha256-xyz");

        let info: GitInfo = serde_json::from_str(
            r#"{"url": "u", "rev": "r", "sha256": "1aaa", "hash": "sha256-xyz"}"#,
        )
        .unwrap();
        assert_eq!(info.hash().unwrap(), "1aaa");
    }

    #[test]
    fn reply_without_any_hash_is_an_error() {
        let info: GitInfo = serde_json::from_str(r#"{"url": "u", "rev": "r"}"#).unwrap();
        assert!(matches!(info.hash(), Err(FetchError::MissingHash)));
    }

    #[test]
    fn reply_missing_rev_fails_to_decode() {
        let result: Result<GitInfo, _> = serde_json::from_str(r#"{"url": "u"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn command_failure_message_carries_the_command_line() {
        let err = FetchError::CommandFailed {
            command: NixPrefetchGit::command_line("https://example.com/repo.git"),
            code: Some(1),
        };
        assert_eq!(
            err.to_string(),
            "`nix-prefetch-git https://example.com/repo.git` failed with exit code 1"
        );
    }
}
