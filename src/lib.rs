//! nix-update-git: rewrite `fetchgit` calls in Nix expressions to the latest
//! upstream revision.
//!
//! # Architecture
//!
//! The crate consumes an already-parsed expression tree ([`expr::Expr`],
//! produced by an external front end) and flows strictly downward:
//!
//! 1. [`visit`] dispatches over the closed set of node variants and walks the
//!    tree depth-first, pre-order.
//! 2. [`scan`] recognizes "call to a named function with a record argument
//!    binding specific string fields" and derives each literal's source
//!    position.
//! 3. [`fetch`] shells out to `nix-prefetch-git` and decodes its JSON reply.
//! 4. [`patch`] applies the planned [`patch::Replacement`]s to the file,
//!    verifying the expected old text at every position before anything is
//!    written.
//!
//! [`update`] ties the stages together. Nothing above the patcher performs
//! file I/O.
//!
//! # Safety
//!
//! - Every replacement verifies its expected before-text at the recorded
//!   (line, column) before applying
//! - Output is buffered in full and committed atomically (tempfile + fsync +
//!   rename); a failed verification leaves the file byte-identical
//! - A prefetch reply whose url disagrees with the matched literal is
//!   rejected before any write
//!
//! # Example
//!
//! ```no_run
//! use nix_update_git::{update_file, NixPrefetchGit};
//! use std::path::Path;
//!
//! # fn parse(_: &Path) -> nix_update_git::Expr { unimplemented!() }
//! let path = Path::new("default.nix");
//! let tree = parse(path); // external expression front end
//!
//! let prefetcher = NixPrefetchGit { quiet: false };
//! match update_file(path, &tree, &prefetcher) {
//!     Ok(outcome) => println!("{outcome:?}"),
//!     Err(e) => eprintln!("update failed: {e}"),
//! }
//! ```

pub mod expr;
pub mod fetch;
pub mod patch;
pub mod scan;
pub mod update;
pub mod visit;

// Re-exports
pub use expr::{App, AttrSet, Expr, Pos, StrLit};
pub use fetch::{FetchError, GitInfo, NixPrefetchGit, Prefetch};
pub use patch::{apply_replacements, PatchError, Replacement};
pub use scan::{find_calls, match_call, MatchedCall, StringAndPos};
pub use update::{
    find_fetch_git_calls, plan_replacements, update_file, FetchGitCall, UpdateError,
    UpdateOutcome,
};
pub use visit::{dispatch, variant_name, Delegate, DepthFirst, ExprVisitor, VariantName};
