//! Gesetze Lawgit - Commit law changes with the gazette issue that caused them.
//!
//! A run scans the working tree of a Markdown laws repository, scores every
//! changed law against the scraped gazette entries and commits the changes
//! on one branch per gazette issue, merging each branch into the stable
//! branch. Changes no entry explains go to a working branch.
//!
//! # Example
//!
//! ```
//! use gesetze_lawgit::matching::extract_citations;
//!
//! let citations = extract_citations("Zuletzt geändert durch Art. 1 G v. 27.3.2020 I 587");
//! assert!(citations.bgbl.contains(&(2020, 1, 587)));
//! ```
//!
//! # Architecture
//!
//! - [`scan`]: Working tree changes grouped per law
//! - [`identity`]: Name and abbreviation of a law
//! - [`matching`]: Pure scoring of gazette entries
//! - [`plan`]: Branches, commits and messages
//! - [`commit`]: Executing a plan with git
//! - [`reconcile`]: The autocommit run
//! - [`update`]: End-to-end repository refresh
//! - [`git_ops`]: git subprocess wrapper
//! - [`config`]: Environment configuration
//! - [`error`]: Error types and Result alias
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod commit;
pub mod config;
pub mod error;
pub mod git_ops;
pub mod identity;
pub mod matching;
pub mod plan;
pub mod reconcile;
pub mod scan;
pub mod update;

pub use commit::Outcome;
pub use config::{LawgitConfig, UpdateConfig};
pub use error::{LawgitError, Result};
pub use git_ops::GitRepo;
pub use reconcile::{autocommit, AutocommitOptions};
