//! Gesetze Harvester - Download German federal laws and convert them to Markdown.
//!
//! This crate downloads the law list and the XML archives of all federal
//! laws published on gesetze-im-internet.de, and converts the XML into
//! Markdown documents with YAML front matter.
//!
//! # Example
//!
//! ```
//! use gesetze_harvester::config;
//!
//! assert!(config::validate_slug("bgb").is_ok());
//! assert_eq!(
//!     config::law_zip_url(config::GII_BASE_URL, "bgb"),
//!     "https://www.gesetze-im-internet.de/bgb/xml.zip"
//! );
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Configuration constants, validation and URL builders
//! - [`types`]: Law records, batch reports, converted documents
//! - [`error`]: Error types and Result alias
//! - [`http`]: HTTP fetching behind the [`http::Fetch`] trait
//! - [`lawlist`]: Law list scraping and persistence
//! - [`content`]: Archive download and extraction
//! - [`harvester`]: Batch downloading
//! - [`xml`]: XML utilities
//! - [`markdown`]: XML to Markdown conversion
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod harvester;
pub mod http;
pub mod lawlist;
pub mod markdown;
pub mod types;
pub mod xml;

// Re-export commonly used items
pub use config::validate_slug;
pub use error::{HarvesterError, Result};
pub use harvester::Harvester;
pub use http::{Fetch, HttpFetcher, Page};
pub use markdown::{convert_tree, law_to_markdown, parse_front_matter, FrontMatter};
pub use types::{BatchFailure, BatchReport, ConvertedLaw, LawIndex, LawRecord};
