//! Gesetze Gazette - Scrape the tables of contents of German federal gazettes.
//!
//! Supported gazettes are the Bundesgesetzblatt (BGBl), the Bundesanzeiger
//! (BAnz) and the Verkehrsblatt (VkBl). Scraped entries are appended to
//! JSON dumps which the commit tooling reads to explain law changes.
//!
//! # Example
//!
//! ```
//! use gesetze_gazette::html::elements;
//!
//! let rows = elements("<tr><td>a</td></tr><tr><td>b</td></tr>", "tr");
//! assert_eq!(rows.len(), 2);
//! ```
//!
//! # Architecture
//!
//! - [`types`]: Gazette entries
//! - [`config`]: Site locations and year ranges
//! - [`error`]: Error types and Result alias
//! - [`html`]: HTML scanning helpers
//! - [`pages`]: Paged scraping with partial results
//! - [`scraper`]: BGBl, BAnz and VkBl scrapers
//! - [`store`]: Append-only JSON dumps
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod html;
pub mod pages;
pub mod scraper;
pub mod store;
pub mod types;

pub use config::YearRange;
pub use error::{GazetteError, Result};
pub use pages::{collect_partial, IndexPages, PartialScrape, Scrape};
pub use store::{append_new, load_entries, merge_new};
pub use types::{GazetteEntry, GazetteKind, PageRange};
