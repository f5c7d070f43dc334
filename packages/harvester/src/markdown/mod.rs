//! Markdown output generation for law files.

mod convert;
mod front_matter;
mod render;
mod text;

pub use convert::{convert_file, convert_tree, INDEX_FILE};
pub use front_matter::{parse_front_matter, FrontMatter};
pub use render::{law_to_markdown, slugify};
pub use text::{escape_emphasis, escape_list_start};
