//! XML utilities.

mod utils;

pub use utils::{
    find_by_path, find_child, find_children, find_descendant, get_tag_name, get_text, has_tag,
    parse_document, text_content,
};
