pub mod json;
pub mod markdown;

pub use json::{JsonConfig, JsonFormatter, convert_to_json};
pub use markdown::{MarkdownConfig, MarkdownFormatter, convert_to_markdown};
