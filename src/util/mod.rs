//! Small text and URL helpers shared across the crate.
//!
//! - **Text**: display-width aware truncation and cleanup for snippets
//! - **URL validation**: refuses fetch targets that could reach internal hosts

mod text;
mod url_validator;

pub use text::{collapse_whitespace, display_width, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_url, UrlValidationError};
