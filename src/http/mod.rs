//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from
//! filesystem access and request dispatch.

pub mod cache;
pub mod encoding;
pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_304_response, build_error_response, build_file_response, build_html_response,
    build_redirect_response,
};
