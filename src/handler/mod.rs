//! Request handler module
//!
//! Static file serving as a hyper `Service`, plus the response header layer
//! that wraps it.

pub mod isolation;
pub mod listing;
pub mod path;
pub mod router;
pub mod static_files;

// Re-export main entry points
pub use isolation::{cross_origin_isolation, SetResponseHeaders};
pub use router::{handle_request, FileServer, RequestContext};
