//! Request path resolution
//!
//! Maps the path component of a request target onto the served directory.
//! Traversal above the root is impossible by construction: `..` can only pop
//! segments that were pushed by the same request path.

use std::path::{Path, PathBuf};

use crate::http::encoding::percent_decode;

/// Why a request path could not be mapped to the filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Decoded bytes are not UTF-8
    InvalidEncoding,
    /// Decoded path contains a NUL byte
    NulByte,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEncoding => write!(f, "request path is not valid UTF-8"),
            Self::NulByte => write!(f, "request path contains a NUL byte"),
        }
    }
}

/// Decoded and normalised request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    /// Percent-decoded path as sent by the client
    pub decoded: String,
    /// Normalised segments relative to the root
    pub segments: Vec<String>,
    /// Whether the request path ended in `/`
    pub trailing_slash: bool,
}

impl RequestPath {
    /// Decode and normalise the path component of a request target
    pub fn parse(raw_path: &str) -> Result<Self, PathError> {
        let decoded =
            String::from_utf8(percent_decode(raw_path)).map_err(|_| PathError::InvalidEncoding)?;
        if decoded.contains('\0') {
            return Err(PathError::NulByte);
        }

        let mut segments: Vec<String> = Vec::new();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                // Drive prefixes and alternate separators (Windows)
                s if s.chars().any(std::path::is_separator)
                    || (cfg!(windows) && s.contains(':')) => {}
                s => segments.push(s.to_string()),
            }
        }

        Ok(Self {
            trailing_slash: raw_path.ends_with('/'),
            decoded,
            segments,
        })
    }

    /// Join the normalised segments onto the served root
    pub fn resolve(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(&self.segments);
        path
    }
}

/// Check that a resolved path, after following symlinks, stays inside root
///
/// `root` must already be canonical. A path that cannot be canonicalised is
/// treated as outside.
pub async fn is_within_root(path: &Path, root: &Path) -> bool {
    tokio::fs::canonicalize(path)
        .await
        .is_ok_and(|canonical| canonical.starts_with(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_path() {
        let path = RequestPath::parse("/css/site.css").unwrap();
        assert_eq!(path.segments, vec!["css", "site.css"]);
        assert!(!path.trailing_slash);
        assert_eq!(path.decoded, "/css/site.css");
    }

    #[test]
    fn test_parse_root_and_trailing_slash() {
        let root = RequestPath::parse("/").unwrap();
        assert!(root.segments.is_empty());
        assert!(root.trailing_slash);

        let dir = RequestPath::parse("/docs/").unwrap();
        assert_eq!(dir.segments, vec!["docs"]);
        assert!(dir.trailing_slash);
    }

    #[test]
    fn test_parse_decodes_percent_escapes() {
        let path = RequestPath::parse("/my%20file.txt").unwrap();
        assert_eq!(path.segments, vec!["my file.txt"]);
        assert_eq!(path.decoded, "/my file.txt");
    }

    #[test]
    fn test_dot_segments_never_escape_root() {
        let path = RequestPath::parse("/../../etc/passwd").unwrap();
        assert_eq!(path.segments, vec!["etc", "passwd"]);

        let path = RequestPath::parse("/a/./b/../c").unwrap();
        assert_eq!(path.segments, vec!["a", "c"]);

        let path = RequestPath::parse("/%2e%2e/%2E%2E/secret").unwrap();
        assert_eq!(path.segments, vec!["secret"]);
    }

    #[test]
    fn test_encoded_slash_is_a_separator() {
        let path = RequestPath::parse("/a%2F..%2F..%2Fb").unwrap();
        assert_eq!(path.segments, vec!["b"]);
    }

    #[test]
    fn test_malformed_paths() {
        assert_eq!(RequestPath::parse("/%FF"), Err(PathError::InvalidEncoding));
        assert_eq!(RequestPath::parse("/a%00b"), Err(PathError::NulByte));
    }

    #[test]
    fn test_resolve_joins_onto_root() {
        let path = RequestPath::parse("/a/b.txt").unwrap();
        assert_eq!(
            path.resolve(Path::new("/srv/www")),
            PathBuf::from("/srv/www/a/b.txt")
        );
        let root = RequestPath::parse("/").unwrap();
        assert_eq!(
            root.resolve(Path::new("/srv/www")),
            PathBuf::from("/srv/www")
        );
    }
}
