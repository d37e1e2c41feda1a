//! Paths into a composition's content tree.
//!
//! A path is a dot-separated sequence of segments; a segment is either a
//! field name or a non-negative array index ("tracks.0.notes.3").

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A segment in a content path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object key.
    Key(String),
    /// Array index.
    Index(usize),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

/// A path into a document's content tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentPath(Vec<PathSegment>);

impl ContentPath {
    /// Create an empty (root) path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a path from segments.
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Parse a path from dot notation (e.g., "tempo" or "tracks.0.notes").
    ///
    /// A segment that parses as a non-negative integer becomes an index.
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        let segments = path
            .split('.')
            .map(|s| {
                if let Ok(idx) = s.parse::<usize>() {
                    PathSegment::Index(idx)
                } else {
                    PathSegment::Key(s.to_string())
                }
            })
            .collect();
        Self(segments)
    }

    /// Get the segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Check if this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the last segment.
    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// Split into the intermediate segments and the final segment.
    ///
    /// Returns `None` for the root path.
    pub fn split_last(&self) -> Option<(&[PathSegment], &PathSegment)> {
        self.0.split_last().map(|(last, rest)| (rest, last))
    }

    /// Append a segment.
    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    /// Create a child path with a key.
    pub fn child_key(&self, key: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.push(PathSegment::Key(key.into()));
        new
    }

    /// Create a child path with an index.
    pub fn child_index(&self, index: usize) -> Self {
        let mut new = self.clone();
        new.push(PathSegment::Index(index));
        new
    }
}

impl std::fmt::Display for ContentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", s.join("."))
    }
}

impl From<&str> for ContentPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

// Paths travel on the wire as their dotted string form.
impl Serialize for ContentPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.split('.').any(|s| s.is_empty()) && !raw.is_empty() {
            return Err(D::Error::custom(format!("empty path segment in {:?}", raw)));
        }
        Ok(Self::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys_and_indices() {
        let path = ContentPath::parse("tracks.0.notes");
        assert_eq!(path.segments().len(), 3);
        assert_eq!(path.segments()[0], PathSegment::Key("tracks".into()));
        assert_eq!(path.segments()[1], PathSegment::Index(0));
        assert_eq!(path.segments()[2], PathSegment::Key("notes".into()));
    }

    #[test]
    fn test_root_path() {
        let path = ContentPath::parse("");
        assert!(path.is_root());
        assert!(path.split_last().is_none());
    }

    #[test]
    fn test_display_roundtrip() {
        let raw = "tracks.2.notes.0.pitch";
        assert_eq!(ContentPath::parse(raw).to_string(), raw);
    }

    #[test]
    fn test_child_builders() {
        let path = ContentPath::root().child_key("tracks").child_index(1);
        assert_eq!(path.to_string(), "tracks.1");
    }

    #[test]
    fn test_serde_as_string() {
        let path = ContentPath::parse("tracks.0.name");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"tracks.0.name\"");
        let back: ContentPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
