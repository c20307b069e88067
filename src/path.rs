//! # Document Paths
//!
//! A [`Path`] locates a node inside a resource document as an ordered list of
//! [`Segment`]s. Paths are structured values: the resolver compares, orders and splices with
//! them directly, and only renders them to strings for logs and errors.
//!
//! ## Rendering
//!
//! Field names are joined with `.` and indices are wrapped in brackets, so the path
//! `[comments, 2, author]` renders as `comments[2].author`. Field names containing `.`, `[`, `]`,
//! `"` or `\` are escaped with a backslash, and an empty field name renders as `""`. This keeps
//! rendering unique: [`Path::from_str`] recovers exactly the segments that were rendered.
//!
//! ## Ordering
//!
//! Paths order lexicographically by segment, so an ancestor always sorts before its
//! descendants. The [`Ledger`](crate::Ledger) relies on this when splicing entries.

use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Field(String),
    Index(usize),
}

/// Location of a node inside a document. The empty path designates the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<Segment>,
}

/// Error returned when a rendered path cannot be parsed back.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathParseError {
    #[error("Unterminated index at offset {0}")]
    UnterminatedIndex(usize),
    #[error("Invalid index '{0}'")]
    InvalidIndex(String),
    #[error("Empty field name at offset {0}")]
    EmptyField(usize),
    #[error("Dangling escape at end of path")]
    DanglingEscape,
}

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns a new path with `name` appended.
    pub fn field(&self, name: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Field(name.into()));
        next
    }

    /// Returns a new path with `index` appended.
    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Index(index));
        next
    }

    /// Returns `true` if `self` is a strict prefix of `other`.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.segments.len() < other.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Index of the last segment, if it is an index.
    pub fn last_index(&self) -> Option<usize> {
        match self.segments.last() {
            Some(Segment::Index(index)) => Some(*index),
            _ => None,
        }
    }

    /// Borrows the node at this path.
    pub fn get<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(root, |node, segment| match segment {
                Segment::Field(name) => node.as_object()?.get(name),
                Segment::Index(index) => node.as_array()?.get(*index),
            })
    }

    /// Mutably borrows the node at this path.
    pub fn get_mut<'v>(&self, root: &'v mut Value) -> Option<&'v mut Value> {
        self.segments
            .iter()
            .try_fold(root, |node, segment| match segment {
                Segment::Field(name) => node.as_object_mut()?.get_mut(name),
                Segment::Index(index) => node.as_array_mut()?.get_mut(*index),
            })
    }

    /// Writes `value` at this path.
    ///
    /// Missing intermediate fields are created as empty objects (a `null` container is
    /// promoted to an object). Indices must already exist. Returns `false` if the path cannot
    /// be reached, leaving `root` untouched below the unreachable point.
    pub fn set(&self, root: &mut Value, value: Value) -> bool {
        let Some((last, parents)) = self.segments.split_last() else {
            *root = value;
            return true;
        };

        let mut node = root;
        for segment in parents {
            node = match segment {
                Segment::Field(name) => {
                    if node.is_null() {
                        *node = Value::Object(Map::new());
                    }
                    let Some(object) = node.as_object_mut() else {
                        return false;
                    };
                    object
                        .entry(name.clone())
                        .or_insert_with(|| Value::Object(Map::new()))
                }
                Segment::Index(index) => match node.as_array_mut().and_then(|a| a.get_mut(*index)) {
                    Some(child) => child,
                    None => return false,
                },
            };
        }

        match last {
            Segment::Field(name) => {
                if node.is_null() {
                    *node = Value::Object(Map::new());
                }
                match node.as_object_mut() {
                    Some(object) => {
                        object.insert(name.clone(), value);
                        true
                    }
                    None => false,
                }
            }
            Segment::Index(index) => match node.as_array_mut().and_then(|a| a.get_mut(*index)) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
        }
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if name.is_empty() {
        return write!(f, "\"\"");
    }
    for ch in name.chars() {
        if matches!(ch, '.' | '[' | ']' | '"' | '\\') {
            write!(f, "\\")?;
        }
        write!(f, "{}", ch)?;
    }
    Ok(())
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) => {
                    if position > 0 {
                        write!(f, ".")?;
                    }
                    write_escaped(f, name)?;
                }
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        let mut chars = s.char_indices();
        let mut field = String::new();
        let mut field_open = false;
        // Set by an unescaped `"`, which marks an intentionally empty field name.
        let mut field_quoted = false;
        let mut field_start = 0;

        let close_field = |field: &mut String,
                           open: &mut bool,
                           quoted: &mut bool,
                           start: usize,
                           segments: &mut Vec<Segment>| {
            if !*open {
                return Ok(());
            }
            if field.is_empty() && !*quoted {
                return Err(PathParseError::EmptyField(start));
            }
            segments.push(Segment::Field(std::mem::take(field)));
            *open = false;
            *quoted = false;
            Ok(())
        };

        if !s.is_empty() && !s.starts_with('[') {
            field_open = true;
        }

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '\\' => {
                    let (_, escaped) = chars.next().ok_or(PathParseError::DanglingEscape)?;
                    field.push(escaped);
                }
                '.' => {
                    close_field(
                        &mut field,
                        &mut field_open,
                        &mut field_quoted,
                        field_start,
                        &mut segments,
                    )?;
                    field_open = true;
                    field_start = offset + 1;
                }
                '[' => {
                    close_field(
                        &mut field,
                        &mut field_open,
                        &mut field_quoted,
                        field_start,
                        &mut segments,
                    )?;
                    let mut digits = String::new();
                    let mut closed = false;
                    for (_, next) in chars.by_ref() {
                        if next == ']' {
                            closed = true;
                            break;
                        }
                        digits.push(next);
                    }
                    if !closed {
                        return Err(PathParseError::UnterminatedIndex(offset));
                    }
                    let index = digits
                        .parse::<usize>()
                        .map_err(|_| PathParseError::InvalidIndex(digits.clone()))?;
                    segments.push(Segment::Index(index));
                }
                '"' => field_quoted = true,
                other => field.push(other),
            }
        }
        close_field(
            &mut field,
            &mut field_open,
            &mut field_quoted,
            field_start,
            &mut segments,
        )?;

        Ok(Self { segments })
    }
}
