//! Source positions: files, offsets, lexical extents.

use std::fmt;

pub use text_size::TextRange;
pub use text_size::TextSize;

/// Handle for a source file of the compilation unit.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FileId(pub u32);

impl FileId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

/// A byte offset inside a specific file.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FilePosition {
    pub file: FileId,
    pub offset: TextSize,
}

impl FilePosition {
    pub fn new(file: FileId, offset: impl Into<TextSize>) -> Self {
        Self {
            file,
            offset: offset.into(),
        }
    }
}

/// A range inside a specific file.
///
/// Used for import extents: the names of a directive are visible at every
/// position the range contains (start inclusive, end exclusive).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FileRange {
    pub file: FileId,
    pub range: TextRange,
}

impl FileRange {
    pub fn new(file: FileId, start: impl Into<TextSize>, end: impl Into<TextSize>) -> Self {
        Self {
            file,
            range: TextRange::new(start.into(), end.into()),
        }
    }

    pub fn start(&self) -> FilePosition {
        FilePosition {
            file: self.file,
            offset: self.range.start(),
        }
    }

    /// Whether `pos` lies inside this range.
    pub fn contains(&self, pos: FilePosition) -> bool {
        self.file == pos.file && self.range.contains(pos.offset)
    }

    /// Whether `other` lies entirely inside this range.
    pub fn contains_range(&self, other: FileRange) -> bool {
        self.file == other.file && self.range.contains_range(other.range)
    }
}

/// A line and column position in source text.
///
/// Both line and column are 0-indexed internally, but displayed as 1-indexed.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct LineCol {
    /// 0-indexed line number
    pub line: u32,
    /// 0-indexed column (in UTF-8 bytes, not characters)
    pub col: u32,
}

impl LineCol {
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Debug for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

/// Maps byte offsets of one file to line/column positions for diagnostics.
#[derive(Clone, Debug)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];

        for (offset, c) in text.char_indices() {
            if c == '\n' {
                line_starts.push(TextSize::from((offset + 1) as u32));
            }
        }

        Self { line_starts }
    }

    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);

        let col = offset - self.line_starts[line];

        LineCol {
            line: line as u32,
            col: col.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.line_starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line_starts.is_empty()
    }
}
