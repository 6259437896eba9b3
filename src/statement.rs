//! Core datatypes shared by the parser, the database, and the verifier:
//! source positions, spans, and token representations.
//!
//! The parser works with borrowed `TokenPtr` slices into the composed source
//! buffer and only copies a spelling onto the heap (as a `Token`) when it has
//! to survive the parse, e.g. in the interning tables or in a raw proof.

/// Semantic type for positions in the composed source buffer.
///
/// Due to the use of half-open ranges, databases are limited to 4 GiB - 1
/// after include resolution.
pub type FilePos = u32;

/// Semantic type for position ranges in the composed source buffer.
///
/// Spans will generally not be empty.  An empty span at position 0 is called
/// a null span and is used as a sentinel by the scanner.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Span {
    /// Index of first byte of the range.
    pub start: FilePos,
    /// Index one past the last byte of the range.
    pub end: FilePos,
}

impl Span {
    /// The null span.
    pub const NULL: Span = Span::new(0, 0);

    /// Coercion from array index pairs.
    #[inline]
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Span {
        Span {
            start: start as FilePos,
            end: end as FilePos,
        }
    }

    /// Checks for the null span, i.e. zero length at offset zero.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.end == 0
    }

    /// Given a position span, extract the corresponding bytes from a buffer.
    #[inline]
    #[must_use]
    pub fn as_ref(self, buf: &[u8]) -> &[u8] {
        &buf[self.start as usize..self.end as usize]
    }
}

/// Semantic type for tokens which have been copied onto the heap.
///
/// Tokens are non-empty and consist of ASCII graphic characters; the
/// compressed proof decoder depends on tokens containing bytes below 128.
pub type Token = Box<[u8]>;

/// Semantic type for tokens which have not been copied.
pub type TokenPtr<'a> = &'a [u8];

/// Transmutes a token into a Rust string.
#[must_use]
pub fn as_str(ptr: TokenPtr<'_>) -> &str {
    std::str::from_utf8(ptr).expect("tokens are verified ASCII")
}

/// Types of math symbols in declarations.
///
/// A symbol is exactly one of the two for the lifetime of the database; a
/// spelling declared `$c` can never later appear in a `$v` or vice versa.
#[derive(Eq, PartialEq, Hash, Copy, Clone, Debug)]
pub enum SymbolType {
    /// Declared by `$v`.
    Variable,
    /// Declared by `$c`.
    Constant,
}
