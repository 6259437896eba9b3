//! Source loading and include resolution.
//!
//! The loader materializes the root file and everything it includes as one
//! contiguous byte buffer, which is what the parser scans.  `$[ <path> $]`
//! directives at the outermost scope are substituted by the referenced
//! file's bytes, resolved relative to the including file's directory; a path
//! that has already been seen anywhere in the load history is substituted by
//! nothing, so inclusion cycles terminate on their own.  Directives inside a
//! `${ $}` block are copied through untouched and rejected later by the
//! parser.
//!
//! Includes are processed with an explicit stack of partially-scanned files
//! rather than native recursion, so deeply nested include chains cannot
//! exhaust the call stack.
//!
//! Each contiguous region of the output remembers which file it came from
//! and where, so diagnostics against the composed buffer can point back into
//! the original sources.

use crate::diag::Diagnostic;
use crate::statement::{FilePos, Span};
use crate::util::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// A contiguous region of the composed buffer traced back to its origin.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    /// Name of the contributing file, as resolved from the include chain.
    pub name: String,
    /// The range of the composed buffer covered by this region.
    pub span: Span,
    /// Offset of the region's first byte within the original file.
    pub file_offset: FilePos,
    /// One-based line number of the region's first byte within the original
    /// file.
    pub line: u32,
}

/// The composed source text plus its origin map.
#[derive(Debug, Default)]
pub struct SourceBuffer {
    /// The root file with all inclusions substituted.
    pub text: Vec<u8>,
    /// Origin regions, in buffer order.
    pub regions: Vec<SourceInfo>,
}

impl SourceBuffer {
    /// Finds the origin region covering a position of the composed buffer.
    #[must_use]
    pub fn resolve(&self, pos: FilePos) -> Option<&SourceInfo> {
        let idx = self.regions.partition_point(|r| r.span.start <= pos);
        idx.checked_sub(1).map(|i| &self.regions[i])
    }
}

/// Whitespace per the Metamath spec: SP, HT, LF, FF, CR.
pub(crate) const fn is_mm_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\x0C' | b'\r')
}

/// A file being scanned for include directives.
struct Frame {
    name: String,
    dir: PathBuf,
    data: Vec<u8>,
    /// Scan position.
    pos: usize,
    /// First byte not yet copied to the output.
    region_start: usize,
    /// One-based line number at `region_start`.
    line: u32,
}

impl Frame {
    fn new(name: String, data: Vec<u8>) -> Frame {
        let dir = Path::new(&name)
            .parent()
            .map_or_else(PathBuf::new, Path::to_path_buf);
        Frame {
            name,
            dir,
            data,
            pos: 0,
            region_start: 0,
            line: 1,
        }
    }

    /// Scans the next whitespace-delimited token, returning its byte range.
    fn next_token(&mut self) -> Option<(usize, usize)> {
        let len = self.data.len();
        while self.pos < len && is_mm_space(self.data[self.pos]) {
            self.pos += 1;
        }
        if self.pos == len {
            return None;
        }
        let start = self.pos;
        while self.pos < len && !is_mm_space(self.data[self.pos]) {
            self.pos += 1;
        }
        Some((start, self.pos))
    }

    fn token(&self, (start, end): (usize, usize)) -> &[u8] {
        &self.data[start..end]
    }

    /// Restarts the uncopied region at the current scan position.
    fn begin_region(&mut self) {
        self.region_start = self.pos;
        let newlines = self.data[..self.pos].iter().filter(|&&b| b == b'\n').count();
        self.line = newlines as u32 + 1;
    }
}

struct Loader {
    preload: HashMap<String, Vec<u8>>,
    /// Include-once by path as spelled in the directive chain.
    pre_included: HashSet<String>,
    /// Include-once by canonicalized filesystem path.
    included: HashSet<PathBuf>,
    buffer: SourceBuffer,
    /// `${ $}` nesting depth across the whole include chain.
    depth: usize,
}

/// Loads the root file and resolves inclusions into one buffer.
///
/// `preload` supplies in-memory files consulted before the filesystem, keyed
/// by name; this backs the CLI `--text` facility and the test suite.
pub(crate) fn load(
    root: String,
    preload: Vec<(String, Vec<u8>)>,
) -> Result<SourceBuffer, Diagnostic> {
    let mut loader = Loader {
        preload: preload.into_iter().collect(),
        pre_included: HashSet::default(),
        included: HashSet::default(),
        buffer: SourceBuffer::default(),
        depth: 0,
    };
    let mut stack = Vec::new();
    if let Some(data) = loader.read_file(&root)? {
        stack.push(Frame::new(root, data));
    }
    while let Some(frame) = stack.pop() {
        loader.scan(frame, &mut stack)?;
    }
    Ok(loader.buffer)
}

impl Loader {
    /// Fetches a file's bytes, or `None` if it has been included before.
    fn read_file(&mut self, name: &str) -> Result<Option<Vec<u8>>, Diagnostic> {
        if !self.pre_included.insert(name.to_owned()) {
            return Ok(None);
        }
        if let Some(data) = self.preload.get(name) {
            return Ok(Some(data.clone()));
        }
        let path = PathBuf::from(name);
        if let Ok(cpath) = path.canonicalize() {
            if !self.included.insert(cpath) {
                return Ok(None);
            }
        }
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(err) => Err(Diagnostic::IoError(format!("{name}: {err}"))),
        }
    }

    /// Copies the frame's pending region, up to `upto`, into the output.
    fn flush(&mut self, frame: &Frame, upto: usize) {
        if frame.region_start < upto {
            let start = self.buffer.text.len();
            self.buffer
                .text
                .extend_from_slice(&frame.data[frame.region_start..upto]);
            self.buffer.regions.push(SourceInfo {
                name: frame.name.clone(),
                span: Span::new(start, self.buffer.text.len()),
                file_offset: frame.region_start as FilePos,
                line: frame.line,
            });
        }
    }

    /// Scans one file for include directives, copying everything else
    /// through.  If an include needs processing, the current frame and the
    /// included file are pushed for the caller to resume.
    fn scan(&mut self, mut frame: Frame, stack: &mut Vec<Frame>) -> Result<(), Diagnostic> {
        loop {
            let Some(tok) = frame.next_token() else {
                self.flush(&frame, frame.data.len());
                return Ok(());
            };
            if frame.token(tok) == b"$(" {
                // tokens inside comments have no effect on inclusion; an
                // unterminated comment is copied through and diagnosed by
                // the parser
                while let Some(t) = frame.next_token() {
                    if frame.token(t) == b"$)" {
                        break;
                    }
                }
            } else if frame.token(tok) == b"${" {
                self.depth += 1;
            } else if frame.token(tok) == b"$}" {
                self.depth = self.depth.saturating_sub(1);
            } else if frame.token(tok) == b"$[" && self.depth == 0 {
                let Some(ptok) = frame.next_token() else {
                    return Err(Diagnostic::UnclosedInclude(frame.name));
                };
                let path = frame.token(ptok).to_vec();
                if path == b"$]" {
                    return Err(Diagnostic::EmptyFilename(frame.name));
                }
                if path.contains(&b'$') {
                    return Err(Diagnostic::FilenameDollar(frame.name));
                }
                match frame.next_token() {
                    Some(t) if frame.token(t) == b"$]" => {}
                    _ => return Err(Diagnostic::UnclosedInclude(frame.name)),
                }
                // the directive itself is never copied out
                self.flush(&frame, tok.0);
                frame.begin_region();
                let child = frame.dir.join(String::from_utf8_lossy(&path).as_ref());
                let child_name = child.to_string_lossy().into_owned();
                if let Some(data) = self.read_file(&child_name)? {
                    stack.push(frame);
                    stack.push(Frame::new(child_name, data));
                    return Ok(());
                }
            }
        }
    }
}
