//! The `Database` type and the high-level parse/verify entry points.
//!
//! A database is built in two strictly sequential phases: the parser
//! mutates it while consuming the composed source buffer, and afterwards it
//! is treated as immutable by the verifier.  Interned symbols and labels are
//! owned here and referenced by id everywhere else; assertion frames own
//! deep copies of their declaring scopes, so nothing in a frame is
//! invalidated by later scope pops.

use crate::diag::Diagnostic;
use crate::nameck::{Atom, Label, Nameset};
use crate::parser;
use crate::scopeck::Frame;
use crate::source::{self, SourceBuffer};
use crate::statement::{Token, TokenPtr};
use crate::util::HashMap;
use crate::verify::{self, VerifyFailure, VerifySummary};
use log::debug;

/// An `$a` or `$p` statement, frozen at its declaration.
#[derive(Debug, Clone)]
pub struct Assertion {
    /// The statement label.
    pub label: Label,
    /// Conclusion, mandatory hypotheses, and scope snapshot.
    pub frame: Frame,
    /// For provables, the raw proof token stream; decoded at verify time.
    pub proof: Option<Box<[Token]>>,
}

/// A parsed Metamath database.
#[derive(Debug, Default)]
pub struct Database {
    pub(crate) sources: SourceBuffer,
    pub(crate) names: Nameset,
    /// Permanent variable typecode assignments; unlike activation, a
    /// typecode is never rolled back on scope exit.
    pub(crate) var_type: HashMap<Atom, Atom>,
    /// All assertions, in declaration order.
    pub(crate) assertions: Vec<Assertion>,
    pub(crate) assertion_ix: HashMap<Label, usize>,
}

impl Database {
    /// Loads and parses a database starting from `root`.
    ///
    /// `preload` supplies in-memory files consulted before the filesystem,
    /// keyed by name.  The first error aborts the parse; the database holds
    /// everything declared before the error and the source map needed to
    /// render it.
    pub fn parse(
        &mut self,
        root: String,
        preload: Vec<(String, Vec<u8>)>,
    ) -> Result<(), Diagnostic> {
        self.sources = source::load(root, preload)?;
        parser::parse_database(self)?;
        debug!(
            "parsed {} symbols, {} labels, {} assertions",
            self.names.symbol_count(),
            self.names.label_count(),
            self.assertions.len()
        );
        Ok(())
    }

    /// Verifies every provable, in declaration order.
    pub fn verify(&self) -> Result<VerifySummary, VerifyFailure> {
        verify::verify_database(self)
    }

    /// The composed source text and origin map, for diagnostic rendering.
    #[must_use]
    pub fn sources(&self) -> &SourceBuffer {
        &self.sources
    }

    /// The interning tables.
    #[must_use]
    pub fn names(&self) -> &Nameset {
        &self.names
    }

    /// All assertions, in declaration order.
    #[must_use]
    pub fn assertions(&self) -> &[Assertion] {
        &self.assertions
    }

    /// Looks up an assertion by label spelling.
    #[must_use]
    pub fn assertion(&self, label: TokenPtr<'_>) -> Option<&Assertion> {
        let label = self.names.lookup_label(label)?;
        self.assertions.get(*self.assertion_ix.get(&label)?)
    }

    /// The typecode assigned to a variable by a `$f` statement, if any.
    /// Assignments are permanent, even for variables no longer active.
    #[must_use]
    pub fn var_typecode(&self, var: Atom) -> Option<Atom> {
        self.var_type.get(&var).copied()
    }
}
