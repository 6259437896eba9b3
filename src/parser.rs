//! Implementation of the statement parser for Metamath databases.
//!
//! The parser makes a single forward pass over the composed byte buffer,
//! skipping whitespace and comments, dispatching on the statement keywords
//! `$c $v $d $f $e $a $p ${ $}`, and applying each declaration directly to
//! the database and the scope stack.  There is no statement tree; by the
//! time the pass finishes, the interning tables are populated and every
//! assertion has been frozen with the scope that was active at its
//! declaration.
//!
//! Errors are fatal: the first malformed token or conflicting declaration
//! aborts the parse with a diagnostic pointing at the offending span.

use crate::database::{Assertion, Database};
use crate::diag::Diagnostic;
use crate::nameck::{Atom, Label, Nameset};
use crate::scopeck::{self, EssentialHyp, FloatingHyp, Scope};
use crate::source::is_mm_space;
use crate::statement::{FilePos, Span, SymbolType, Token};
use crate::util::HashMap;
use itertools::Itertools;

type Result<T> = std::result::Result<T, Diagnostic>;

/// Metamath spec valid label characters are `[-._a-zA-Z0-9]`.
#[must_use]
pub fn is_valid_label(label: &[u8]) -> bool {
    label
        .iter()
        .all(|&c| c == b'.' || c == b'-' || c == b'_' || c.is_ascii_alphanumeric())
}

fn contains_seq(tok: &[u8], seq: &[u8; 2]) -> bool {
    tok.windows(2).any(|w| w == seq)
}

/// Tokenizing state over the composed buffer.
struct Scanner<'a> {
    /// Text being parsed.
    buffer: &'a [u8],
    /// Current parsing position; will generally point immediately after a
    /// token, at whitespace.
    position: FilePos,
}

impl<'a> Scanner<'a> {
    /// Gets a single whitespace-delimited token from the source text without
    /// checking for comments.  `Span::NULL` is returned at the end of the
    /// buffer; a byte outside the printable ASCII range is fatal.
    fn get_raw(&mut self) -> Result<Span> {
        let len = self.buffer.len();
        let mut ix = self.position as usize;

        while ix < len && is_mm_space(self.buffer[ix]) {
            ix += 1;
        }

        let start = ix;
        while ix < len && !is_mm_space(self.buffer[ix]) {
            let ch = self.buffer[ix];
            if !(0x21..=0x7e).contains(&ch) {
                self.position = (ix + 1) as FilePos;
                return Err(Diagnostic::BadCharacter(ix as FilePos, ch));
            }
            ix += 1;
        }

        self.position = ix as FilePos;
        Ok(if start == ix {
            Span::NULL
        } else {
            Span::new(start, ix)
        })
    }

    /// Assuming that a `$(` token has just been read, skip to the end of the
    /// comment.  Comments do not nest.
    fn get_comment(&mut self, opener: Span) -> Result<()> {
        loop {
            let tok = self.get_raw()?;
            if tok.is_null() {
                let cspan = Span::new(opener.start as usize, self.buffer.len());
                return Err(Diagnostic::UnclosedComment(cspan));
            }
            let tref = tok.as_ref(self.buffer);
            if tref == b"$)" {
                return Ok(());
            } else if contains_seq(tref, b"$(") {
                return Err(Diagnostic::NestedComment(tok));
            } else if contains_seq(tref, b"$)") {
                return Err(Diagnostic::BadCommentEnd(tok));
            }
        }
    }

    /// Fetches a single token from the buffer, skipping over comments.
    fn get(&mut self) -> Result<Span> {
        loop {
            let tok = self.get_raw()?;
            if tok.is_null() {
                return Ok(Span::NULL);
            }
            if tok.as_ref(self.buffer) == b"$(" {
                self.get_comment(tok)?;
            } else {
                return Ok(tok);
            }
        }
    }
}

/// Parses the composed source buffer into the database.
pub(crate) fn parse_database(db: &mut Database) -> Result<()> {
    let Database {
        ref sources,
        ref mut names,
        ref mut var_type,
        ref mut assertions,
        ref mut assertion_ix,
    } = *db;
    let mut state = Parser {
        scanner: Scanner {
            buffer: &sources.text,
            position: 0,
        },
        names,
        var_type,
        assertions,
        assertion_ix,
        scopes: vec![Scope::default()],
    };
    state.database()
}

struct Parser<'a> {
    scanner: Scanner<'a>,
    names: &'a mut Nameset,
    var_type: &'a mut HashMap<Atom, Atom>,
    assertions: &'a mut Vec<Assertion>,
    assertion_ix: &'a mut HashMap<Label, usize>,
    /// The innermost scope is last; the outermost scope is never popped.
    scopes: Vec<Scope>,
}

impl<'a> Parser<'a> {
    fn buffer(&self) -> &'a [u8] {
        self.scanner.buffer
    }

    fn scope(&self) -> &Scope {
        self.scopes.last().expect("scope stack is never empty")
    }

    fn scope_mut(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack is never empty")
    }

    /// Main statement loop.  End of input at the top level is the normal
    /// termination.
    fn database(&mut self) -> Result<()> {
        loop {
            let tok = self.scanner.get()?;
            if tok.is_null() {
                if self.scopes.len() > 1 {
                    return Err(Diagnostic::UnclosedBeforeEof);
                }
                return Ok(());
            }
            let tref = tok.as_ref(self.buffer());
            match tref {
                b"$c" => self.constant_stmt(tok)?,
                b"$v" => self.variable_stmt(tok)?,
                b"$d" => self.disjoint_stmt(tok)?,
                b"${" => {
                    let inner = self.scope().clone();
                    self.scopes.push(inner);
                }
                b"$}" => {
                    if self.scopes.len() == 1 {
                        return Err(Diagnostic::UnmatchedCloseGroup(tok));
                    }
                    self.scopes.pop();
                }
                // top-level inclusions were substituted by the loader, so
                // any directive that reaches the parser is inside a block
                b"$[" => return Err(Diagnostic::IncludeNotTopLevel(tok)),
                b"$f" | b"$e" | b"$a" | b"$p" => return Err(Diagnostic::MissingLabel(tok)),
                _ if tref.contains(&b'$') => return Err(Diagnostic::UnknownKeyword(tok)),
                _ if is_valid_label(tref) => self.labeled_stmt(tok)?,
                _ => return Err(Diagnostic::BadLabel(tok)),
            }
        }
    }

    fn labeled_stmt(&mut self, label_tok: Span) -> Result<()> {
        let kw = self.scanner.get()?;
        if kw.is_null() {
            return Err(Diagnostic::UnknownKeyword(label_tok));
        }
        match kw.as_ref(self.buffer()) {
            b"$f" => self.floating_stmt(label_tok),
            b"$e" => self.essential_stmt(label_tok),
            b"$a" => self.assertion_stmt(label_tok, false),
            b"$p" => self.assertion_stmt(label_tok, true),
            b"$c" | b"$v" | b"$d" | b"${" | b"$}" | b"$[" => {
                Err(Diagnostic::SpuriousLabel(label_tok))
            }
            _ => Err(Diagnostic::UnknownKeyword(kw)),
        }
    }

    /// Reads math tokens up to `$.`, or `$=` when a proof may follow.
    /// Returns the token spans and whether a proof follows.
    fn math_string(&mut self, stmt: Span, allow_proof: bool) -> Result<(Vec<Span>, bool)> {
        let mut out = Vec::new();
        loop {
            let tok = self.scanner.get()?;
            if tok.is_null() {
                return Err(Diagnostic::UnclosedMath(stmt));
            }
            let tref = tok.as_ref(self.buffer());
            match tref {
                b"$." => return Ok((out, false)),
                b"$=" if allow_proof => return Ok((out, true)),
                _ if tref.contains(&b'$') => return Err(Diagnostic::UnknownKeyword(tok)),
                _ => out.push(tok),
            }
        }
    }

    /// Reads raw proof tokens up to `$.`; decoding happens at verify time.
    fn proof_string(&mut self, stmt: Span) -> Result<Box<[Token]>> {
        let mut out: Vec<Token> = Vec::new();
        loop {
            let tok = self.scanner.get()?;
            if tok.is_null() {
                return Err(Diagnostic::UnclosedProof(stmt));
            }
            let tref = tok.as_ref(self.buffer());
            match tref {
                b"$." => return Ok(out.into()),
                _ if tref.contains(&b'$') => return Err(Diagnostic::UnknownKeyword(tok)),
                _ => out.push(tref.into()),
            }
        }
    }

    fn add_constant(&mut self, span: Span) -> Result<()> {
        let tref = span.as_ref(self.buffer());
        if self.names.lookup_symbol(tref).is_some() {
            return Err(Diagnostic::SymbolRedeclared(tref.into(), span));
        }
        if self.names.lookup_label(tref).is_some() {
            return Err(Diagnostic::SymbolDuplicatesLabel(tref.into(), span));
        }
        self.names.intern_symbol(tref, SymbolType::Constant);
        Ok(())
    }

    fn add_variable(&mut self, span: Span) -> Result<()> {
        let tref = span.as_ref(self.buffer());
        match self.names.lookup_symbol(tref) {
            Some(atom) => match self.names.symbol_type(atom) {
                SymbolType::Constant => Err(Diagnostic::SymbolRedeclared(tref.into(), span)),
                SymbolType::Variable => {
                    if self.scope().is_active(atom) {
                        Err(Diagnostic::VariableRedeclared(tref.into(), span))
                    } else {
                        // reactivation; any typecode assigned earlier sticks
                        self.scope_mut().vars.insert(atom);
                        Ok(())
                    }
                }
            },
            None => {
                if self.names.lookup_label(tref).is_some() {
                    return Err(Diagnostic::SymbolDuplicatesLabel(tref.into(), span));
                }
                let atom = self.names.intern_symbol(tref, SymbolType::Variable);
                self.scope_mut().vars.insert(atom);
                Ok(())
            }
        }
    }

    fn add_label(&mut self, span: Span) -> Result<Label> {
        let tref = span.as_ref(self.buffer());
        if self.names.lookup_label(tref).is_some() {
            return Err(Diagnostic::LabelRedeclared(tref.into(), span));
        }
        if self.names.lookup_symbol(tref).is_some() {
            return Err(Diagnostic::LabelDuplicatesSymbol(tref.into(), span));
        }
        Ok(self.names.intern_label(tref))
    }

    fn constant_stmt(&mut self, kw: Span) -> Result<()> {
        if self.scopes.len() > 1 {
            return Err(Diagnostic::ConstantNotTopLevel(kw));
        }
        let (syms, _) = self.math_string(kw, false)?;
        if syms.is_empty() {
            return Err(Diagnostic::EmptyMathString(kw));
        }
        for span in syms {
            self.add_constant(span)?;
        }
        Ok(())
    }

    fn variable_stmt(&mut self, kw: Span) -> Result<()> {
        let (syms, _) = self.math_string(kw, false)?;
        if syms.is_empty() {
            return Err(Diagnostic::EmptyMathString(kw));
        }
        for span in syms {
            self.add_variable(span)?;
        }
        Ok(())
    }

    fn disjoint_stmt(&mut self, kw: Span) -> Result<()> {
        let (syms, _) = self.math_string(kw, false)?;
        if syms.is_empty() {
            return Err(Diagnostic::EmptyMathString(kw));
        }
        if syms.len() == 1 {
            return Err(Diagnostic::DisjointSingle(kw));
        }
        let mut vars: Vec<Atom> = Vec::with_capacity(syms.len());
        for &span in &syms {
            let tref = span.as_ref(self.buffer());
            let atom = match self.names.lookup_symbol(tref) {
                Some(a) if self.names.is_variable(a) && self.scope().is_active(a) => a,
                _ => return Err(Diagnostic::DjNotActiveVariable(tref.into(), span)),
            };
            if vars.contains(&atom) {
                return Err(Diagnostic::DjRepeatedVariable(tref.into(), span));
            }
            vars.push(atom);
        }
        for (x, y) in vars.into_iter().tuple_combinations() {
            self.scope_mut().add_disjoint(x, y);
        }
        Ok(())
    }

    fn floating_stmt(&mut self, label_span: Span) -> Result<()> {
        let label = self.add_label(label_span)?;
        let (syms, _) = self.math_string(label_span, false)?;
        if syms.is_empty() {
            return Err(Diagnostic::EmptyMathString(label_span));
        }
        if syms.len() != 2 {
            return Err(Diagnostic::BadFloating(label_span));
        }
        let tc_ref = syms[0].as_ref(self.buffer());
        let typecode = match self.names.lookup_symbol(tc_ref) {
            Some(a) if self.names.symbol_type(a) == SymbolType::Constant => a,
            _ => return Err(Diagnostic::FloatNotConstant(tc_ref.into(), syms[0])),
        };
        let var_ref = syms[1].as_ref(self.buffer());
        let var = match self.names.lookup_symbol(var_ref) {
            Some(a) if self.names.is_variable(a) && self.scope().is_active(a) => a,
            _ => return Err(Diagnostic::FloatNotVariable(var_ref.into(), syms[1])),
        };
        if self.scope().float_for_var(var).is_some() {
            return Err(Diagnostic::FloatRedeclared(var_ref.into(), syms[1]));
        }
        // a variable keeps one typecode for the whole database, even across
        // deactivation and reactivation
        match self.var_type.get(&var) {
            Some(&tc) if tc != typecode => {
                return Err(Diagnostic::FloatTypeConflict(var_ref.into(), syms[1]))
            }
            _ => {
                self.var_type.insert(var, typecode);
            }
        }
        self.scope_mut().floats.push(FloatingHyp {
            label,
            typecode,
            var,
        });
        Ok(())
    }

    /// Reads `typecode symbols...` for `$e $a $p`, requiring the typecode to
    /// be a constant and every other symbol to be a constant or an active
    /// variable with an active floating hypothesis.
    fn expression(&mut self, stmt: Span, allow_proof: bool) -> Result<(Atom, Vec<Atom>, bool)> {
        let (syms, has_proof) = self.math_string(stmt, allow_proof)?;
        if syms.is_empty() {
            return Err(Diagnostic::EmptyMathString(stmt));
        }
        let tc_ref = syms[0].as_ref(self.buffer());
        let typecode = match self.names.lookup_symbol(tc_ref) {
            Some(a) if self.names.symbol_type(a) == SymbolType::Constant => a,
            _ => return Err(Diagnostic::ExprNotConstantPrefix(tc_ref.into(), syms[0])),
        };
        let mut expr = Vec::with_capacity(syms.len() - 1);
        for &span in &syms[1..] {
            let tref = span.as_ref(self.buffer());
            let Some(atom) = self.names.lookup_symbol(tref) else {
                return Err(Diagnostic::NotActiveSymbol(tref.into(), span));
            };
            if self.names.is_variable(atom) {
                if !self.scope().is_active(atom) {
                    return Err(Diagnostic::NotActiveSymbol(tref.into(), span));
                }
                if self.scope().float_for_var(atom).is_none() {
                    return Err(Diagnostic::VariableMissingFloat(tref.into(), span));
                }
            }
            expr.push(atom);
        }
        Ok((typecode, expr, has_proof))
    }

    fn essential_stmt(&mut self, label_span: Span) -> Result<()> {
        let label = self.add_label(label_span)?;
        let (typecode, expr, _) = self.expression(label_span, false)?;
        self.scope_mut().essentials.push(EssentialHyp {
            label,
            typecode,
            expr: expr.into(),
        });
        Ok(())
    }

    fn assertion_stmt(&mut self, label_span: Span, provable: bool) -> Result<()> {
        let label = self.add_label(label_span)?;
        let (typecode, expr, has_proof) = self.expression(label_span, provable)?;
        let proof = if provable {
            if !has_proof {
                return Err(Diagnostic::MissingProof(label_span));
            }
            Some(self.proof_string(label_span)?)
        } else {
            None
        };
        let frame = scopeck::build_frame(self.names, self.scope(), typecode, &expr);
        let index = self.assertions.len();
        self.assertions.push(Assertion {
            label,
            frame,
            proof,
        });
        self.assertion_ix.insert(label, index);
        Ok(())
    }
}
