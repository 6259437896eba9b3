//! Name interning for math symbols and statement labels.
//!
//! Every math symbol and every statement label is interned to a dense
//! integer id on first declaration, and all downstream maps are keyed by id;
//! the source buffer does not need to be retained after parsing.  Ids are
//! assigned in declaration order, so comparing two [`Label`]s compares their
//! global declaration order, which is exactly the order required for
//! mandatory hypothesis lists.
//!
//! Symbols and labels live in separate id spaces, but their *spellings*
//! share one uniqueness namespace: the parser consults both tables before
//! any declaration.  The partition of symbols into constants and variables
//! is recorded here and is permanent; scoping (which variables are *active*)
//! is tracked by `scopeck`.

use crate::statement::{SymbolType, Token, TokenPtr};
use crate::util::HashMap;

/// Opacified number representing a single math symbol.
///
/// An `Atom` is assigned for every math symbol in the database.  Atoms are
/// never reused, so they are efficient to handle, but this does limit the
/// number of math symbols in the lifetime of a database to 2^32-1.
#[derive(Copy, Clone, Debug, PartialOrd, Ord, PartialEq, Eq, Default, Hash)]
pub struct Atom(u32);

/// Opacified number representing a statement label.
///
/// Labels are assigned in declaration order; the numeric order of two
/// `Label`s is their global declaration order.
#[derive(Copy, Clone, Debug, PartialOrd, Ord, PartialEq, Eq, Default, Hash)]
pub struct Label(u32);

/// The interning tables for one database.
#[derive(Default, Debug, Clone)]
pub struct Nameset {
    symbols: HashMap<Token, Atom>,
    symbol_names: Vec<Token>,
    symbol_types: Vec<SymbolType>,
    labels: HashMap<Token, Label>,
    label_names: Vec<Token>,
}

impl Nameset {
    /// Interns a new math symbol.  The caller is responsible for uniqueness
    /// checks; interning an existing spelling is a logic error.
    pub(crate) fn intern_symbol(&mut self, tok: TokenPtr<'_>, stype: SymbolType) -> Atom {
        debug_assert!(!self.symbols.contains_key(tok));
        let atom = Atom(self.symbol_names.len() as u32);
        assert!(atom.0 < u32::MAX, "symbol table overflowed");
        self.symbols.insert(tok.into(), atom);
        self.symbol_names.push(tok.into());
        self.symbol_types.push(stype);
        atom
    }

    /// Interns a new statement label.  The caller is responsible for
    /// uniqueness checks.
    pub(crate) fn intern_label(&mut self, tok: TokenPtr<'_>) -> Label {
        debug_assert!(!self.labels.contains_key(tok));
        let label = Label(self.label_names.len() as u32);
        assert!(label.0 < u32::MAX, "label table overflowed");
        self.labels.insert(tok.into(), label);
        self.label_names.push(tok.into());
        label
    }

    /// Looks up the atom for a math symbol spelling.
    #[must_use]
    pub fn lookup_symbol(&self, tok: TokenPtr<'_>) -> Option<Atom> {
        self.symbols.get(tok).copied()
    }

    /// Looks up the label id for a label spelling.
    #[must_use]
    pub fn lookup_label(&self, tok: TokenPtr<'_>) -> Option<Label> {
        self.labels.get(tok).copied()
    }

    /// The constant/variable partition side a symbol was declared on.
    #[must_use]
    pub fn symbol_type(&self, atom: Atom) -> SymbolType {
        self.symbol_types[atom.0 as usize]
    }

    /// True if the atom was declared as a variable.
    #[must_use]
    pub fn is_variable(&self, atom: Atom) -> bool {
        self.symbol_type(atom) == SymbolType::Variable
    }

    /// Maps an atom back to its spelling.
    ///
    /// Atoms never change over the lifetime of a database, so the returned
    /// slice is valid as long as the nameset is.
    #[must_use]
    pub fn atom_name(&self, atom: Atom) -> TokenPtr<'_> {
        &self.symbol_names[atom.0 as usize]
    }

    /// Maps a label id back to its spelling.
    #[must_use]
    pub fn label_name(&self, label: Label) -> TokenPtr<'_> {
        &self.label_names[label.0 as usize]
    }

    /// Number of interned math symbols.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.symbol_names.len()
    }

    /// Number of interned statement labels.
    #[must_use]
    pub fn label_count(&self) -> usize {
        self.label_names.len()
    }
}
