//! Scope tracking and mandatory frame construction.
//!
//! The parser maintains a stack of `Scope`s: `${` pushes a copy of the
//! active scope and `$}` pops back to the saved copy, which deactivates any
//! variables, hypotheses, and disjoint pairs declared inside the block.
//! Constants, labels, and the permanent variable typecode map are global and
//! never roll back.
//!
//! When an `$a` or `$p` statement is declared, the active scope is frozen
//! into a [`Frame`]: a deep copy of the scope plus the derived mandatory
//! hypothesis list and mandatory disjoint pairs.  Scope pops after the
//! declaration never invalidate a frame.

use crate::nameck::{Atom, Label, Nameset};
use crate::util::HashSet;

/// An active `$f` statement: `var` has syntactic type `typecode`.
#[derive(Copy, Clone, Debug)]
pub struct FloatingHyp {
    /// Label of the `$f` statement.
    pub label: Label,
    /// The typecode constant.
    pub typecode: Atom,
    /// The variable being typed.
    pub var: Atom,
}

/// An active `$e` statement: a logical premise of every assertion in scope.
#[derive(Clone, Debug)]
pub struct EssentialHyp {
    /// Label of the `$e` statement.
    pub label: Label,
    /// The typecode constant.
    pub typecode: Atom,
    /// The premise, excluding the typecode.
    pub expr: Box<[Atom]>,
}

/// The set of declarations active at one point of the database.
#[derive(Clone, Default, Debug)]
pub struct Scope {
    /// Currently active variables.
    pub vars: HashSet<Atom>,
    /// Active floating hypotheses, in declaration order.
    pub floats: Vec<FloatingHyp>,
    /// Active essential hypotheses, in declaration order.
    pub essentials: Vec<EssentialHyp>,
    /// Active disjoint-variable pairs, smaller atom first.
    pub disjoints: HashSet<(Atom, Atom)>,
}

/// Canonicalizes an unordered pair of distinct variables.
pub(crate) fn dv_pair(x: Atom, y: Atom) -> (Atom, Atom) {
    if x < y {
        (x, y)
    } else {
        (y, x)
    }
}

impl Scope {
    /// True if `var` is active in this scope.
    #[must_use]
    pub fn is_active(&self, var: Atom) -> bool {
        self.vars.contains(&var)
    }

    /// The active floating hypothesis typing `var`, if any.  There is at
    /// most one per active variable.
    #[must_use]
    pub fn float_for_var(&self, var: Atom) -> Option<&FloatingHyp> {
        self.floats.iter().find(|fh| fh.var == var)
    }

    /// Looks up an active floating hypothesis by its label.
    #[must_use]
    pub fn float_by_label(&self, label: Label) -> Option<&FloatingHyp> {
        self.floats.iter().find(|fh| fh.label == label)
    }

    /// Looks up an active essential hypothesis by its label.
    #[must_use]
    pub fn essential_by_label(&self, label: Label) -> Option<&EssentialHyp> {
        self.essentials.iter().find(|eh| eh.label == label)
    }

    /// Records a disjointness restriction; re-adding a pair is a no-op.
    pub fn add_disjoint(&mut self, x: Atom, y: Atom) {
        self.disjoints.insert(dv_pair(x, y));
    }

    /// True if the pair is restricted in this scope.
    #[must_use]
    pub fn has_disjoint(&self, x: Atom, y: Atom) -> bool {
        self.disjoints.contains(&dv_pair(x, y))
    }
}

/// A mandatory hypothesis of a frame.
#[derive(Clone, Debug)]
pub enum Hyp {
    /// A `$f` hypothesis; during application it binds its variable.
    Floating(FloatingHyp),
    /// An `$e` hypothesis; during application it must match the operand
    /// after substitution.
    Essential(EssentialHyp),
}

impl Hyp {
    /// The statement label of the hypothesis.
    #[must_use]
    pub const fn label(&self) -> Label {
        match self {
            Hyp::Floating(fh) => fh.label,
            Hyp::Essential(eh) => eh.label,
        }
    }

    /// The typecode every operand for this hypothesis must carry.
    #[must_use]
    pub const fn typecode(&self) -> Atom {
        match self {
            Hyp::Floating(fh) => fh.typecode,
            Hyp::Essential(eh) => eh.typecode,
        }
    }
}

/// The frozen form of an assertion: conclusion, mandatory hypotheses, and
/// the scope snapshot it was declared in.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    /// Typecode of the conclusion.
    pub typecode: Atom,
    /// The conclusion, excluding the typecode.
    pub conclusion: Box<[Atom]>,
    /// Mandatory hypotheses, ordered by global declaration order of their
    /// labels.
    pub hypotheses: Box<[Hyp]>,
    /// Disjoint pairs both of whose variables are mandatory.
    pub mandatory_dv: Box<[(Atom, Atom)]>,
    /// Deep copy of the scope active at the declaration.
    pub scope: Scope,
}

/// Freezes the active scope into the frame of a new assertion.
///
/// The mandatory variables are those appearing in the conclusion or in any
/// active essential hypothesis; the mandatory hypotheses are the floats
/// binding those variables plus every active essential, merged in label
/// declaration order (label ids are assigned in declaration order, so the
/// ids sort correctly).
pub(crate) fn build_frame(
    names: &Nameset,
    scope: &Scope,
    typecode: Atom,
    conclusion: &[Atom],
) -> Frame {
    let mut mvars: HashSet<Atom> = HashSet::default();
    let mut collect = |expr: &[Atom]| {
        for &sym in expr {
            if names.is_variable(sym) && scope.is_active(sym) {
                mvars.insert(sym);
            }
        }
    };
    collect(conclusion);
    for eh in &scope.essentials {
        collect(&eh.expr);
    }

    let mut hypotheses: Vec<Hyp> = Vec::new();
    for fh in &scope.floats {
        if mvars.contains(&fh.var) {
            hypotheses.push(Hyp::Floating(*fh));
        }
    }
    for eh in &scope.essentials {
        hypotheses.push(Hyp::Essential(eh.clone()));
    }
    hypotheses.sort_by_key(Hyp::label);

    let mut mandatory_dv: Vec<(Atom, Atom)> = scope
        .disjoints
        .iter()
        .filter(|(x, y)| mvars.contains(x) && mvars.contains(y))
        .copied()
        .collect();
    mandatory_dv.sort_unstable();

    Frame {
        typecode,
        conclusion: conclusion.into(),
        hypotheses: hypotheses.into(),
        mandatory_dv: mandatory_dv.into(),
        scope: scope.clone(),
    }
}
