//! The proof verifier itself.
//!
//! Checking a proof is a kind of interpretation: there is a stack of known
//! results, and each step is an operation which pops zero or more results
//! off the stack, does local checks, and pushes a new result.  This module
//! avoids allocating during nominal operation; memory is reused from one
//! proof to the next, and intermediate expressions are handled as ranges
//! into a long-lived pool of interned symbols.
//!
//! Disjoint-variable checking is the other hot path.  The variables active
//! in the provable's scope are numbered densely per proof, every stack slot
//! carries a bitset of the variables occurring in its expression, and the
//! scope's `$d` pairs become a symmetric bitset table, so the mandatory
//! disjoint check of an applied assertion reduces to bitset probes.

use crate::bit_set::Bitset;
use crate::database::{Assertion, Database};
use crate::diag::Diagnostic;
use crate::nameck::{Atom, Label};
use crate::proof::{self, ProofStep};
use crate::scopeck::{Frame, Hyp};
use crate::statement::Token;
use crate::util::{fast_clear, fast_extend, HashMap};
use log::debug;
use std::ops::Range;

// Proofs are very fragile and there are very few situations where errors
// are recoverable, so we bail out using Result on any error.
macro_rules! try_assert {
    ( $cond:expr , $($arg:tt)+ ) => {
        if !$cond {
            return Err($($arg)+)
        }
    }
}

type Result<T> = std::result::Result<T, Diagnostic>;

/// Outcome of verifying a database with no fatal proof error.
#[derive(Debug, Default)]
pub struct VerifySummary {
    /// Number of provables whose proofs checked out.
    pub verified: usize,
    /// Labels of provables whose proofs contain `?` placeholders; these are
    /// skipped, reported, and never counted as verified.
    pub incomplete: Vec<Token>,
}

/// The first fatal proof error, with the provable it occurred in.
#[derive(Debug)]
pub struct VerifyFailure {
    /// Label of the provable whose proof failed.
    pub label: Token,
    /// What went wrong.
    pub diagnostic: Diagnostic,
}

/// An entry on the stack.
///
/// This is notionally just a typecode and a string of math symbols, but
/// disjoint-variable checking is faster if we also track the variables of
/// the expression as a bit vector.
#[derive(Clone, Debug)]
struct StackSlot {
    vars: Bitset,
    code: Atom,
    expr: Range<usize>,
}

/// A substitution under construction: variable to expression range (into
/// the shared pool) plus the variables of that expression.
pub(crate) type Subst = HashMap<Atom, (Range<usize>, Bitset)>;

/// Appends `expr` under the substitution to the pool: constants and unbound
/// symbols are copied through, bound variables are replaced by their
/// expression.  Returns the new range and its variable set.
pub(crate) fn do_substitute(
    pool: &mut Vec<Atom>,
    expr: &[Atom],
    subst: &Subst,
) -> (Range<usize>, Bitset) {
    let tos = pool.len();
    let mut vars = Bitset::new();
    for &sym in expr {
        if let Some((range, vbits)) = subst.get(&sym) {
            pool.extend_from_within(range.clone());
            vars |= vbits;
        } else {
            pool.push(sym);
        }
    }
    (tos..pool.len(), vars)
}

/// Like a substitution and an equality check against `compare`, but in one
/// pass and with no copying.
fn substitute_eq(pool: &[Atom], compare: Range<usize>, expr: &[Atom], subst: &Subst) -> bool {
    let mut pos = compare.start;
    for &sym in expr {
        if let Some((range, _)) = subst.get(&sym) {
            let len = range.end - range.start;
            if pos + len > compare.end || pool[pos..pos + len] != pool[range.clone()] {
                return false;
            }
            pos += len;
        } else {
            if pos >= compare.end || pool[pos] != sym {
                return false;
            }
            pos += 1;
        }
    }
    pos == compare.end
}

/// Working memory used by the verifier.  This expands for the first few
/// proofs and the rest can be handled without allocation.
struct VerifyState<'a> {
    db: &'a Database,
    /// Declaration index of the provable being verified; proofs may only
    /// reference assertions established before it.
    index: usize,
    /// The frame of the provable being verified.
    frame: &'a Frame,
    /// Stack of active subtrees.
    stack: Vec<StackSlot>,
    /// Steps saved by `Z` markers, addressable by `Load`.
    saved: Vec<StackSlot>,
    /// Pool of expression symbols; shared to reduce actual copying when a
    /// hypothesis or saved step is recalled.
    stack_buffer: Vec<Atom>,
    /// Scratch substitution used while applying an assertion.
    subst: Subst,
    /// Dense numbering of the variables active in the provable's scope.
    var2bit: HashMap<Atom, usize>,
    /// Symmetric table of the scope's disjoint pairs, indexed by `var2bit`.
    dv_map: Vec<Bitset>,
}

impl<'a> VerifyState<'a> {
    fn new(db: &'a Database, dummy: &'a Frame) -> VerifyState<'a> {
        VerifyState {
            db,
            index: 0,
            frame: dummy,
            stack: Vec::new(),
            saved: Vec::new(),
            stack_buffer: Vec::new(),
            subst: Subst::default(),
            var2bit: HashMap::default(),
            dv_map: Vec::new(),
        }
    }

    /// Resets the working memory for one provable and rebuilds the
    /// disjointness table from its frozen scope.
    fn prepare(&mut self, index: usize, frame: &'a Frame) {
        self.index = index;
        self.frame = frame;
        self.stack.clear();
        self.saved.clear();
        fast_clear(&mut self.stack_buffer);
        self.subst.clear();
        self.var2bit.clear();
        self.dv_map.clear();

        let scope = &frame.scope;
        let mut vars: Vec<Atom> = scope.vars.iter().copied().collect();
        vars.sort_unstable();
        for (bit, &var) in vars.iter().enumerate() {
            self.var2bit.insert(var, bit);
        }
        self.dv_map.resize(vars.len(), Bitset::new());
        for &(x, y) in &scope.disjoints {
            if let (Some(&bx), Some(&by)) = (self.var2bit.get(&x), self.var2bit.get(&y)) {
                self.dv_map[bx].set_bit(by);
                self.dv_map[by].set_bit(bx);
            }
        }
    }

    /// Pushes a typed expression, computing its variable bitset.
    fn push_expr(&mut self, code: Atom, expr: &[Atom]) {
        let tos = self.stack_buffer.len();
        fast_extend(&mut self.stack_buffer, expr);
        let n_tos = self.stack_buffer.len();
        let mut vars = Bitset::new();
        for sym in expr {
            if let Some(&bit) = self.var2bit.get(sym) {
                vars.set_bit(bit);
            }
        }
        self.stack.push(StackSlot {
            vars,
            code,
            expr: tos..n_tos,
        });
    }

    /// Executes a `Label` step: pushes a hypothesis of the provable's scope
    /// or applies a previously established assertion.
    fn execute_label(&mut self, label: Label) -> Result<()> {
        let frame = self.frame;
        if let Some(fh) = frame.scope.float_by_label(label) {
            let (code, var) = (fh.typecode, fh.var);
            self.push_expr(code, &[var]);
            return Ok(());
        }
        if let Some(eh) = frame.scope.essential_by_label(label) {
            self.push_expr(eh.typecode, &eh.expr);
            return Ok(());
        }
        let db = self.db;
        if let Some(&aix) = db.assertion_ix.get(&label) {
            try_assert!(
                aix < self.index,
                Diagnostic::StepUsedBeforeDefinition(db.names.label_name(label).into())
            );
            return self.apply(&db.assertions[aix]);
        }
        Err(Diagnostic::StepMissing(db.names.label_name(label).into()))
    }

    /// Unification and substitution against assertion `a`: pops one operand
    /// per mandatory hypothesis, derives the substitution from the floating
    /// hypotheses, checks the essential hypotheses and the mandatory
    /// disjoint restrictions, and pushes the substituted conclusion.
    fn apply(&mut self, a: &Assertion) -> Result<()> {
        let frame = &a.frame;
        let sbase = self
            .stack
            .len()
            .checked_sub(frame.hypotheses.len())
            .ok_or(Diagnostic::ProofUnderflow)?;

        self.subst.clear();
        for (ix, hyp) in frame.hypotheses.iter().enumerate() {
            let slot = &self.stack[sbase + ix];
            match hyp {
                Hyp::Floating(fh) => {
                    try_assert!(slot.code == fh.typecode, Diagnostic::StepFloatWrongType);
                    // a frame has one floating hypothesis per mandatory
                    // variable, but a binding may still repeat if the same
                    // label is pushed through a saved step
                    match self.subst.get(&fh.var) {
                        Some((prev, _)) => try_assert!(
                            self.stack_buffer[prev.clone()]
                                == self.stack_buffer[slot.expr.clone()],
                            Diagnostic::StepFloatIncompatible
                        ),
                        None => {
                            self.subst
                                .insert(fh.var, (slot.expr.clone(), slot.vars.clone()));
                        }
                    }
                }
                Hyp::Essential(eh) => {
                    try_assert!(slot.code == eh.typecode, Diagnostic::StepEssenWrongType);
                    try_assert!(
                        substitute_eq(
                            &self.stack_buffer,
                            slot.expr.clone(),
                            &eh.expr,
                            &self.subst
                        ),
                        Diagnostic::StepEssenWrong
                    );
                }
            }
        }

        // check $d constraints on the applied assertion: variables
        // substituted for a mandatory disjoint pair may not overlap, and
        // every cross pair must be restricted in the provable's scope
        for &(x, y) in &*frame.mandatory_dv {
            let (Some((_, vx)), Some((_, vy))) = (self.subst.get(&x), self.subst.get(&y))
            else {
                continue;
            };
            for b1 in vx {
                for b2 in vy {
                    try_assert!(
                        b1 < self.dv_map.len() && self.dv_map[b1].has_bit(b2),
                        Diagnostic::ProofDvViolation
                    );
                }
            }
        }

        // replace the operands on the stack with the substituted conclusion
        let (expr, vars) = do_substitute(&mut self.stack_buffer, &frame.conclusion, &self.subst);
        self.stack.truncate(sbase);
        self.stack.push(StackSlot {
            vars,
            code: frame.typecode,
            expr,
        });
        Ok(())
    }

    fn execute_step(&mut self, step: ProofStep) -> Result<()> {
        match step {
            ProofStep::Label(label) => self.execute_label(label),
            ProofStep::Save => {
                let top = self
                    .stack
                    .last()
                    .ok_or(Diagnostic::ProofInvalidSave)?
                    .clone();
                self.saved.push(top);
                Ok(())
            }
            ProofStep::Load(k) => {
                let slot = self
                    .saved
                    .get(k)
                    .ok_or(Diagnostic::StepOutOfRange(k))?
                    .clone();
                self.stack.push(slot);
                Ok(())
            }
            ProofStep::Unknown => Err(Diagnostic::ProofIncomplete),
        }
    }

    /// If we get here, it's a valid proof, but was it the _right_ valid
    /// proof?  The stack must hold exactly the declared conclusion.
    fn finalize(&self) -> Result<()> {
        try_assert!(self.stack.len() <= 1, Diagnostic::ProofExcessEnd);
        let tos = self.stack.last().ok_or(Diagnostic::ProofNoSteps)?;
        try_assert!(
            tos.code == self.frame.typecode,
            Diagnostic::ProofWrongTypeEnd
        );
        try_assert!(
            self.stack_buffer[tos.expr.clone()] == *self.frame.conclusion,
            Diagnostic::ProofWrongExprEnd
        );
        Ok(())
    }

    fn verify_proof(&mut self, steps: &[ProofStep]) -> Result<()> {
        for &step in steps {
            self.execute_step(step)?;
        }
        self.finalize()
    }
}

/// Verifies every provable of the database, in declaration order.
///
/// The first fatal proof error aborts the run; incomplete proofs are
/// reported in the summary and skipped.
pub(crate) fn verify_database(db: &Database) -> std::result::Result<VerifySummary, VerifyFailure> {
    let dummy = Frame::default();
    let mut state = VerifyState::new(db, &dummy);
    let mut summary = VerifySummary::default();
    for (index, assertion) in db.assertions.iter().enumerate() {
        let Some(proof) = &assertion.proof else {
            continue;
        };
        state.prepare(index, &assertion.frame);
        let result = proof::decode_proof(db, &assertion.frame, proof)
            .and_then(|steps| state.verify_proof(&steps));
        match result {
            Ok(()) => summary.verified += 1,
            Err(Diagnostic::ProofIncomplete) => summary
                .incomplete
                .push(db.names.label_name(assertion.label).into()),
            Err(diagnostic) => {
                return Err(VerifyFailure {
                    label: db.names.label_name(assertion.label).into(),
                    diagnostic,
                })
            }
        }
    }
    debug!(
        "verified {} provables, {} incomplete",
        summary.verified,
        summary.incomplete.len()
    );
    Ok(summary)
}
