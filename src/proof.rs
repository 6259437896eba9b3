//! Proof representation and decoding.
//!
//! A raw proof is the token stream captured between `$=` and `$.`.  It is
//! either *uncompressed* (a sequence of statement labels, possibly with `?`
//! placeholders) or *compressed* (`( L1 ... Ln ) CHARS`, where the
//! parenthesized roster enumerates extra referenced labels and `CHARS` is a
//! base-20/base-5 varint encoding of step numbers).
//!
//! Decoding flattens both forms into one step language, which the verifier
//! executes without caring which encoding the proof used:
//!
//! - `Label` pushes a hypothesis or applies an assertion,
//! - `Save` copies the current stack top onto the saved-steps list,
//! - `Load` pushes a copy of a saved step,
//! - `Unknown` marks the proof incomplete.

use crate::database::Database;
use crate::diag::Diagnostic;
use crate::nameck::Label;
use crate::scopeck::{Frame, Hyp};
use crate::statement::Token;

type Result<T> = std::result::Result<T, Diagnostic>;

/// One decoded proof step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProofStep {
    /// Reference to a hypothesis or a previously established assertion.
    Label(Label),
    /// Push a copy of the current stack top onto the saved-steps list.
    Save,
    /// Push a copy of the k-th saved step (0-indexed).
    Load(usize),
    /// A `?` placeholder; the proof is incomplete.
    Unknown,
}

/// Decodes a raw proof into steps against the provable's frame.
pub(crate) fn decode_proof(
    db: &Database,
    frame: &Frame,
    proof: &[Token],
) -> Result<Vec<ProofStep>> {
    match proof.first() {
        Some(tok) if &**tok == b"(" => decode_compressed(db, frame, &proof[1..]),
        _ => decode_normal(db, proof),
    }
}

fn lookup(db: &Database, tok: &Token) -> Result<Label> {
    db.names
        .lookup_label(tok)
        .ok_or_else(|| Diagnostic::StepMissing(tok.clone()))
}

fn decode_normal(db: &Database, proof: &[Token]) -> Result<Vec<ProofStep>> {
    proof
        .iter()
        .map(|tok| {
            if &**tok == b"?" {
                Ok(ProofStep::Unknown)
            } else {
                lookup(db, tok).map(ProofStep::Label)
            }
        })
        .collect()
}

/// Decodes the compressed form, after the opening `(`.
///
/// Letters `A`-`T` are base-20 final digits (values 1-20) and emit a step
/// number; `U`-`Y` are base-5 continuation digits (values 1-5); `Z` emits a
/// save.  Number `x` maps to the x-th mandatory hypothesis, then the
/// roster, then the saved-steps list, in that order.
fn decode_compressed(db: &Database, frame: &Frame, rest: &[Token]) -> Result<Vec<ProofStep>> {
    let mut roster: Vec<Label> = Vec::new();
    let mut chars_at = None;
    for (ix, tok) in rest.iter().enumerate() {
        if &**tok == b")" {
            chars_at = Some(ix + 1);
            break;
        }
        roster.push(lookup(db, tok)?);
    }
    let Some(chars_at) = chars_at else {
        return Err(Diagnostic::ProofUnterminatedRoster);
    };

    let mandatory: Vec<Label> = frame.hypotheses.iter().map(Hyp::label).collect();
    let m = mandatory.len();
    let l = roster.len();

    let mut steps = Vec::new();
    let mut acc = 0usize;
    for tok in &rest[chars_at..] {
        for &ch in tok.iter() {
            match ch {
                b'A'..=b'T' => {
                    let x = acc
                        .checked_mul(20)
                        .and_then(|v| v.checked_add(usize::from(ch - b'A') + 1))
                        .ok_or(Diagnostic::ProofMalformedVarint)?;
                    acc = 0;
                    steps.push(if x <= m {
                        ProofStep::Label(mandatory[x - 1])
                    } else if x <= m + l {
                        ProofStep::Label(roster[x - m - 1])
                    } else {
                        ProofStep::Load(x - m - l - 1)
                    });
                }
                b'U'..=b'Y' => {
                    acc = acc
                        .checked_mul(5)
                        .and_then(|v| v.checked_add(usize::from(ch - b'T')))
                        .ok_or(Diagnostic::ProofMalformedVarint)?;
                }
                b'Z' => {
                    steps.push(ProofStep::Save);
                    acc = 0;
                }
                b'?' => {
                    steps.push(ProofStep::Unknown);
                    acc = 0;
                }
                _ => return Err(Diagnostic::ProofMalformedVarint),
            }
        }
    }
    if acc != 0 {
        return Err(Diagnostic::ProofMalformedVarint);
    }
    Ok(steps)
}
