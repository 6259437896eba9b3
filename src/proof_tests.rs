use crate::database::Database;
use crate::diag::Diagnostic;
use crate::nameck::Label;
use crate::proof::{decode_proof, ProofStep};
use crate::statement::Token;
use assert_matches::assert_matches;
use proptest::prelude::*;

fn mkdb(text: &[u8]) -> Database {
    let mut db = Database::default();
    db.parse(
        "test.mm".to_owned(),
        vec![("test.mm".to_owned(), text.to_owned())],
    )
    .unwrap();
    db
}

/// One mandatory hypothesis (`wp`) on the provable, one axiom to reference.
fn testdb() -> Database {
    mkdb(
        b"$c |- wff $. $v p $.\n\
          wp $f wff p $.\n\
          ax1 $a |- p $.\n\
          th $p |- p $= wp ax1 $.",
    )
}

fn tokens(toks: &[&[u8]]) -> Vec<Token> {
    toks.iter().map(|&t| t.into()).collect()
}

fn decode(db: &Database, proof: &[&[u8]]) -> Result<Vec<ProofStep>, Diagnostic> {
    let frame = &db.assertion(b"th").unwrap().frame;
    decode_proof(db, frame, &tokens(proof))
}

fn label(db: &Database, name: &[u8]) -> Label {
    db.names().lookup_label(name).unwrap()
}

#[test]
fn test_decode_normal() {
    let db = testdb();
    let steps = decode(&db, &[b"wp", b"ax1", b"?"]).unwrap();
    assert_eq!(
        steps,
        vec![
            ProofStep::Label(label(&db, b"wp")),
            ProofStep::Label(label(&db, b"ax1")),
            ProofStep::Unknown,
        ]
    );
    assert_matches!(
        decode(&db, &[b"nosuch"]),
        Err(Diagnostic::StepMissing(ref tok)) if &**tok == b"nosuch"
    );
}

#[test]
fn test_decode_number_mapping() {
    let db = testdb();
    // A is the first mandatory hypothesis, B the first roster label
    let steps = decode(&db, &[b"(", b"ax1", b")", b"AB"]).unwrap();
    assert_eq!(
        steps,
        vec![
            ProofStep::Label(label(&db, b"wp")),
            ProofStep::Label(label(&db, b"ax1")),
        ]
    );
}

#[test]
fn test_decode_save_and_load() {
    let db = testdb();
    // with m=1 and no roster, 2 is past the labels and becomes Load(0)
    let steps = decode(&db, &[b"(", b")", b"AZB"]).unwrap();
    assert_eq!(
        steps,
        vec![
            ProofStep::Label(label(&db, b"wp")),
            ProofStep::Save,
            ProofStep::Load(0),
        ]
    );
}

#[test]
fn test_decode_multidigit() {
    let db = testdb();
    // U is a base-5 continuation digit: UA = 1*20 + 1 = 21
    let steps = decode(&db, &[b"(", b")", b"UA"]).unwrap();
    assert_eq!(steps, vec![ProofStep::Load(19)]);
    // UUA = (1*5 + 1)*20 + 1 = 121
    let steps = decode(&db, &[b"(", b")", b"UUA"]).unwrap();
    assert_eq!(steps, vec![ProofStep::Load(119)]);
    // chunks may be split at any whitespace
    let split = decode(&db, &[b"(", b")", b"U", b"UA"]).unwrap();
    assert_eq!(split, vec![ProofStep::Load(119)]);
}

#[test]
fn test_decode_unknown_resets_accumulator() {
    let db = testdb();
    let steps = decode(&db, &[b"(", b")", b"U?A"]).unwrap();
    assert_eq!(
        steps,
        vec![ProofStep::Unknown, ProofStep::Label(label(&db, b"wp"))]
    );
}

#[test]
fn test_decode_malformed() {
    let db = testdb();
    // dangling accumulator
    assert_matches!(
        decode(&db, &[b"(", b")", b"AU"]),
        Err(Diagnostic::ProofMalformedVarint)
    );
    // only A-Z and ? are legal in the letter run
    assert_matches!(
        decode(&db, &[b"(", b")", b"a"]),
        Err(Diagnostic::ProofMalformedVarint)
    );
    // unterminated roster
    assert_matches!(
        decode(&db, &[b"(", b"ax1"]),
        Err(Diagnostic::ProofUnterminatedRoster)
    );
    // roster labels must exist
    assert_matches!(
        decode(&db, &[b"(", b"nosuch", b")", b"A"]),
        Err(Diagnostic::StepMissing(_))
    );
}

/// Encodes one step number in the compressed letter code.
fn encode_number(mut chars: Vec<u8>, n: usize) -> Vec<u8> {
    let mut prefix = Vec::new();
    let mut rest = (n - 1) / 20;
    while rest > 0 {
        prefix.push(b'U' + ((rest - 1) % 5) as u8);
        rest = (rest - 1) / 5;
    }
    chars.extend(prefix.iter().rev());
    chars.push(b'A' + ((n - 1) % 20) as u8);
    chars
}

proptest! {
    /// Decoding the letter code gives back the numbers it encodes; with no
    /// mandatory hypotheses and no roster, number x maps to Load(x-1).
    #[test]
    fn decode_inverts_encode(nums in prop::collection::vec(1usize..400, 0..20)) {
        let db = mkdb(b"$c k $. ax $a k $. th $p k $= ax $.");
        let frame = &db.assertion(b"th").unwrap().frame;
        let chars = nums.iter().fold(Vec::new(), |chars, &n| encode_number(chars, n));
        let proof = tokens(&[b"(", b")", &chars]);
        let steps = decode_proof(&db, frame, &proof).unwrap();
        let expected: Vec<ProofStep> = nums.iter().map(|&n| ProofStep::Load(n - 1)).collect();
        prop_assert_eq!(steps, expected);
    }
}
