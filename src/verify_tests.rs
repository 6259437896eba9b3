use crate::bit_set::Bitset;
use crate::database::Database;
use crate::diag::Diagnostic;
use crate::nameck::Nameset;
use crate::statement::SymbolType;
use crate::verify::{do_substitute, Subst, VerifyFailure, VerifySummary};
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

fn verify_ok(text: &[u8]) -> VerifySummary {
    mkdb(text).verify().expect("expected verification to pass")
}

fn verify_err(text: &[u8]) -> VerifyFailure {
    mkdb(text)
        .verify()
        .expect_err("expected verification to fail")
}

#[test]
fn test_minimal_proof() {
    let summary = verify_ok(
        b"$c wff $.\n$v x $.\nxf $f wff x $.\nax1 $a wff x $.\n\
          p1 $p wff x $= xf ax1 $.",
    );
    assert_eq!(summary.verified, 1);
    assert!(summary.incomplete.is_empty());
}

#[test]
fn test_minimal_proof_compressed() {
    let summary = verify_ok(
        b"$c wff $.\n$v x $.\nxf $f wff x $.\nax1 $a wff x $.\n\
          p1 $p wff x $= ( ax1 ) AB $.",
    );
    assert_eq!(summary.verified, 1);
}

#[test]
fn test_substitution_through_axiom() {
    // the axiom is stated over p but applied at q
    let summary = verify_ok(
        b"$c |- wff ( ) -> $. $v p q $.\n\
          wp $f wff p $. wq $f wff q $.\n\
          a1 $a |- ( p -> p ) $.\n\
          th $p |- ( q -> q ) $= wq a1 $.",
    );
    assert_eq!(summary.verified, 1);
}

#[test]
fn test_modus_ponens() {
    let summary = verify_ok(
        b"$c |- wff ( ) -> $. $v p q r s $.\n\
          wp $f wff p $. wq $f wff q $.\n\
          ${ mp.1 $e |- p $. mp.2 $e |- ( p -> q ) $. mp $a |- q $. $}\n\
          wr $f wff r $. ws $f wff s $.\n\
          ${ th.1 $e |- r $. th.2 $e |- ( r -> s ) $.\n\
             th $p |- s $= wr ws th.1 th.2 mp $. $}",
    );
    assert_eq!(summary.verified, 1);
}

#[test]
fn test_save_and_load() {
    // zf is pushed once and reused through Z / Load for both hypotheses
    let summary = verify_ok(
        b"$c P $. $v x y z $.\n\
          xf $f P x $. yf $f P y $. zf $f P z $.\n\
          pair $a P x y $.\n\
          th $p P z z $= ( pair ) AZCB $.",
    );
    assert_eq!(summary.verified, 1);
}

#[test]
fn test_incomplete_proofs_are_reported() {
    let summary = verify_ok(
        b"$c wff $. $v x $. xf $f wff x $. ax1 $a wff x $.\n\
          p1 $p wff x $= ? $.\n\
          p2 $p wff x $= ( ax1 ) A? $.\n\
          p3 $p wff x $= xf ax1 $.",
    );
    assert_eq!(summary.verified, 1);
    assert_eq!(
        summary.incomplete,
        vec![Box::from(&b"p1"[..]), Box::from(&b"p2"[..])]
    );
}

#[test]
fn test_disjoint_violation() {
    // dax requires x and y disjoint; substituting z for both violates it
    let failure = verify_err(
        b"$c |- $. $v x y z $.\n\
          wx $f |- x $. wy $f |- y $. wz $f |- z $.\n\
          ${ $d x y $. dax $a |- x y $. $}\n\
          th $p |- z z $= wz wz dax $.",
    );
    assert_eq!(&*failure.label, b"th");
    assert_matches!(failure.diagnostic, Diagnostic::ProofDvViolation);
}

#[test]
fn test_disjoint_requires_declaration_at_use() {
    // distinct substitutions still violate when the provable's scope does
    // not carry the matching $d
    let failure = verify_err(
        b"$c |- $. $v x y z w $.\n\
          wx $f |- x $. wy $f |- y $. wz $f |- z $. ww $f |- w $.\n\
          ${ $d x y $. dax $a |- x y $. $}\n\
          th $p |- z w $= wz ww dax $.",
    );
    assert_matches!(failure.diagnostic, Diagnostic::ProofDvViolation);
}

#[test]
fn test_disjoint_satisfied() {
    let summary = verify_ok(
        b"$c |- $. $v x y z w $.\n\
          wx $f |- x $. wy $f |- y $. wz $f |- z $. ww $f |- w $.\n\
          ${ $d x y $. dax $a |- x y $. $}\n\
          ${ $d z w $. th $p |- z w $= wz ww dax $. $}",
    );
    assert_eq!(summary.verified, 1);
}

#[test]
fn test_float_type_mismatch() {
    let failure = verify_err(
        b"$c A B $. $v x y $.\n\
          xa $f A x $. yb $f B y $.\n\
          ax $a A x $.\n\
          th $p A y $= yb ax $.",
    );
    assert_matches!(failure.diagnostic, Diagnostic::StepFloatWrongType);
}

#[test]
fn test_essential_mismatch() {
    let failure = verify_err(
        b"$c |- wff $. $v x y $.\n\
          wx $f wff x $. wy $f wff y $.\n\
          ${ ea $e |- x $. axe $a |- x $. $}\n\
          ${ th.1 $e |- y $. th $p |- x $= wx th.1 axe $. $}",
    );
    assert_matches!(failure.diagnostic, Diagnostic::StepEssenWrong);
}

#[test]
fn test_stack_underflow() {
    let failure = verify_err(
        b"$c A $. $v x $. xf $f A x $. ax $a A x $.\n\
          th $p A x $= ax $.",
    );
    assert_matches!(failure.diagnostic, Diagnostic::ProofUnderflow);
}

#[test]
fn test_wrong_conclusion() {
    let failure = verify_err(
        b"$c A $. $v x y $. xf $f A x $. yf $f A y $. ax $a A x $.\n\
          th $p A y $= xf ax $.",
    );
    assert_matches!(failure.diagnostic, Diagnostic::ProofWrongExprEnd);
}

#[test]
fn test_excess_stack() {
    let failure = verify_err(
        b"$c A $. $v x $. xf $f A x $. ax $a A x $.\n\
          th $p A x $= xf xf ax $.",
    );
    assert_matches!(failure.diagnostic, Diagnostic::ProofExcessEnd);
}

#[test]
fn test_empty_proof() {
    let failure = verify_err(b"$c A $. $v x $. xf $f A x $. th $p A x $= $.");
    assert_matches!(failure.diagnostic, Diagnostic::ProofNoSteps);
}

#[test]
fn test_save_with_empty_stack() {
    let failure = verify_err(b"$c A $. ax $a A $. th $p A $= ( ) Z $.");
    assert_matches!(failure.diagnostic, Diagnostic::ProofInvalidSave);
}

#[test]
fn test_load_out_of_range() {
    // with no mandatory hypotheses and no roster, A maps to Load(0), and
    // nothing has been saved
    let failure = verify_err(b"$c A $. ax $a A $. th $p A $= ( ) A $.");
    assert_matches!(failure.diagnostic, Diagnostic::StepOutOfRange(0));
}

#[test]
fn test_use_before_definition() {
    let failure = verify_err(
        b"$c A $. $v x $. xf $f A x $.\n\
          p1 $p A x $= xf ax $.\n\
          ax $a A x $.",
    );
    assert_matches!(failure.diagnostic, Diagnostic::StepUsedBeforeDefinition(_));
}

#[test]
fn test_unrecognized_label() {
    let failure = verify_err(
        b"$c A $. $v x $. xf $f A x $.\n\
          p1 $p A x $= xf nosuch $.",
    );
    assert_matches!(
        failure.diagnostic,
        Diagnostic::StepMissing(ref tok) if &**tok == b"nosuch"
    );
}

#[test]
fn test_optional_hypothesis_in_proof() {
    // y is a dummy variable of the proof: wy is not mandatory for th (whose
    // conclusion has no variables at all) but is still active in its scope
    let summary = verify_ok(
        b"$c |- T wff $. $v x y $.\n\
          wx $f wff x $. wy $f wff y $.\n\
          ally $a |- y $.\n\
          ${ gen.1 $e |- y $. gen $a |- T $. $}\n\
          th $p |- T $= wy wy ally gen $.",
    );
    assert_eq!(summary.verified, 1);
}

fn subst_names() -> (Nameset, Vec<crate::nameck::Atom>) {
    let mut names = Nameset::default();
    let mut atoms = Vec::new();
    for c in [&b"k0"[..], b"k1", b"k2"] {
        atoms.push(names.intern_symbol(c, SymbolType::Constant));
    }
    for v in [&b"v0"[..], b"v1"] {
        atoms.push(names.intern_symbol(v, SymbolType::Variable));
    }
    (names, atoms)
}

proptest! {
    /// apply_subst is left-to-right homomorphic: substituting into a
    /// concatenation equals concatenating the substitutions.
    #[test]
    fn substitution_is_homomorphic(
        s1 in prop::collection::vec(0usize..5, 0..12),
        s2 in prop::collection::vec(0usize..5, 0..12),
        b1 in prop::collection::vec(0usize..3, 0..4),
        b2 in prop::collection::vec(0usize..3, 0..4),
    ) {
        let (_names, atoms) = subst_names();
        let mut pool = Vec::new();
        let mut subst = Subst::default();
        // bind v0 and v1 to constant strings held in the pool
        for (var, binding) in [(3, &b1), (4, &b2)] {
            let start = pool.len();
            pool.extend(binding.iter().map(|&i| atoms[i]));
            subst.insert(atoms[var], (start..pool.len(), Bitset::new()));
        }
        let e1: Vec<_> = s1.iter().map(|&i| atoms[i]).collect();
        let e2: Vec<_> = s2.iter().map(|&i| atoms[i]).collect();
        let cat: Vec<_> = e1.iter().chain(&e2).copied().collect();

        let (r_cat, _) = do_substitute(&mut pool, &cat, &subst);
        let (r1, _) = do_substitute(&mut pool, &e1, &subst);
        let (r2, _) = do_substitute(&mut pool, &e2, &subst);

        let mut joined = pool[r1].to_vec();
        joined.extend_from_slice(&pool[r2]);
        prop_assert_eq!(&pool[r_cat], &joined[..]);
    }
}
