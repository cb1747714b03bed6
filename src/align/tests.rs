use super::*;

//-----------------------------------------------------------------------------

fn check_bounds(result: &AlignmentResult, name: &str) {
    assert!(result.identity >= 0.0 && result.identity <= 100.0, "Identity out of bounds for {}", name);
    assert!(result.coverage >= 0.0 && result.coverage <= 100.0, "Coverage out of bounds for {}", name);
}

//-----------------------------------------------------------------------------

#[test]
fn empty_inputs() {
    let zero = AlignmentResult::zero();
    for seq in ["", "A", "ACGT", "GATTACACACCAGAT"] {
        assert_eq!(align("", seq), zero, "Nonzero result for empty first sequence vs {}", seq);
        assert_eq!(align(seq, ""), zero, "Nonzero result for empty second sequence vs {}", seq);
    }
}

#[test]
fn identical_sequences() {
    let seq = "ATGAGTATTCAACATTTCCGTGTCGCCCTTATTCCCTTTTTTG";
    let result = align(seq, seq);
    assert_eq!(result.identity, 100.0, "Wrong identity for identical sequences");
    assert_eq!(result.coverage, 100.0, "Wrong coverage for identical sequences");
    assert_eq!(result.alignment_length, seq.len(), "Wrong alignment length for identical sequences");
    assert_eq!(result.score, seq.len() as f64, "Wrong score for identical sequences");
    check_bounds(&result, "identical sequences");
}

#[test]
fn case_insensitive() {
    let upper = align("ACGTACGT", "ACGTTCGT");
    let lower = align("acgtacgt", "acgttcgt");
    let mixed = align("AcGtAcGt", "aCgTtCgT");
    assert_eq!(upper, lower, "Different results for upper and lower case");
    assert_eq!(upper, mixed, "Different results for upper and mixed case");
}

#[test]
fn single_mismatch() {
    let result = align("ACGT", "ACCT");
    assert_eq!(result.score, 3.0, "Wrong score with one mismatch");
    assert_eq!(result.identity, 75.0, "Wrong identity with one mismatch");
    assert_eq!(result.alignment_length, 4, "Wrong alignment length with one mismatch");
    check_bounds(&result, "single mismatch");
}

#[test]
fn single_gap() {
    // ACGT vs AC-T: three matches and one gap open.
    let result = align("ACGT", "ACT");
    assert_eq!(result.score, 2.0, "Wrong score with one gap");
    assert_eq!(result.identity, 75.0, "Wrong identity with one gap");
    assert_eq!(result.alignment_length, 4, "Wrong alignment length with one gap");
    assert_eq!(result.coverage, 100.0, "Wrong coverage with one gap");
    check_bounds(&result, "single gap");
}

#[test]
fn affine_gap_run() {
    // AAAA vs AA--: a contiguous gap costs open + extend (-1.5), while two
    // separate gaps would cost two opens (-2.0).
    let result = align("AAAA", "AA");
    assert_eq!(result.score, 0.5, "Gap run not scored with affine penalties");
    assert_eq!(result.identity, 50.0, "Wrong identity with a gap run");
    assert_eq!(result.alignment_length, 4, "Wrong alignment length with a gap run");
}

#[test]
fn deterministic() {
    let seq_a = "ATGGCAGCTATTGTTGACGTTATCGCGGTGATTTTTATC";
    let seq_b = "ATGAGTATTCAACATTTCCGTGTCGCCCTTATTCCCTTTTTTG";
    let first = align(seq_a, seq_b);
    for _ in 0..3 {
        assert_eq!(align(seq_a, seq_b), first, "Alignment output is not reproducible");
    }
    check_bounds(&first, "unrelated sequences");
    assert!(first.identity < 100.0, "Unrelated sequences should not have full identity");
}

#[test]
fn aligned_strings() {
    let (score, aligned_a, aligned_b) = global_alignment(b"ACGT", b"ACT");
    assert_eq!(aligned_a.len(), aligned_b.len(), "Aligned strings have different lengths");
    let stripped_a: Vec<u8> = aligned_a.iter().copied().filter(|c| *c != b'-').collect();
    let stripped_b: Vec<u8> = aligned_b.iter().copied().filter(|c| *c != b'-').collect();
    assert_eq!(stripped_a, b"ACGT", "First aligned string does not preserve the input");
    assert_eq!(stripped_b, b"ACT", "Second aligned string does not preserve the input");
    assert_eq!(score, 4, "Wrong scaled score for ACGT vs ACT");
}

//-----------------------------------------------------------------------------
