//! Global pairwise alignment of nucleotide sequences.
//!
//! The aligner computes a Needleman–Wunsch global alignment with affine gap
//! penalties and derives the metrics used for matching sequences against
//! reference catalogs. The scoring scheme is fixed: match +1, mismatch 0,
//! gap open -1, gap extension -0.5. It is a deliberately simple stand-in
//! for production-grade aligners; the metrics contract is what matters.
//!
//! See [`align`] and [`AlignmentResult`].

use crate::utils;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

// The fractional penalties are scaled by 2 so that the dynamic programming
// stays in exact integer arithmetic. The final score is scaled back.
const SCALE: f64 = 2.0;
const MATCH: i32 = 2;
const MISMATCH: i32 = 0;
const GAP_OPEN: i32 = 2;
const GAP_EXTEND: i32 = 1;

// Low enough to act as minus infinity without overflowing when penalties
// are subtracted from it.
const NEG_INF: i32 = i32::MIN / 4;

/// Metrics derived from a global pairwise alignment.
///
/// An alignment of two empty or partially empty inputs yields the zero-valued
/// result from [`AlignmentResult::zero`].
///
/// # Examples
///
/// ```
/// use patho_base::align;
///
/// let result = align::align("GATTACA", "GATTACA");
/// assert_eq!(result.identity, 100.0);
/// assert_eq!(result.coverage, 100.0);
/// assert_eq!(result.alignment_length, 7);
/// assert_eq!(result.score, 7.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AlignmentResult {
    /// Raw alignment score under the fixed scoring scheme.
    pub score: f64,
    /// Percentage of aligned positions where both sequences agree, over the
    /// longer gap-stripped input (0 to 100, two decimals).
    pub identity: f64,
    /// Percentage of the second (reference) sequence spanned by the
    /// alignment, capped at 100 (two decimals).
    pub coverage: f64,
    /// Length of the longer gap-stripped aligned sequence.
    pub alignment_length: usize,
}

impl AlignmentResult {
    /// Returns the zero-valued result used for empty inputs and empty catalogs.
    pub fn zero() -> Self {
        AlignmentResult {
            score: 0.0,
            identity: 0.0,
            coverage: 0.0,
            alignment_length: 0,
        }
    }
}

//-----------------------------------------------------------------------------

/// Aligns the two sequences globally and returns the derived metrics.
///
/// Comparison is case-insensitive. If either sequence is empty, the
/// zero-valued result is returned without attempting an alignment.
/// The output is deterministic: ties in the dynamic programming are broken
/// in a fixed order, so the same inputs always produce the same result.
pub fn align(seq_a: &str, seq_b: &str) -> AlignmentResult {
    if seq_a.is_empty() || seq_b.is_empty() {
        return AlignmentResult::zero();
    }
    let a: Vec<u8> = seq_a.bytes().map(|c| c.to_ascii_uppercase()).collect();
    let b: Vec<u8> = seq_b.bytes().map(|c| c.to_ascii_uppercase()).collect();

    let (raw_score, aligned_a, aligned_b) = global_alignment(&a, &b);

    let mut matches = 0;
    for (x, y) in aligned_a.iter().zip(aligned_b.iter()) {
        if *x != b'-' && *y != b'-' && x == y {
            matches += 1;
        }
    }
    let stripped_a = aligned_a.iter().filter(|c| **c != b'-').count();
    let stripped_b = aligned_b.iter().filter(|c| **c != b'-').count();
    let alignment_length = stripped_a.max(stripped_b);

    let identity = utils::percentage(matches, alignment_length);
    let coverage = utils::round2(
        ((alignment_length as f64 / b.len() as f64) * 100.0).min(100.0)
    );

    AlignmentResult {
        score: raw_score as f64 / SCALE,
        identity,
        coverage,
        alignment_length,
    }
}

//-----------------------------------------------------------------------------

// Traceback states for the affine-gap alignment.
// In matrix E the alignment consumes `b` with gaps in `a`; in F the other way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Main,
    GapInA,
    GapInB,
}

// Computes a global alignment of `a` and `b` with affine gaps.
// Returns the scaled score and the two aligned byte strings with `-` gaps.
// Both inputs must be non-empty.
fn global_alignment(a: &[u8], b: &[u8]) -> (i32, Vec<u8>, Vec<u8>) {
    let n = a.len();
    let m = b.len();

    // h = best score ending at (i, j); e = best ending with a gap in `a`;
    // f = best ending with a gap in `b`.
    let mut h = vec![vec![NEG_INF; m + 1]; n + 1];
    let mut e = vec![vec![NEG_INF; m + 1]; n + 1];
    let mut f = vec![vec![NEG_INF; m + 1]; n + 1];

    h[0][0] = 0;
    for j in 1..=m {
        e[0][j] = if j == 1 { h[0][0] - GAP_OPEN } else { e[0][j - 1] - GAP_EXTEND };
        h[0][j] = e[0][j];
    }
    for i in 1..=n {
        f[i][0] = if i == 1 { h[0][0] - GAP_OPEN } else { f[i - 1][0] - GAP_EXTEND };
        h[i][0] = f[i][0];
    }

    for i in 1..=n {
        for j in 1..=m {
            e[i][j] = (h[i][j - 1] - GAP_OPEN).max(e[i][j - 1] - GAP_EXTEND);
            f[i][j] = (h[i - 1][j] - GAP_OPEN).max(f[i - 1][j] - GAP_EXTEND);
            let diag = h[i - 1][j - 1] + pair_score(a[i - 1], b[j - 1]);
            // Fixed preference on ties: diagonal, then gap in `b`, then gap in `a`.
            let mut best = diag;
            if f[i][j] > best {
                best = f[i][j];
            }
            if e[i][j] > best {
                best = e[i][j];
            }
            h[i][j] = best;
        }
    }

    // Traceback. The state records which matrix the current cell was taken
    // from, so that gap runs are followed through the affine recurrence
    // instead of being re-decided at every column.
    let mut aligned_a: Vec<u8> = Vec::with_capacity(n + m);
    let mut aligned_b: Vec<u8> = Vec::with_capacity(n + m);
    let mut i = n;
    let mut j = m;
    let mut state = State::Main;
    while i > 0 || j > 0 {
        match state {
            State::Main => {
                if i == 0 {
                    state = State::GapInA;
                } else if j == 0 {
                    state = State::GapInB;
                } else {
                    let diag = h[i - 1][j - 1] + pair_score(a[i - 1], b[j - 1]);
                    if h[i][j] == diag {
                        aligned_a.push(a[i - 1]);
                        aligned_b.push(b[j - 1]);
                        i -= 1;
                        j -= 1;
                    } else if h[i][j] == f[i][j] {
                        state = State::GapInB;
                    } else {
                        state = State::GapInA;
                    }
                }
            },
            State::GapInA => {
                aligned_a.push(b'-');
                aligned_b.push(b[j - 1]);
                // Prefer closing the gap when opening and extending tie.
                if j == 1 || e[i][j] == h[i][j - 1] - GAP_OPEN {
                    state = State::Main;
                }
                j -= 1;
            },
            State::GapInB => {
                aligned_a.push(a[i - 1]);
                aligned_b.push(b'-');
                if i == 1 || f[i][j] == h[i - 1][j] - GAP_OPEN {
                    state = State::Main;
                }
                i -= 1;
            },
        }
    }
    aligned_a.reverse();
    aligned_b.reverse();

    (h[n][m], aligned_a, aligned_b)
}

fn pair_score(x: u8, y: u8) -> i32 {
    if x == y { MATCH } else { MISMATCH }
}

//-----------------------------------------------------------------------------
