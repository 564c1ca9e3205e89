//! Rule-based Bulgarian grammar error detection
//!
//! Given a final transcript and the learner's L1, runs a fixed battery
//! of detectors and returns an ordered list of corrections anchored to
//! the closed `bg.*` grammar taxonomy. The detector is stateless and
//! side-effect free: results are deterministic for a fixed input and
//! content-store version.

pub mod detectors;
pub mod lexicon;
pub mod normalize;

pub use normalize::{fold, fold_for_key, tokenize};

use bgcoach_content::ContentStore;
use bgcoach_core::coach::Correction;
use bgcoach_core::L1;

use detectors::DetectorCtx;

/// Overlap priority. Lower wins.
fn priority(category: &str) -> u8 {
    match category {
        "agreement" => 0,
        "article" => 1,
        "clitic" => 2,
        "infinitive" => 3,
        "future" => 4,
        _ => 5,
    }
}

/// Run the detector battery on a final transcript.
///
/// The L1 code does not influence detection itself (notes are Bulgarian
/// micro-explanations); it is part of the signature because analyze
/// requests are a pure function of (text, l1, content version).
pub fn detect(text: &str, _l1: L1, store: &ContentStore) -> Vec<Correction> {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return Vec::new();
    }

    let ctx = DetectorCtx {
        text,
        tokens: &tokens,
        store,
    };

    // Fixed battery order; ordering of the result set is imposed below.
    let mut candidates = Vec::new();
    candidates.extend(detectors::detect_missing_article(&ctx));
    candidates.extend(detectors::detect_da_construction(&ctx));
    candidates.extend(detectors::detect_future_without_shte(&ctx));
    candidates.extend(detectors::detect_clitic_misplacement(&ctx));
    candidates.extend(detectors::detect_agreement(&ctx));

    let corrections = resolve(candidates);
    if !corrections.is_empty() {
        tracing::debug!(count = corrections.len(), "grammar corrections detected");
    }
    corrections
}

/// Deduplicate by (error_tag, span), drop overlapping lower-priority
/// corrections, and order the result by span offset.
fn resolve(mut candidates: Vec<Correction>) -> Vec<Correction> {
    candidates.dedup_by(|a, b| a.error_tag == b.error_tag && a.span == b.span);

    // Winners are picked in priority order, earliest span first,
    // alphabetical tag as the final tie-break.
    candidates.sort_by(|a, b| {
        priority(&a.category)
            .cmp(&priority(&b.category))
            .then(a.span.cmp(&b.span))
            .then(a.error_tag.cmp(&b.error_tag))
    });

    let mut kept: Vec<Correction> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let overlaps = kept.iter().any(|k| spans_overlap(k.span, candidate.span));
        if !overlaps {
            kept.push(candidate);
        }
    }

    kept.sort_by(|a, b| a.span.cmp(&b.span).then(a.error_tag.cmp(&b.error_tag)));
    kept
}

fn spans_overlap(a: Option<(usize, usize)>, b: Option<(usize, usize)>) -> bool {
    match (a, b) {
        (Some((a0, a1)), Some((b0, b1))) => a0 < b1 && b0 < a1,
        _ => false,
    }
}
