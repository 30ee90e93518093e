//! Fold algorithm selection.
//!
//! The folding unit exposes one discrete parameter choosing among a closed set
//! of shaping variants. The tag arrives as a float from the parameter store
//! and may be anything under adversarial automation, so resolution is a
//! tagged, exhaustive match with a defined fallback — an invalid tag selects
//! [`FoldVariant::FoldToRange`], never an out-of-bounds variant and never a
//! crash.

/// Wavefolding algorithm variants.
///
/// Each produces different harmonic content from the same drive settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FoldVariant {
    /// Reflects the signal back into the threshold range, repeatedly.
    ///
    /// The classic "west coast" fold: hard corners, bright odd harmonics
    /// that stack up as drive pushes more reflections.
    #[default]
    FoldToRange,

    /// Sine-shaped folding.
    ///
    /// Maps the signal through a sine transfer scaled by the threshold.
    /// Smoother corners than range folding; the spectrum stays rounder as
    /// drive increases.
    SinFold,

    /// Blend of the range fold and the sine fold.
    ///
    /// Combines the dense reflected spectrum with the sine transfer's
    /// rounded corners.
    ComboFold,
}

impl FoldVariant {
    /// Number of variants.
    pub const COUNT: u32 = 3;

    /// Resolves a raw tag to a variant.
    ///
    /// Exhaustive: every possible input maps to a defined variant, with
    /// index 0 as the fallback for tags outside the valid set.
    #[inline]
    pub fn from_index(raw: i32) -> Self {
        match select(raw, Self::COUNT as usize) {
            1 => FoldVariant::SinFold,
            2 => FoldVariant::ComboFold,
            _ => FoldVariant::FoldToRange,
        }
    }

    /// The tag this variant is stored as.
    pub fn index(self) -> i32 {
        match self {
            FoldVariant::FoldToRange => 0,
            FoldVariant::SinFold => 1,
            FoldVariant::ComboFold => 2,
        }
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            FoldVariant::FoldToRange => "FoldToRange",
            FoldVariant::SinFold => "SinFold",
            FoldVariant::ComboFold => "ComboFold",
        }
    }
}

/// Resolves a raw variant index against an arbitrary variant count.
///
/// Returns an index guaranteed to be in `[0, count)`: in-range input passes
/// through, anything else (negative, overflow, corrupted state) falls back to
/// index 0.
///
/// # Panics
///
/// Panics if `count` is 0 — a processor with no variants is a programming
/// bug, checked at construction time, not a runtime condition.
#[inline]
pub fn select(raw: i32, count: usize) -> usize {
    assert!(count > 0, "variant count must be positive");
    if raw >= 0 && (raw as usize) < count {
        raw as usize
    } else {
        0
    }
}
