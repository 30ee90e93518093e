//! Parameter descriptors, schemas, and normalization.
//!
//! Every user-adjustable control is described once, immutably, by a
//! [`ParamDescriptor`]: stable string id, display name, range, default, step,
//! unit semantics, and normalization curve. A processor publishes its controls
//! as a [`ParamSchema`] — an ordered, duplicate-free collection built at
//! construction time and never mutated afterwards.
//!
//! Descriptors also own the two value mappings everything else relies on:
//!
//! - **Constraining**: any raw write is forced into the descriptor's range
//!   before it is stored ([`ParamDescriptor::constrain`]). Continuous units
//!   clamp; toggles quantize; choice tags outside the valid set snap to the
//!   default tag rather than a neighboring one.
//! - **Normalization**: hosts automate in `[0, 1]`;
//!   [`normalize`](ParamDescriptor::normalize) and
//!   [`denormalize`](ParamDescriptor::denormalize) convert through the
//!   descriptor's [`ParamScale`] and are exact inverses to f32 precision.

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use libm::{expf, logf, powf};

#[cfg(feature = "std")]
fn expf(x: f32) -> f32 {
    x.exp()
}
#[cfg(feature = "std")]
fn logf(x: f32) -> f32 {
    x.ln()
}
#[cfg(feature = "std")]
fn powf(x: f32, y: f32) -> f32 {
    x.powf(y)
}

/// Unit semantics of a parameter value.
///
/// Drives display formatting and the per-block conversion into engine units
/// (decibels become linear gain, percentages become a unit interval, toggles
/// and choices pass through as tags).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamUnit {
    /// Plain linear value, no conversion.
    #[default]
    Linear,
    /// Decibels; converted to linear gain with [`db_to_linear`] before use.
    Decibels,
    /// Percentage 0-100; divided by 100 before use.
    Percent,
    /// Time in milliseconds.
    Milliseconds,
    /// Boolean stored as 0.0 / 1.0.
    Toggle,
    /// Discrete tag selecting one of a closed variant set.
    Choice,
}

impl ParamUnit {
    /// Suffix for value display ("dB", "%", "ms"), empty when the unit has none.
    pub fn suffix(self) -> &'static str {
        match self {
            ParamUnit::Decibels => "dB",
            ParamUnit::Percent => "%",
            ParamUnit::Milliseconds => "ms",
            ParamUnit::Linear | ParamUnit::Toggle | ParamUnit::Choice => "",
        }
    }
}

/// Normalization curve between the plain range and `[0, 1]`.
///
/// - **Linear**: `normalized = (value - min) / (max - min)`
/// - **Logarithmic**: `normalized = ln(value/min) / ln(max/min)` — requires
///   `min > 0`; gives wide-range time and frequency controls perceptually
///   uniform travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamScale {
    #[default]
    Linear,
    Logarithmic,
}

/// Immutable description of one parameter.
///
/// Constructed in const position via the unit-specific builders
/// ([`gain_db`](Self::gain_db), [`percent`](Self::percent), ...) so schemas
/// read as a flat table, the way the original units declare their controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Stable string key. Part of the persisted-state contract: never reuse or
    /// rename an id once it has shipped.
    pub id: &'static str,
    /// Display name for editors and host generic UIs.
    pub name: &'static str,
    /// Unit semantics for formatting and engine conversion.
    pub unit: ParamUnit,
    /// Normalization curve.
    pub scale: ParamScale,
    /// Minimum allowed value.
    pub min: f32,
    /// Maximum allowed value.
    pub max: f32,
    /// Default value at construction and after a reset.
    pub default: f32,
    /// Recommended edit increment for steppers and encoders.
    pub step: f32,
}

impl ParamDescriptor {
    /// Gain parameter in decibels, linear travel.
    pub const fn gain_db(
        id: &'static str,
        name: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            id,
            name,
            unit: ParamUnit::Decibels,
            scale: ParamScale::Linear,
            min,
            max,
            default,
            step: 0.1,
        }
    }

    /// Bipolar control in [-1, 1], default 0 (bias/balance style).
    pub const fn bipolar(id: &'static str, name: &'static str, default: f32) -> Self {
        Self {
            id,
            name,
            unit: ParamUnit::Linear,
            scale: ParamScale::Linear,
            min: -1.0,
            max: 1.0,
            default,
            step: 0.01,
        }
    }

    /// Plain linear control with an explicit range.
    pub const fn linear(
        id: &'static str,
        name: &'static str,
        min: f32,
        max: f32,
        default: f32,
        step: f32,
    ) -> Self {
        Self {
            id,
            name,
            unit: ParamUnit::Linear,
            scale: ParamScale::Linear,
            min,
            max,
            default,
            step,
        }
    }

    /// Percentage control 0-100.
    pub const fn percent(id: &'static str, name: &'static str, max: f32, default: f32) -> Self {
        Self {
            id,
            name,
            unit: ParamUnit::Percent,
            scale: ParamScale::Linear,
            min: 0.0,
            max,
            default,
            step: 0.1,
        }
    }

    /// Time control in milliseconds with logarithmic travel.
    ///
    /// Requires `min > 0` (the log curve is undefined at zero).
    pub const fn time_ms(
        id: &'static str,
        name: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            id,
            name,
            unit: ParamUnit::Milliseconds,
            scale: ParamScale::Logarithmic,
            min,
            max,
            default,
            step: 0.1,
        }
    }

    /// Boolean toggle stored as 0.0 / 1.0.
    pub const fn toggle(id: &'static str, name: &'static str, default_on: bool) -> Self {
        Self {
            id,
            name,
            unit: ParamUnit::Toggle,
            scale: ParamScale::Linear,
            min: 0.0,
            max: 1.0,
            default: if default_on { 1.0 } else { 0.0 },
            step: 1.0,
        }
    }

    /// Discrete choice among `count` variants, stored as tag 0..count-1.
    pub const fn choice(id: &'static str, name: &'static str, count: u32) -> Self {
        Self {
            id,
            name,
            unit: ParamUnit::Choice,
            scale: ParamScale::Linear,
            min: 0.0,
            max: (count - 1) as f32,
            default: 0.0,
            step: 1.0,
        }
    }

    /// Clamps a value into `[min, max]` without unit-aware snapping.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Forces a raw write into this parameter's valid value set.
    ///
    /// Non-finite input falls back to the default (`f32::clamp` would keep the
    /// NaN). Toggles quantize at 0.5. Choice tags round to the nearest integer
    /// and any tag outside the valid set snaps to the default tag — a corrupt
    /// tag must select a *defined* variant, not whichever one happens to sit at
    /// the range edge. Everything else clamps.
    #[inline]
    pub fn constrain(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.default;
        }
        match self.unit {
            ParamUnit::Toggle => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            ParamUnit::Choice => {
                let tag = round_half_up(value);
                if tag < self.min || tag > self.max {
                    self.default
                } else {
                    tag
                }
            }
            _ => self.clamp(value),
        }
    }

    /// Maps a plain value to `[0, 1]` through this parameter's scale.
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        let range = self.max - self.min;
        if range == 0.0 {
            return 0.0;
        }
        match self.scale {
            ParamScale::Linear => (value - self.min) / range,
            ParamScale::Logarithmic => {
                if self.min <= 0.0 || value <= 0.0 {
                    return 0.0;
                }
                logf(value / self.min) / logf(self.max / self.min)
            }
        }
    }

    /// Maps a normalized `[0, 1]` value back to the plain range.
    ///
    /// Inverse of [`normalize`](Self::normalize) to f32 precision.
    #[inline]
    pub fn denormalize(&self, normalized: f32) -> f32 {
        match self.scale {
            ParamScale::Linear => self.min + normalized * (self.max - self.min),
            ParamScale::Logarithmic => {
                if self.min <= 0.0 {
                    return self.min;
                }
                self.min * powf(self.max / self.min, normalized)
            }
        }
    }
}

/// Round to nearest integer, ties away from zero, without std.
#[inline]
fn round_half_up(x: f32) -> f32 {
    #[cfg(feature = "std")]
    {
        x.round()
    }
    #[cfg(not(feature = "std"))]
    {
        libm::roundf(x)
    }
}

/// Ordered, immutable collection of parameter descriptors.
///
/// Built once per processor. Duplicate ids are a construction-time panic:
/// a schema with two "drive" entries is a programming bug, not a runtime
/// condition to recover from.
#[derive(Debug, Clone)]
pub struct ParamSchema {
    params: Vec<ParamDescriptor>,
}

impl ParamSchema {
    /// Builds a schema from an ordered descriptor list.
    ///
    /// # Panics
    ///
    /// Panics if two descriptors share an id.
    pub fn new(params: Vec<ParamDescriptor>) -> Self {
        for (i, a) in params.iter().enumerate() {
            for b in &params[i + 1..] {
                assert!(a.id != b.id, "duplicate parameter id: {}", a.id);
            }
        }
        Self { params }
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True when the schema holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Descriptor at `index`, `None` past the end.
    pub fn get(&self, index: usize) -> Option<&ParamDescriptor> {
        self.params.get(index)
    }

    /// Slot index of the parameter with the given id.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.params.iter().position(|d| d.id == id)
    }

    /// Descriptor with the given id.
    pub fn find(&self, id: &str) -> Option<&ParamDescriptor> {
        self.params.iter().find(|d| d.id == id)
    }

    /// All descriptors in declaration order.
    pub fn descriptors(&self) -> &[ParamDescriptor] {
        &self.params
    }
}

// ============================================================================
// Unit Conversions
// ============================================================================

/// Convert decibels to linear gain: 10^(dB/20).
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels: 20·log10(linear).
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear) * FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive() -> ParamDescriptor {
        ParamDescriptor::gain_db("drive", "Drive (dB)", -30.0, 60.0, 0.0)
    }

    #[test]
    fn clamp_forces_range() {
        let d = drive();
        assert_eq!(d.constrain(999.0), 60.0);
        assert_eq!(d.constrain(-500.0), -30.0);
        assert_eq!(d.constrain(0.0), 0.0);
    }

    #[test]
    fn non_finite_falls_back_to_default() {
        let d = drive();
        assert_eq!(d.constrain(f32::NAN), 0.0);
        assert_eq!(d.constrain(f32::INFINITY), 0.0);
        assert_eq!(d.constrain(f32::NEG_INFINITY), 0.0);
    }

    #[test]
    fn toggle_quantizes() {
        let d = ParamDescriptor::toggle("sc", "Sidechain", true);
        assert_eq!(d.constrain(0.49), 0.0);
        assert_eq!(d.constrain(0.5), 1.0);
        assert_eq!(d.constrain(7.0), 1.0);
        assert_eq!(d.constrain(-3.0), 0.0);
    }

    #[test]
    fn choice_out_of_range_snaps_to_default_tag() {
        let d = ParamDescriptor::choice("wavefolder", "Wavefolder Type", 3);
        assert_eq!(d.constrain(1.0), 1.0);
        assert_eq!(d.constrain(2.4), 2.0);
        // Invalid tags select the default variant, not the nearest edge
        assert_eq!(d.constrain(7.0), 0.0);
        assert_eq!(d.constrain(-1.0), 0.0);
    }

    #[test]
    fn linear_normalize_roundtrip() {
        let d = drive();
        for raw in [-30.0, -12.5, 0.0, 31.4, 60.0] {
            let n = d.normalize(raw);
            assert!((0.0..=1.0).contains(&n), "normalized {} out of range", n);
            let back = d.denormalize(n);
            assert!(
                (raw - back).abs() < 1e-4,
                "roundtrip failed: {} -> {} -> {}",
                raw,
                n,
                back
            );
        }
    }

    #[test]
    fn log_normalize_roundtrip() {
        let d = ParamDescriptor::time_ms("sag", "Sag Time (ms)", 0.1, 100.0, 100.0);
        for raw in [0.1, 1.0, 10.0, 42.0, 100.0] {
            let n = d.normalize(raw);
            let back = d.denormalize(n);
            assert!(
                (raw - back).abs() / raw < 1e-4,
                "roundtrip failed: {} -> {} -> {}",
                raw,
                n,
                back
            );
        }
        // Log travel: midpoint of the knob is the geometric mean
        let mid = d.denormalize(0.5);
        assert!((mid - 3.1623).abs() < 0.01, "expected ~sqrt(0.1*100), got {}", mid);
    }

    #[test]
    fn normalize_endpoints_are_exact() {
        let d = drive();
        assert_eq!(d.normalize(d.min), 0.0);
        assert_eq!(d.normalize(d.max), 1.0);
        assert_eq!(d.denormalize(0.0), d.min);
        assert_eq!(d.denormalize(1.0), d.max);
    }

    #[test]
    #[should_panic(expected = "duplicate parameter id")]
    fn duplicate_ids_panic() {
        ParamSchema::new(vec![drive(), drive()]);
    }

    #[test]
    fn schema_lookup() {
        let schema = ParamSchema::new(vec![
            drive(),
            ParamDescriptor::gain_db("outGain", "Output Gain (dB)", -30.0, 30.0, 0.0),
        ]);
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.index_of("outGain"), Some(1));
        assert_eq!(schema.index_of("nope"), None);
        assert_eq!(schema.find("drive").unwrap().max, 60.0);
    }

    #[test]
    fn db_conversion_known_values() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-6.0206) - 0.5).abs() < 0.001);
        assert!((db_to_linear(6.0206) - 2.0).abs() < 0.001);
    }

    #[test]
    fn db_conversion_roundtrip() {
        let original = 0.5;
        let db = linear_to_db(original);
        let back = db_to_linear(db);
        assert!(
            (original - back).abs() < 1e-5,
            "roundtrip failed: {} -> {} -> {}",
            original,
            db,
            back
        );
    }
}
