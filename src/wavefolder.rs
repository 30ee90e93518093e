//! Wavefolding engine and its block processor.
//!
//! Signal flow, per sample:
//!
//! ```text
//! input → +pre-fold bias → ×drive → fold (selected variant) → +post-fold bias
//!   → dry/wet mix → ×output gain
//! ```
//!
//! The fold variants share one threshold control: [`fold_to_range`] reflects
//! the signal back into ±threshold, [`sin_fold`] maps it through a
//! threshold-scaled sine transfer, [`combo_fold`] blends the two. Gains and
//! mix are smoothed; biases and threshold switch per block without smoothing —
//! they move slowly in practice and their discontinuities fold away.
//!
//! [`FoldingProcessor`] owns the engine and a shared parameter store and wires
//! them together once per block: snapshot, convert units, configure, dispatch.

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::{sync::Arc, vec, vec::Vec};
#[cfg(feature = "std")]
use std::sync::Arc;

use crate::param::{db_to_linear, ParamDescriptor, ParamSchema};
use crate::processor::{AudioBlock, BlockProcessor};
use crate::smoother::SmoothedParam;
use crate::store::ParamStore;
use crate::variant::FoldVariant;

#[cfg(not(feature = "std"))]
use libm::{fabsf, sinf};

#[cfg(feature = "std")]
fn fabsf(x: f32) -> f32 {
    x.abs()
}
#[cfg(feature = "std")]
fn sinf(x: f32) -> f32 {
    x.sin()
}

/// Smallest usable fold threshold; the transfer functions divide by it.
const MIN_THRESHOLD: f32 = 0.01;

// ============================================================================
// Fold Transfer Functions
// ============================================================================

/// Reflects a sample back into `[-threshold, threshold]`.
///
/// Closed-form triangle reflection: however far the input overshoots, the
/// result is computed in constant time — no per-sample iteration that could
/// grow with drive.
#[inline]
pub fn fold_to_range(x: f32, threshold: f32) -> f32 {
    let t = threshold.max(MIN_THRESHOLD);
    if fabsf(x) <= t {
        return x;
    }
    let period = 4.0 * t;
    let wrapped = ((x - t) % period + period) % period;
    fabsf(wrapped - 2.0 * t) - t
}

/// Sine-shaped fold scaled to the threshold.
///
/// Linear-ish near zero, folding smoothly once |x| passes the threshold.
#[inline]
pub fn sin_fold(x: f32, threshold: f32) -> f32 {
    let t = threshold.max(MIN_THRESHOLD);
    t * sinf(x * core::f32::consts::FRAC_PI_2 / t)
}

/// Equal blend of the range fold and the sine fold.
///
/// Chaining the two would be a no-op — the sine transfer's period equals the
/// reflection period, so it is invariant under [`fold_to_range`]. Blending
/// keeps the dense reflected spectrum and rounds its corners.
#[inline]
pub fn combo_fold(x: f32, threshold: f32) -> f32 {
    0.5 * (fold_to_range(x, threshold) + sin_fold(x, threshold))
}

// ============================================================================
// Engine
// ============================================================================

/// Wavefolding engine.
///
/// Configured entirely through setters in engine units (linear gains, unit
/// intervals); does not know about decibels, percentages, or parameter
/// stores. Owned by exactly one audio context.
#[derive(Debug, Clone)]
pub struct Wavefolder {
    drive: SmoothedParam,
    out_gain: SmoothedParam,
    mix: SmoothedParam,
    bias_pre: f32,
    bias_post: f32,
    threshold: f32,
    variant: FoldVariant,
}

impl Wavefolder {
    /// Creates an engine at identity-ish defaults: unity gains, full wet,
    /// threshold just below full scale.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            drive: SmoothedParam::new(1.0, sample_rate),
            out_gain: SmoothedParam::new(1.0, sample_rate),
            mix: SmoothedParam::new(1.0, sample_rate),
            bias_pre: 0.0,
            bias_post: 0.0,
            threshold: 0.9,
            variant: FoldVariant::default(),
        }
    }

    /// Sets input drive as linear gain.
    pub fn set_drive(&mut self, gain: f32) {
        self.drive.set_target(gain);
    }

    /// Sets output gain as linear gain.
    pub fn set_out_gain(&mut self, gain: f32) {
        self.out_gain.set_target(gain);
    }

    /// Sets DC bias added before the drive stage.
    pub fn set_bias_pre(&mut self, bias: f32) {
        self.bias_pre = bias.clamp(-1.0, 1.0);
    }

    /// Sets DC bias added after folding.
    pub fn set_bias_post(&mut self, bias: f32) {
        self.bias_post = bias.clamp(-1.0, 1.0);
    }

    /// Sets the fold threshold.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold.max(MIN_THRESHOLD);
    }

    /// Sets dry/wet mix as a unit interval (0 = dry, 1 = folded).
    pub fn set_mix(&mut self, mix: f32) {
        self.mix.set_target(mix.clamp(0.0, 1.0));
    }

    /// Selects the active fold variant.
    pub fn set_variant(&mut self, variant: FoldVariant) {
        self.variant = variant;
    }

    /// The active fold variant.
    pub fn variant(&self) -> FoldVariant {
        self.variant
    }

    /// Adapts smoothing ramps to a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.drive.set_sample_rate(sample_rate);
        self.out_gain.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
    }

    /// Snaps smoothers to their targets. Call before playback starts so the
    /// first block does not ramp from stale values.
    pub fn reset(&mut self) {
        self.drive.snap_to_target();
        self.out_gain.snap_to_target();
        self.mix.snap_to_target();
    }

    /// Applies the selected fold to one driven sample.
    #[inline]
    fn apply_fold(&self, x: f32) -> f32 {
        match self.variant {
            FoldVariant::FoldToRange => fold_to_range(x, self.threshold),
            FoldVariant::SinFold => sin_fold(x, self.threshold),
            FoldVariant::ComboFold => combo_fold(x, self.threshold),
        }
    }

    /// Transforms every channel of one block in place.
    ///
    /// Frame-major: smoothers advance once per frame regardless of channel
    /// count, so ramp times do not depend on the layout.
    pub fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        let samples = channels.first().map_or(0, |c| c.len());
        for i in 0..samples {
            let drive = self.drive.next();
            let out_gain = self.out_gain.next();
            let mix = self.mix.next();
            for channel in channels.iter_mut() {
                let dry = channel[i];
                let driven = (dry + self.bias_pre) * drive;
                let folded = self.apply_fold(driven) + self.bias_post;
                channel[i] = (dry + (folded - dry) * mix) * out_gain;
            }
        }
    }
}

// ============================================================================
// Processor
// ============================================================================

/// Parameter identifiers for the folding unit.
///
/// Stable: persisted state and host automation address parameters by these
/// strings.
pub mod ids {
    pub const DRIVE: &str = "drive";
    pub const OUT_GAIN: &str = "outGain";
    pub const BIAS_PRE: &str = "biasPre";
    pub const BIAS_POST: &str = "biasPost";
    pub const THRESHOLD: &str = "thres";
    pub const MIX: &str = "mix";
    pub const VARIANT: &str = "wavefolder";
}

/// Slot indices matching the schema declaration order below.
mod slot {
    pub const DRIVE: usize = 0;
    pub const OUT_GAIN: usize = 1;
    pub const BIAS_PRE: usize = 2;
    pub const BIAS_POST: usize = 3;
    pub const THRESHOLD: usize = 4;
    pub const MIX: usize = 5;
    pub const VARIANT: usize = 6;
}

/// Builds the folding unit's parameter schema.
pub fn folding_schema() -> ParamSchema {
    ParamSchema::new(vec![
        ParamDescriptor::gain_db(ids::DRIVE, "Drive (dB)", -30.0, 60.0, 0.0),
        ParamDescriptor::gain_db(ids::OUT_GAIN, "Output Gain (dB)", -30.0, 30.0, 0.0),
        ParamDescriptor::bipolar(ids::BIAS_PRE, "Bias (Pre)", 0.0),
        ParamDescriptor::bipolar(ids::BIAS_POST, "Bias (Post)", 0.0),
        ParamDescriptor::linear(ids::THRESHOLD, "Fold Threshold", 0.1, 1.0, 0.9, 0.01),
        ParamDescriptor::percent(ids::MIX, "Mix (%)", 100.0, 100.0),
        ParamDescriptor::choice(ids::VARIANT, "Wavefolder Type", FoldVariant::COUNT),
    ])
}

/// Block processor for the wavefolding unit.
///
/// Owns the engine and a pre-sized snapshot buffer; shares the parameter
/// store with the control side through `Arc`.
pub struct FoldingProcessor {
    store: Arc<ParamStore>,
    engine: Wavefolder,
    snapshot: Vec<f32>,
}

impl FoldingProcessor {
    /// Creates a processor with all parameters at their defaults.
    ///
    /// Functional before [`prepare`](BlockProcessor::prepare) is called — the
    /// engine starts at a safe default state at a nominal sample rate.
    pub fn new() -> Self {
        let schema = folding_schema();
        let len = schema.len();
        Self {
            store: Arc::new(ParamStore::new(schema)),
            engine: Wavefolder::new(44_100.0),
            snapshot: vec![0.0; len],
        }
    }

    /// Pushes the current snapshot into the engine, converting units.
    ///
    /// A snapshot containing any non-finite value is discarded whole and the
    /// engine keeps its previous configuration; audio continues unmuted.
    fn update_engine(&mut self) {
        let snap = &self.snapshot;
        if snap.iter().any(|v| !v.is_finite()) {
            return;
        }
        self.engine.set_drive(db_to_linear(snap[slot::DRIVE]));
        self.engine.set_out_gain(db_to_linear(snap[slot::OUT_GAIN]));
        self.engine.set_bias_pre(snap[slot::BIAS_PRE]);
        self.engine.set_bias_post(snap[slot::BIAS_POST]);
        self.engine.set_threshold(snap[slot::THRESHOLD]);
        self.engine.set_mix(snap[slot::MIX] / 100.0);
        self.engine
            .set_variant(FoldVariant::from_index(snap[slot::VARIANT] as i32));
    }
}

impl Default for FoldingProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockProcessor for FoldingProcessor {
    fn parameters(&self) -> &ParamSchema {
        self.store.schema()
    }

    fn store(&self) -> &Arc<ParamStore> {
        &self.store
    }

    fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        log::debug!(
            "folding processor prepared: sample_rate={}, max_block={}",
            sample_rate,
            max_block_size
        );
        self.engine.set_sample_rate(sample_rate);
        self.store.snapshot_into(&mut self.snapshot);
        self.update_engine();
        self.engine.reset();
    }

    fn process(&mut self, block: &mut AudioBlock) {
        block.clear_tail_channels();
        self.store.snapshot_into(&mut self.snapshot);
        self.update_engine();
        self.engine.process_block(block.channels_mut());
    }
}
