//! Tube-style saturation engine and its block processor.
//!
//! Signal flow, per sample and channel:
//!
//! ```text
//! input → envelope follower (sag) → +pre bias → ×drive × supply droop
//!   → asymmetric rational shaper → +extra harmonics → +post bias
//!   → DC blocker → ×output gain
//! ```
//!
//! The shaper uses independent denominator coefficients for the positive and
//! negative halves of the waveform; unequal coefficients clip the halves
//! differently and generate even harmonics the way an unbalanced tube stage
//! does. The sag envelope models power-supply droop: sustained level charges
//! the envelope and pulls the effective drive down with the configured time
//! constant. A harmonics generator adds a controlled amount of extra even or
//! odd content, optionally sidechained to the envelope so it rides the
//! playing dynamics.
//!
//! Bias and asymmetry both shift the output's DC operating point, so a DC
//! blocker sits before the output gain.

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

#[cfg(not(feature = "std"))]
use libm::{expf, fabsf};

#[cfg(feature = "std")]
fn expf(x: f32) -> f32 {
    x.exp()
}
#[cfg(feature = "std")]
fn fabsf(x: f32) -> f32 {
    x.abs()
}

/// Layouts are validated to mono or stereo before any audio flows.
const MAX_CHANNELS: usize = 2;

/// DC blocker feedback coefficient (~20 Hz highpass at 44.1 kHz).
const DC_BLOCKER_COEFF: f32 = 0.995;

/// How hard a fully charged sag envelope pulls the drive down.
const SAG_DEPTH: f32 = 0.3;

/// Asymmetric rational soft clipper.
///
/// Positive and negative halves saturate with independent denominator
/// coefficients; a coefficient of 0 leaves that half linear.
#[inline]
pub fn tube_shape(x: f32, coeff_pos: f32, coeff_neg: f32) -> f32 {
    if x >= 0.0 {
        x / (1.0 + coeff_pos * x)
    } else {
        x / (1.0 - coeff_neg * x)
    }
}

/// Tube saturation engine.
///
/// Configured through setters in engine units; owns per-channel envelope and
/// DC-blocker state for up to stereo operation.
#[derive(Debug, Clone)]
pub struct TubeStage {
    drive: SmoothedParam,
    out_gain: SmoothedParam,
    harm_gain: SmoothedParam,
    bias_pre: f32,
    bias_post: f32,
    coeff_pos: f32,
    coeff_neg: f32,
    harm_balance: f32,
    harm_sidechain: bool,
    /// One-pole coefficient for the sag envelope follower.
    sag_coeff: f32,
    sag_ms: f32,
    sample_rate: f32,

    // Per-channel state
    envelope: [f32; MAX_CHANNELS],
    dc_x1: [f32; MAX_CHANNELS],
    dc_y1: [f32; MAX_CHANNELS],
}

impl TubeStage {
    /// Creates an engine at neutral defaults: unity gains, symmetric
    /// coefficients, 100 ms sag, a touch of extra harmonics.
    pub fn new(sample_rate: f32) -> Self {
        let mut stage = Self {
            drive: SmoothedParam::new(1.0, sample_rate),
            out_gain: SmoothedParam::new(1.0, sample_rate),
            harm_gain: SmoothedParam::new(0.05, sample_rate),
            bias_pre: 0.0,
            bias_post: 0.0,
            coeff_pos: 1.0,
            coeff_neg: 1.0,
            harm_balance: 0.5,
            harm_sidechain: true,
            sag_coeff: 0.0,
            sag_ms: 100.0,
            sample_rate,
            envelope: [0.0; MAX_CHANNELS],
            dc_x1: [0.0; MAX_CHANNELS],
            dc_y1: [0.0; MAX_CHANNELS],
        };
        stage.recalculate_sag_coeff();
        stage
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

    /// Sets DC bias added after shaping.
    pub fn set_bias_post(&mut self, bias: f32) {
        self.bias_post = bias.clamp(-1.0, 1.0);
    }

    /// Sets the positive-half shaper coefficient.
    pub fn set_coeff_pos(&mut self, coeff: f32) {
        self.coeff_pos = coeff.max(0.0);
    }

    /// Sets the negative-half shaper coefficient.
    pub fn set_coeff_neg(&mut self, coeff: f32) {
        self.coeff_neg = coeff.max(0.0);
    }

    /// Sets the sag (supply droop) time constant in milliseconds.
    pub fn set_sag_ms(&mut self, sag_ms: f32) {
        self.sag_ms = sag_ms.max(0.1);
        self.recalculate_sag_coeff();
    }

    /// Sets the extra-harmonics amount as a unit interval (0..0.5 typical).
    pub fn set_harm_gain(&mut self, gain: f32) {
        self.harm_gain.set_target(gain.max(0.0));
    }

    /// Sets the even/odd harmonics balance (0 = odd, 1 = even).
    pub fn set_harm_balance(&mut self, balance: f32) {
        self.harm_balance = balance.clamp(0.0, 1.0);
    }

    /// Enables or disables envelope sidechaining of the harmonics.
    pub fn set_harm_sidechain(&mut self, enabled: bool) {
        self.harm_sidechain = enabled;
    }

    /// Adapts ramps and the sag time constant to a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.drive.set_sample_rate(sample_rate);
        self.out_gain.set_sample_rate(sample_rate);
        self.harm_gain.set_sample_rate(sample_rate);
        self.recalculate_sag_coeff();
    }

    /// Clears envelope and filter state and snaps smoothers.
    pub fn reset(&mut self) {
        self.envelope = [0.0; MAX_CHANNELS];
        self.dc_x1 = [0.0; MAX_CHANNELS];
        self.dc_y1 = [0.0; MAX_CHANNELS];
        self.drive.snap_to_target();
        self.out_gain.snap_to_target();
        self.harm_gain.snap_to_target();
    }

    /// coeff = 1 - e^(-1 / (t * fs))
    fn recalculate_sag_coeff(&mut self) {
        let samples = self.sag_ms * 1e-3 * self.sample_rate;
        self.sag_coeff = if samples > 0.0 {
            1.0 - expf(-1.0 / samples)
        } else {
            1.0
        };
    }

    /// Extra harmonic content derived from the shaped sample.
    ///
    /// The even term (x·|x|) and odd term (x³) are both odd-symmetric
    /// functions, so symmetric coefficients keep a symmetric transfer.
    #[inline]
    fn harmonics(&self, shaped: f32, amount: f32, envelope: f32) -> f32 {
        let even = shaped * fabsf(shaped);
        let odd = shaped * shaped * shaped;
        let blend = self.harm_balance * even + (1.0 - self.harm_balance) * odd;
        let scale = if self.harm_sidechain { envelope } else { 1.0 };
        blend * amount * scale
    }

    /// Transforms every channel of one block in place.
    ///
    /// Channels beyond stereo pass through untouched; the layout validator
    /// rejects such configurations before audio flows.
    pub fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        let samples = channels.first().map_or(0, |c| c.len());
        for i in 0..samples {
            let drive = self.drive.next();
            let out_gain = self.out_gain.next();
            let harm = self.harm_gain.next();
            for (ch, channel) in channels.iter_mut().enumerate().take(MAX_CHANNELS) {
                let input = channel[i];

                // Sag envelope tracks pre-drive level
                let env = self.envelope[ch] + self.sag_coeff * (fabsf(input) - self.envelope[ch]);
                self.envelope[ch] = env;
                let droop = 1.0 / (1.0 + SAG_DEPTH * env);

                let driven = (input + self.bias_pre) * drive * droop;
                let shaped = tube_shape(driven, self.coeff_pos, self.coeff_neg);
                let colored = shaped + self.harmonics(shaped, harm, env) + self.bias_post;

                // DC blocker: y[n] = x[n] - x[n-1] + R·y[n-1]
                let blocked = colored - self.dc_x1[ch] + DC_BLOCKER_COEFF * self.dc_y1[ch];
                self.dc_x1[ch] = colored;
                self.dc_y1[ch] = blocked;

                channel[i] = blocked * out_gain;
            }
        }
    }
}

// ============================================================================
// Processor
// ============================================================================

/// Parameter identifiers for the saturation unit.
pub mod ids {
    pub const DRIVE: &str = "drive";
    pub const OUT_GAIN: &str = "outGain";
    pub const BIAS_PRE: &str = "biasPre";
    pub const BIAS_POST: &str = "biasPost";
    pub const COEFF_POS: &str = "coeffPos";
    pub const COEFF_NEG: &str = "coeffNeg";
    pub const SAG_TIME: &str = "sag";
    pub const HARM_GAIN: &str = "harmGain";
    pub const HARM_BALANCE: &str = "harmBalance";
    pub const HARM_SIDECHAIN: &str = "harmSidechain";
}

/// Slot indices matching the schema declaration order below.
mod slot {
    pub const DRIVE: usize = 0;
    pub const OUT_GAIN: usize = 1;
    pub const BIAS_PRE: usize = 2;
    pub const BIAS_POST: usize = 3;
    pub const COEFF_POS: usize = 4;
    pub const COEFF_NEG: usize = 5;
    pub const SAG_TIME: usize = 6;
    pub const HARM_GAIN: usize = 7;
    pub const HARM_BALANCE: usize = 8;
    pub const HARM_SIDECHAIN: usize = 9;
}

/// Builds the saturation unit's parameter schema.
pub fn saturation_schema() -> ParamSchema {
    ParamSchema::new(vec![
        ParamDescriptor::gain_db(ids::DRIVE, "Drive (dB)", -30.0, 60.0, 0.0),
        ParamDescriptor::gain_db(ids::OUT_GAIN, "Output Gain (dB)", -30.0, 30.0, 0.0),
        ParamDescriptor::bipolar(ids::BIAS_PRE, "Bias (Pre)", 0.0),
        ParamDescriptor::bipolar(ids::BIAS_POST, "Bias (Post)", 0.0),
        ParamDescriptor::linear(ids::COEFF_POS, "Coeff (Pos)", 0.0, 5.0, 1.0, 0.01),
        ParamDescriptor::linear(ids::COEFF_NEG, "Coeff (Neg)", 0.0, 5.0, 1.0, 0.01),
        ParamDescriptor::time_ms(ids::SAG_TIME, "Sag Time (ms)", 0.1, 100.0, 100.0),
        ParamDescriptor::percent(ids::HARM_GAIN, "Extra Harmonics (%)", 50.0, 5.0),
        ParamDescriptor::linear(ids::HARM_BALANCE, "Harmonics Balance", 0.0, 1.0, 0.5, 0.01),
        ParamDescriptor::toggle(ids::HARM_SIDECHAIN, "Harmonics Sidechain", true),
    ])
}

/// Block processor for the tube saturation unit.
///
/// Single fixed shaping variant — no selector parameter.
pub struct SaturationProcessor {
    store: Arc<ParamStore>,
    engine: TubeStage,
    snapshot: Vec<f32>,
}

impl SaturationProcessor {
    /// Creates a processor with all parameters at their defaults.
    pub fn new() -> Self {
        let schema = saturation_schema();
        let len = schema.len();
        Self {
            store: Arc::new(ParamStore::new(schema)),
            engine: TubeStage::new(44_100.0),
            snapshot: vec![0.0; len],
        }
    }

    /// Pushes the current snapshot into the engine, converting units.
    ///
    /// A snapshot containing any non-finite value is discarded whole; the
    /// engine keeps its previous configuration and audio continues unmuted.
    fn update_engine(&mut self) {
        let snap = &self.snapshot;
        if snap.iter().any(|v| !v.is_finite()) {
            return;
        }
        self.engine.set_drive(db_to_linear(snap[slot::DRIVE]));
        self.engine.set_out_gain(db_to_linear(snap[slot::OUT_GAIN]));
        self.engine.set_bias_pre(snap[slot::BIAS_PRE]);
        self.engine.set_bias_post(snap[slot::BIAS_POST]);
        self.engine.set_coeff_pos(snap[slot::COEFF_POS]);
        self.engine.set_coeff_neg(snap[slot::COEFF_NEG]);
        self.engine.set_sag_ms(snap[slot::SAG_TIME]);
        self.engine.set_harm_gain(snap[slot::HARM_GAIN] / 100.0);
        self.engine.set_harm_balance(snap[slot::HARM_BALANCE]);
        self.engine
            .set_harm_sidechain(snap[slot::HARM_SIDECHAIN] >= 0.5);
    }
}

impl Default for SaturationProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockProcessor for SaturationProcessor {
    fn parameters(&self) -> &ParamSchema {
        self.store.schema()
    }

    fn store(&self) -> &Arc<ParamStore> {
        &self.store
    }

    fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        log::debug!(
            "saturation processor prepared: sample_rate={}, max_block={}",
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

#[cfg(test)]
mod tests {
    use super::*;

    /// Streams `signal` through the processor as the left channel of a
    /// stereo block, with an identical right channel.
    fn run_blocks(p: &mut SaturationProcessor, signal: &mut [f32], block_size: usize) {
        for chunk in signal.chunks_mut(block_size) {
            let mut mirror = chunk.to_vec();
            let mut channels: [&mut [f32]; 2] = [chunk, &mut mirror];
            let mut block = AudioBlock::new(&mut channels, 2);
            p.process(&mut block);
        }
    }

    #[test]
    fn shaper_compresses_toward_asymptote() {
        assert!((tube_shape(0.25, 1.0, 1.0) - 0.2).abs() < 1e-6);
        // Large positive input approaches 1/coeff
        assert!(tube_shape(100.0, 1.0, 1.0) < 1.0);
        assert!(tube_shape(100.0, 1.0, 1.0) > 0.98);
        // Zero coefficient leaves that half linear
        assert_eq!(tube_shape(3.0, 0.0, 1.0), 3.0);
    }

    #[test]
    fn shaper_is_odd_symmetric_with_equal_coeffs() {
        for x in [0.1, 0.5, 2.0, 10.0] {
            let pos = tube_shape(x, 1.5, 1.5);
            let neg = tube_shape(-x, 1.5, 1.5);
            assert!((pos + neg).abs() < 1e-6, "asymmetry at {}: {} vs {}", x, pos, neg);
        }
    }

    #[test]
    fn unequal_coeffs_clip_halves_differently() {
        let pos = tube_shape(2.0, 0.5, 3.0);
        let neg = tube_shape(-2.0, 0.5, 3.0);
        assert!(
            (pos + neg).abs() > 0.1,
            "expected asymmetry, got {} vs {}",
            pos,
            neg
        );
    }

    #[test]
    fn output_stays_bounded_under_heavy_drive() {
        let mut p = SaturationProcessor::new();
        p.store().set(ids::DRIVE, 60.0);
        p.prepare(48000.0, 512);

        let mut signal: Vec<f32> = (0..2048)
            .map(|i| if i % 2 == 0 { 0.9 } else { -0.9 })
            .collect();
        run_blocks(&mut p, &mut signal, 512);

        for s in &signal {
            assert!(s.is_finite());
            assert!(s.abs() < 4.0, "runaway output: {}", s);
        }
    }

    #[test]
    fn sag_compresses_sustained_level() {
        let mut p = SaturationProcessor::new();
        p.store().set(ids::SAG_TIME, 10.0);
        p.store().set(ids::HARM_GAIN, 0.0);
        p.prepare(48000.0, 512);

        // Alternating full-scale signal so the DC blocker passes it
        let mut signal: Vec<f32> = (0..4096)
            .map(|i| if i % 2 == 0 { 0.8 } else { -0.8 })
            .collect();
        run_blocks(&mut p, &mut signal, 512);

        // Skip the DC blocker's settling, then compare early vs late level
        let early: f32 = signal[64..128].iter().map(|s| s.abs()).sum::<f32>() / 64.0;
        let late: f32 = signal[4032..].iter().map(|s| s.abs()).sum::<f32>() / 64.0;
        assert!(
            late < early * 0.95,
            "sag did not compress: early {} late {}",
            early,
            late
        );
    }

    #[test]
    fn harmonics_amount_changes_the_output() {
        let render = |harm: f32| -> f32 {
            let mut p = SaturationProcessor::new();
            p.store().set(ids::DRIVE, 12.0);
            p.store().set(ids::HARM_GAIN, harm);
            p.store().set(ids::HARM_SIDECHAIN, 0.0);
            p.prepare(48000.0, 256);

            let mut signal: Vec<f32> = (0..256)
                .map(|i| if i % 2 == 0 { 0.5 } else { -0.5 })
                .collect();
            run_blocks(&mut p, &mut signal, 256);
            signal[200].abs()
        };

        let clean = render(0.0);
        let rich = render(50.0);
        assert!(
            (clean - rich).abs() > 1e-4,
            "harmonics had no effect: {} vs {}",
            clean,
            rich
        );
    }

    #[test]
    fn dc_offset_from_bias_is_blocked() {
        let mut p = SaturationProcessor::new();
        p.store().set(ids::BIAS_PRE, 0.5);
        p.prepare(48000.0, 512);

        // Silence in: any residual DC at the output must decay away
        let mut signal = vec![0.0f32; 8192];
        run_blocks(&mut p, &mut signal, 512);

        let tail: f32 = signal[7680..].iter().map(|s| s.abs()).sum::<f32>() / 512.0;
        assert!(tail < 0.01, "DC leaked through: {}", tail);
    }

    #[test]
    fn slot_indices_match_schema_order() {
        let schema = saturation_schema();
        assert_eq!(schema.index_of(ids::DRIVE), Some(slot::DRIVE));
        assert_eq!(schema.index_of(ids::OUT_GAIN), Some(slot::OUT_GAIN));
        assert_eq!(schema.index_of(ids::BIAS_PRE), Some(slot::BIAS_PRE));
        assert_eq!(schema.index_of(ids::BIAS_POST), Some(slot::BIAS_POST));
        assert_eq!(schema.index_of(ids::COEFF_POS), Some(slot::COEFF_POS));
        assert_eq!(schema.index_of(ids::COEFF_NEG), Some(slot::COEFF_NEG));
        assert_eq!(schema.index_of(ids::SAG_TIME), Some(slot::SAG_TIME));
        assert_eq!(schema.index_of(ids::HARM_GAIN), Some(slot::HARM_GAIN));
        assert_eq!(schema.index_of(ids::HARM_BALANCE), Some(slot::HARM_BALANCE));
        assert_eq!(
            schema.index_of(ids::HARM_SIDECHAIN),
            Some(slot::HARM_SIDECHAIN)
        );
    }

    #[test]
    fn sag_time_normalizes_logarithmically() {
        let schema = saturation_schema();
        let sag = schema.find(ids::SAG_TIME).unwrap();
        // Knob midpoint lands at the geometric mean of the range
        let mid = sag.denormalize(0.5);
        assert!((mid - 3.1623).abs() < 0.01, "expected ~3.16 ms, got {}", mid);
    }
}
