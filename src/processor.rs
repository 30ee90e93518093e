//! Block processing contract: bus layouts, borrowed audio blocks, and the
//! processor trait.
//!
//! A host drives a processor through three calls: [`supports_layout`]
//! (negotiation, before any audio flows), [`prepare`] (once, before playback),
//! and [`process`] (once per block on the real-time thread). The processor
//! borrows the host's channel buffers for exactly the duration of one call and
//! mutates them in place — the callback runs to completion synchronously, with
//! no suspended state between blocks.
//!
//! [`supports_layout`]: BlockProcessor::supports_layout
//! [`prepare`]: BlockProcessor::prepare
//! [`process`]: BlockProcessor::process

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::sync::Arc;
#[cfg(feature = "std")]
use std::sync::Arc;

use crate::param::ParamSchema;
use crate::store::ParamStore;

/// A channel-count configuration proposed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    /// Input channel count (0 for generators).
    pub inputs: usize,
    /// Output channel count.
    pub outputs: usize,
}

impl ChannelLayout {
    /// Mono in, mono out.
    pub const fn mono() -> Self {
        Self { inputs: 1, outputs: 1 }
    }

    /// Stereo in, stereo out.
    pub const fn stereo() -> Self {
        Self { inputs: 2, outputs: 2 }
    }

    /// Arbitrary in/out counts.
    pub const fn new(inputs: usize, outputs: usize) -> Self {
        Self { inputs, outputs }
    }
}

/// What kind of unit a processor is, for layout validation.
///
/// Both shipped processors are plain audio effects; the other two kinds exist
/// because the validation rules are defined over them and a downstream crate
/// implementing [`BlockProcessor`] for a generator or MIDI effect reuses this
/// validator unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutRules {
    /// Unit processes no audio at all; every layout is acceptable.
    pub midi_effect: bool,
    /// Unit has no audio input (synthesizer); the input rule is waived.
    pub generator: bool,
}

impl LayoutRules {
    /// Rules for a plain audio effect (audio in, audio out).
    pub const fn effect() -> Self {
        Self {
            midi_effect: false,
            generator: false,
        }
    }

    /// Rules for a MIDI-only unit.
    pub const fn midi_effect() -> Self {
        Self {
            midi_effect: true,
            generator: false,
        }
    }

    /// Rules for a generator (no audio input).
    pub const fn generator() -> Self {
        Self {
            midi_effect: false,
            generator: true,
        }
    }

    /// Accepts or rejects a proposed layout.
    ///
    /// Evaluated in order: MIDI-only units accept unconditionally; otherwise
    /// the output must be exactly mono or exactly stereo; and unless the unit
    /// is a generator, the input set must equal the output set.
    pub fn accepts(&self, layout: &ChannelLayout) -> bool {
        if self.midi_effect {
            return true;
        }
        if layout.outputs != 1 && layout.outputs != 2 {
            return false;
        }
        if !self.generator && layout.inputs != layout.outputs {
            return false;
        }
        true
    }
}

/// Borrowed view over one block of host-owned channel buffers.
///
/// Wraps the per-callback `&mut [&mut [f32]]` the host hands over, plus the
/// number of channels that actually carry input. Channel lengths are equal for
/// the duration of a callback; the block neither owns nor resizes anything.
pub struct AudioBlock<'a, 'b> {
    channels: &'a mut [&'b mut [f32]],
    input_channels: usize,
}

impl<'a, 'b> AudioBlock<'a, 'b> {
    /// Wraps host channel buffers.
    ///
    /// `input_channels` beyond the actual channel count is capped rather than
    /// rejected; the host is the authority on how many buffers exist.
    pub fn new(channels: &'a mut [&'b mut [f32]], input_channels: usize) -> Self {
        let capped = input_channels.min(channels.len());
        Self {
            channels,
            input_channels: capped,
        }
    }

    /// Total channel count (inputs and outputs share buffers in-place).
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Channels that carry valid input samples.
    pub fn num_inputs(&self) -> usize {
        self.input_channels
    }

    /// Samples per channel in this block.
    pub fn samples(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }

    /// Zero-fills every output channel beyond the valid inputs.
    ///
    /// A host may hand over more output buffers than it filled with input;
    /// their previous contents are undefined and must not leak to the output.
    pub fn clear_tail_channels(&mut self) {
        for channel in self.channels.iter_mut().skip(self.input_channels) {
            channel.fill(0.0);
        }
    }

    /// Mutable access to all channel slices.
    #[inline]
    pub fn channels_mut(&mut self) -> &mut [&'b mut [f32]] {
        self.channels
    }
}

/// The capability surface a host needs from an effect unit.
///
/// One implementation per processor variant; no shared base state beyond this
/// contract. All methods other than [`process`](Self::process) run off the
/// real-time path.
pub trait BlockProcessor {
    /// The parameters this processor exposes, in stable order.
    fn parameters(&self) -> &ParamSchema;

    /// Shared handle to the live parameter store.
    ///
    /// Control surfaces and automation write through a clone of this handle;
    /// the processor reads it once per block.
    fn store(&self) -> &Arc<ParamStore>;

    /// Layout validation rules for this unit.
    fn layout_rules(&self) -> LayoutRules {
        LayoutRules::effect()
    }

    /// Accepts or rejects a channel configuration before audio flows.
    ///
    /// Consulted by the host during negotiation; once accepted, the layout
    /// does not change mid-session.
    fn supports_layout(&self, layout: &ChannelLayout) -> bool {
        self.layout_rules().accepts(layout)
    }

    /// Called once before audio starts. Resets stateful engine memory and
    /// adapts smoothing to the sample rate. Not real-time-safe.
    fn prepare(&mut self, sample_rate: f32, max_block_size: usize);

    /// Processes one block in place on the real-time thread.
    ///
    /// Must not allocate, block, or panic. Any internal inconsistency
    /// degrades to the last-known-good configuration; the block is always
    /// either fully transformed or passed through a previous valid state —
    /// never half-written, never silenced by an error path.
    fn process(&mut self, block: &mut AudioBlock);
}
