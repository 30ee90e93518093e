//! # foldkit
//!
//! Real-time wavefolding and tube saturation with a lock-free parameter
//! bridge.
//!
//! This crate is the core of an audio effect unit: it describes a small set
//! of user-adjustable parameters, keeps their live values readable from the
//! audio thread without locks, and once per block converts them into engine
//! configuration, selects a shaping variant, and transforms the host's
//! buffers in place.
//!
//! ## Design Goals
//!
//! - **Real-time safe**: the block path never locks, allocates, or panics
//! - **Lock-free parameter passing**: one atomic cell per parameter,
//!   single-writer/single-reader, torn reads impossible
//! - **Glitch-free under hostile input**: out-of-range automation clamps,
//!   invalid variant tags fall back, bad configuration keeps the last good
//!   engine state running
//! - **`no_std` compatible**: core processing runs without the standard
//!   library (persistence and the control surface are `std` features)
//!
//! ## Quick Start
//!
//! ```rust
//! use foldkit::{AudioBlock, BlockProcessor, FoldingProcessor};
//!
//! let mut processor = FoldingProcessor::new();
//! processor.prepare(48000.0, 512);
//!
//! // Control thread: write through the shared store
//! processor.store().set("drive", 12.0);
//!
//! // Audio thread: borrow the host buffers and transform in place
//! let mut left = [0.1f32; 512];
//! let mut right = [0.1f32; 512];
//! let mut channels: [&mut [f32]; 2] = [&mut left, &mut right];
//! let mut block = AudioBlock::new(&mut channels, 2);
//! processor.process(&mut block);
//! ```
//!
//! ## Threads
//!
//! Two contexts share a processor: the control context (UI gestures, host
//! automation, state load) writes parameters, and the audio context reads a
//! snapshot once per block. They meet only at the store's atomic slots —
//! the engines, and everything else with mutable state, belong to the audio
//! context alone.

// Enable no_std when std feature is disabled
#![cfg_attr(not(feature = "std"), no_std)]

pub mod param;
pub mod processor;
pub mod smoother;
pub mod store;
pub mod tube;
pub mod variant;
pub mod wavefolder;

#[cfg(feature = "std")]
pub mod control;
#[cfg(feature = "state")]
pub mod state;

// Re-export main types at crate root
pub use param::{ParamDescriptor, ParamSchema, ParamScale, ParamUnit};
pub use processor::{AudioBlock, BlockProcessor, ChannelLayout, LayoutRules};
pub use smoother::SmoothedParam;
pub use store::{AtomicF32, ParamStore};
pub use tube::{SaturationProcessor, TubeStage};
pub use variant::{select, FoldVariant};
pub use wavefolder::{FoldingProcessor, Wavefolder};

#[cfg(feature = "std")]
pub use control::{ControlSurface, SurfaceStyle};
#[cfg(feature = "state")]
pub use state::{load, save, StateError, STATE_VERSION};

// Re-export utility functions
pub use param::{db_to_linear, linear_to_db};
