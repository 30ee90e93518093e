//! Lock-free live parameter storage.
//!
//! One atomic slot per schema entry. The control thread (UI gestures, host
//! automation) writes; the audio thread reads once per block. Neither side
//! blocks, allocates, or waits on the other:
//!
//! - Writes go through [`ParamStore::set`], which constrains the value to the
//!   descriptor's range and commits it with a single atomic store.
//! - Reads are single atomic loads — a torn (partially written) value is never
//!   observable because the f32 travels as one `u32` bit pattern.
//! - [`ParamStore::snapshot_into`] fills a caller-owned slice, so the per-block
//!   read path touches no allocator.
//!
//! Each slot is single-writer/single-reader, synchronized independently with
//! `Relaxed` ordering. Writes to the *same* slot are never reordered against
//! each other; no ordering is promised *between* slots within a block, which
//! mirrors the block-granularity automation contract.
//!
//! The store is shared by `Arc`: the processor that built it keeps one handle
//! for the audio thread, the control surface holds a non-owning clone.

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, vec::Vec};

use core::sync::atomic::{AtomicU32, Ordering};

use crate::param::{ParamDescriptor, ParamSchema};

/// An `f32` cell readable and writable from different threads without locks.
///
/// The value is bit-cast to `u32` and stored in an [`AtomicU32`], so every
/// read observes a value that was written whole.
#[derive(Debug)]
pub struct AtomicF32 {
    bits: AtomicU32,
}

impl AtomicF32 {
    /// Creates a cell holding `value`.
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    /// Commits a new value with a single atomic store.
    #[inline]
    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Reads the most recently committed value.
    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Live value holder for one processor's parameters.
///
/// Owns one [`AtomicF32`] slot per descriptor, indexed in schema order.
/// Control-path accessors take string ids; the audio path uses slot indices
/// resolved once at processor construction.
#[derive(Debug)]
pub struct ParamStore {
    schema: ParamSchema,
    slots: Box<[AtomicF32]>,
}

impl ParamStore {
    /// Creates a store with every slot at its descriptor default.
    pub fn new(schema: ParamSchema) -> Self {
        let slots: Vec<AtomicF32> = schema
            .descriptors()
            .iter()
            .map(|d| AtomicF32::new(d.default))
            .collect();
        Self {
            schema,
            slots: slots.into_boxed_slice(),
        }
    }

    /// The schema this store was built from.
    pub fn schema(&self) -> &ParamSchema {
        &self.schema
    }

    /// Writes a raw value, constrained to the descriptor's valid set.
    ///
    /// Control-thread entry point for user gestures and host automation.
    /// Out-of-range input is silently constrained, never rejected — the store
    /// must stay glitch-free under adversarial automation. Returns `false`
    /// only when the id is unknown.
    pub fn set(&self, id: &str, raw: f32) -> bool {
        match self.schema.index_of(id) {
            Some(index) => {
                self.set_index(index, raw);
                true
            }
            None => false,
        }
    }

    /// Writes by slot index. See [`set`](Self::set).
    #[inline]
    pub fn set_index(&self, index: usize, raw: f32) {
        if let (Some(slot), Some(desc)) = (self.slots.get(index), self.schema.get(index)) {
            slot.set(desc.constrain(raw));
        }
    }

    /// Reads the current value for an id, `None` when unknown.
    pub fn get(&self, id: &str) -> Option<f32> {
        self.schema.index_of(id).map(|i| self.get_index(i))
    }

    /// Reads by slot index. Out-of-bounds reads return 0.0 rather than
    /// panicking — the audio thread must never unwind.
    #[inline]
    pub fn get_index(&self, index: usize) -> f32 {
        match self.slots.get(index) {
            Some(slot) => slot.get(),
            None => 0.0,
        }
    }

    /// Fills `out` with the current value of every slot, in schema order.
    ///
    /// The audio thread calls this once per block with a slice it allocated
    /// at construction time. Each slot read is atomic and torn-free; the set
    /// as a whole is only block-coherent (a write landing mid-snapshot shows
    /// up in this block for some parameters and the next block for others).
    #[inline]
    pub fn snapshot_into(&self, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.slots.len(), "snapshot slice mismatch");
        for (value, slot) in out.iter_mut().zip(self.slots.iter()) {
            *value = slot.get();
        }
    }

    /// Writes a normalized `[0, 1]` value through the descriptor's curve.
    ///
    /// Host automation entry point. The normalized input is clamped to
    /// `[0, 1]` before denormalization.
    pub fn set_normalized(&self, id: &str, normalized: f32) -> bool {
        match self.schema.find(id) {
            Some(desc) => {
                let n = if normalized.is_finite() {
                    normalized.clamp(0.0, 1.0)
                } else {
                    desc.normalize(desc.default)
                };
                self.set(id, desc.denormalize(n))
            }
            None => false,
        }
    }

    /// Reads the current value mapped into `[0, 1]`, `None` when unknown.
    pub fn get_normalized(&self, id: &str) -> Option<f32> {
        let desc = self.schema.find(id)?;
        let index = self.schema.index_of(id)?;
        Some(desc.normalize(self.get_index(index)))
    }

    /// Resets every slot to its descriptor default. Control path only.
    pub fn reset_to_defaults(&self) {
        for (slot, desc) in self.slots.iter().zip(self.schema.descriptors()) {
            slot.set(desc.default);
        }
    }

    /// Descriptor for an id, when present.
    pub fn descriptor(&self, id: &str) -> Option<&ParamDescriptor> {
        self.schema.find(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamDescriptor;

    fn store() -> ParamStore {
        ParamStore::new(ParamSchema::new(vec![
            ParamDescriptor::gain_db("drive", "Drive (dB)", -30.0, 60.0, 0.0),
            ParamDescriptor::percent("mix", "Mix (%)", 100.0, 100.0),
            ParamDescriptor::choice("wavefolder", "Wavefolder Type", 3),
        ]))
    }

    #[test]
    fn starts_at_defaults() {
        let s = store();
        assert_eq!(s.get("drive"), Some(0.0));
        assert_eq!(s.get("mix"), Some(100.0));
        assert_eq!(s.get("wavefolder"), Some(0.0));
    }

    #[test]
    fn set_clamps_above_and_below_range() {
        let s = store();
        s.set("drive", 999.0);
        assert_eq!(s.get("drive"), Some(60.0));
        s.set("drive", -500.0);
        assert_eq!(s.get("drive"), Some(-30.0));
    }

    #[test]
    fn invalid_choice_tag_selects_default_variant() {
        let s = store();
        s.set("wavefolder", 7.0);
        assert_eq!(s.get("wavefolder"), Some(0.0));
        s.set("wavefolder", 2.0);
        assert_eq!(s.get("wavefolder"), Some(2.0));
    }

    #[test]
    fn unknown_id_is_reported_not_stored() {
        let s = store();
        assert!(!s.set("nope", 1.0));
        assert_eq!(s.get("nope"), None);
    }

    #[test]
    fn snapshot_reflects_schema_order() {
        let s = store();
        s.set("drive", 6.0);
        s.set("mix", 50.0);
        let mut snap = [0.0f32; 3];
        s.snapshot_into(&mut snap);
        assert_eq!(snap, [6.0, 50.0, 0.0]);
    }

    #[test]
    fn normalized_surface_roundtrips() {
        let s = store();
        for n in [0.0, 0.25, 0.5, 0.99, 1.0] {
            s.set_normalized("drive", n);
            let back = s.get_normalized("drive").unwrap();
            assert!(
                (n - back).abs() < 1e-5,
                "roundtrip failed: {} -> {}",
                n,
                back
            );
        }
    }

    #[test]
    fn normalized_input_is_clamped_to_unit_interval() {
        let s = store();
        s.set_normalized("drive", 4.2);
        assert_eq!(s.get("drive"), Some(60.0));
        s.set_normalized("drive", -1.0);
        assert_eq!(s.get("drive"), Some(-30.0));
    }

    #[test]
    fn reset_restores_defaults() {
        let s = store();
        s.set("drive", 20.0);
        s.set("mix", 10.0);
        s.reset_to_defaults();
        assert_eq!(s.get("drive"), Some(0.0));
        assert_eq!(s.get("mix"), Some(100.0));
    }

    #[test]
    fn concurrent_reads_never_tear() {
        use std::sync::Arc;

        // Two writers alternate between bit patterns that would be detectable
        // if a read could ever observe a mix of them.
        let s = Arc::new(store());
        let writer = {
            let s = Arc::clone(&s);
            std::thread::spawn(move || {
                for i in 0..100_000u32 {
                    let v = if i % 2 == 0 { -30.0 } else { 60.0 };
                    s.set("drive", v);
                }
            })
        };

        let index = s.schema().index_of("drive").unwrap();
        for _ in 0..100_000 {
            let v = s.get_index(index);
            assert!(
                v == -30.0 || v == 60.0 || v == 0.0,
                "torn or out-of-range read: {}",
                v
            );
        }
        writer.join().unwrap();
    }
}
