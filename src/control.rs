//! Control-surface collaborator: subscriptions, edits, display formatting.
//!
//! A GUI (or any other controller) talks to a processor through two narrow
//! interfaces: it writes user gestures with [`ControlSurface::push_edit`] and
//! keeps its widgets fresh by subscribing per-parameter callbacks. Everything
//! runs on the control thread; the only thing shared with the audio thread is
//! the lock-free store underneath.
//!
//! Host automation bypasses this type entirely (it writes straight to the
//! store), so widget refresh for automated changes is pull-based: the GUI's
//! timer calls [`ControlSurface::sync`], which compares the store against the
//! last values it reported and fires callbacks for anything that moved.
//!
//! Styling is an explicit value handed to the constructor — there is no
//! process-wide look-and-feel global to mutate.

use std::sync::{Arc, Mutex};

use crate::param::ParamUnit;
use crate::store::ParamStore;

/// Display configuration for a control surface.
#[derive(Debug, Clone)]
pub struct SurfaceStyle {
    /// Decimal places in formatted values.
    pub precision: usize,
    /// Append unit suffixes ("dB", "%", "ms") to formatted values.
    pub show_units: bool,
}

impl Default for SurfaceStyle {
    fn default() -> Self {
        Self {
            precision: 1,
            show_units: true,
        }
    }
}

type ChangeCallback = Box<dyn Fn(f32) + Send>;

/// Per-slot subscriber lists plus the last values reported to them.
struct SurfaceInner {
    subscribers: Vec<Vec<ChangeCallback>>,
    last_seen: Vec<f32>,
}

/// Widget-toolkit-agnostic control surface over one processor's parameters.
///
/// Holds a non-owning handle to the store — never a copy of the values.
/// All methods lock a registry `Mutex`; callbacks are invoked with that lock
/// held, so they must not call back into the surface.
pub struct ControlSurface {
    store: Arc<ParamStore>,
    style: SurfaceStyle,
    inner: Mutex<SurfaceInner>,
}

impl ControlSurface {
    /// Creates a surface over a shared store.
    pub fn new(store: Arc<ParamStore>, style: SurfaceStyle) -> Self {
        let len = store.schema().len();
        let mut last_seen = vec![0.0; len];
        store.snapshot_into(&mut last_seen);
        let subscribers = (0..len).map(|_| Vec::new()).collect();
        Self {
            store,
            style,
            inner: Mutex::new(SurfaceInner {
                subscribers,
                last_seen,
            }),
        }
    }

    /// The store this surface edits and observes.
    pub fn store(&self) -> &Arc<ParamStore> {
        &self.store
    }

    /// The style this surface was constructed with.
    pub fn style(&self) -> &SurfaceStyle {
        &self.style
    }

    /// Registers a change callback for one parameter.
    ///
    /// The callback fires immediately with the current value (so a fresh
    /// widget paints correctly), then again on every reported change.
    /// Returns `false` for an unknown id.
    pub fn subscribe(&self, id: &str, callback: impl Fn(f32) + Send + 'static) -> bool {
        let Some(index) = self.store.schema().index_of(id) else {
            return false;
        };
        let mut inner = self.inner.lock().expect("control surface lock poisoned");
        callback(self.store.get_index(index));
        inner.subscribers[index].push(Box::new(callback));
        true
    }

    /// Originates a user gesture: writes a raw value and notifies this
    /// parameter's subscribers with the constrained result.
    pub fn push_edit(&self, id: &str, raw: f32) -> bool {
        let Some(index) = self.store.schema().index_of(id) else {
            return false;
        };
        self.store.set_index(index, raw);
        self.notify(index);
        true
    }

    /// Originates a user gesture in normalized `[0, 1]` units.
    pub fn push_edit_normalized(&self, id: &str, normalized: f32) -> bool {
        if !self.store.set_normalized(id, normalized) {
            return false;
        }
        // set_normalized succeeded, so the id resolves
        if let Some(index) = self.store.schema().index_of(id) {
            self.notify(index);
        }
        true
    }

    /// Reports store changes made behind the surface's back.
    ///
    /// Call periodically from the GUI timer: any parameter whose value
    /// differs from the last one reported (host automation, state load,
    /// reset) has its subscribers fired.
    pub fn sync(&self) {
        let mut inner = self.inner.lock().expect("control surface lock poisoned");
        for index in 0..inner.last_seen.len() {
            let current = self.store.get_index(index);
            if current != inner.last_seen[index] {
                inner.last_seen[index] = current;
                for callback in &inner.subscribers[index] {
                    callback(current);
                }
            }
        }
    }

    /// Formats a parameter's current value per the surface style.
    ///
    /// Toggles render as On/Off, choices as their integer tag; variant labels
    /// are the owning processor's business.
    pub fn format_value(&self, id: &str) -> Option<String> {
        let desc = self.store.descriptor(id)?;
        let value = self.store.get(id)?;
        let text = match desc.unit {
            ParamUnit::Toggle => {
                if value >= 0.5 {
                    String::from("On")
                } else {
                    String::from("Off")
                }
            }
            ParamUnit::Choice => format!("{}", value as i32),
            unit => {
                let suffix = unit.suffix();
                if self.style.show_units && !suffix.is_empty() {
                    format!("{:.*} {}", self.style.precision, value, suffix)
                } else {
                    format!("{:.*}", self.style.precision, value)
                }
            }
        };
        Some(text)
    }

    /// Fires one slot's subscribers with its current value.
    fn notify(&self, index: usize) {
        let mut inner = self.inner.lock().expect("control surface lock poisoned");
        let current = self.store.get_index(index);
        inner.last_seen[index] = current;
        for callback in &inner.subscribers[index] {
            callback(current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wavefolder::{folding_schema, ids};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn surface() -> ControlSurface {
        let store = Arc::new(ParamStore::new(folding_schema()));
        ControlSurface::new(store, SurfaceStyle::default())
    }

    /// Latches the last value a callback saw, bit-cast for atomic storage.
    fn latch() -> (Arc<AtomicU32>, impl Fn(f32) + Send + 'static) {
        let cell = Arc::new(AtomicU32::new(f32::NAN.to_bits()));
        let writer = Arc::clone(&cell);
        (cell, move |v: f32| {
            writer.store(v.to_bits(), Ordering::Relaxed)
        })
    }

    fn read(cell: &AtomicU32) -> f32 {
        f32::from_bits(cell.load(Ordering::Relaxed))
    }

    #[test]
    fn subscribe_fires_immediately_with_current_value() {
        let s = surface();
        s.store().set(ids::DRIVE, 6.0);
        let (seen, cb) = latch();
        assert!(s.subscribe(ids::DRIVE, cb));
        assert_eq!(read(&seen), 6.0);
    }

    #[test]
    fn push_edit_notifies_with_constrained_value() {
        let s = surface();
        let (seen, cb) = latch();
        s.subscribe(ids::DRIVE, cb);
        s.push_edit(ids::DRIVE, 999.0);
        assert_eq!(read(&seen), 60.0);
        assert_eq!(s.store().get(ids::DRIVE), Some(60.0));
    }

    #[test]
    fn sync_reports_automation_writes_once() {
        let s = surface();
        let (seen, cb) = latch();
        s.subscribe(ids::MIX, cb);

        // Automation writes straight to the store
        s.store().set(ids::MIX, 40.0);
        s.sync();
        assert_eq!(read(&seen), 40.0);

        // A second sync with no change stays quiet
        let (quiet, cb2) = latch();
        s.subscribe(ids::DRIVE, cb2);
        let before = read(&quiet);
        s.sync();
        assert_eq!(read(&quiet), before);
    }

    #[test]
    fn normalized_edits_land_denormalized() {
        let s = surface();
        s.push_edit_normalized(ids::DRIVE, 1.0);
        assert_eq!(s.store().get(ids::DRIVE), Some(60.0));
        s.push_edit_normalized(ids::DRIVE, 0.0);
        assert_eq!(s.store().get(ids::DRIVE), Some(-30.0));
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let s = surface();
        assert!(!s.subscribe("ghost", |_| {}));
        assert!(!s.push_edit("ghost", 1.0));
        assert!(s.format_value("ghost").is_none());
    }

    #[test]
    fn formatting_follows_style_and_unit() {
        let s = surface();
        s.store().set(ids::DRIVE, 6.0);
        assert_eq!(s.format_value(ids::DRIVE).unwrap(), "6.0 dB");
        s.store().set(ids::MIX, 42.5);
        assert_eq!(s.format_value(ids::MIX).unwrap(), "42.5 %");
        s.store().set(ids::VARIANT, 2.0);
        assert_eq!(s.format_value(ids::VARIANT).unwrap(), "2");
    }

    #[test]
    fn formatting_without_units() {
        let store = Arc::new(ParamStore::new(folding_schema()));
        let style = SurfaceStyle {
            precision: 2,
            show_units: false,
        };
        let s = ControlSurface::new(store, style);
        s.store().set(ids::DRIVE, 6.0);
        assert_eq!(s.format_value(ids::DRIVE).unwrap(), "6.00");
    }
}
