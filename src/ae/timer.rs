//! Timer storage for the reactor (spec.md §3 Timer, §4.1 timer dispatch).
//!
//! The teacher's timer list (`src/ae.rs::TimeEvent`) is an intrusive
//! `Arc<RwLock<TimeEvent>>` singly-linked list, grounded in the original's
//! pointer-chasing design. spec.md §9 Design Notes explicitly flags that a
//! strict-ownership port is better served by "an arena of timers keyed by
//! id" since that "simplifies safe deletion during iteration." This module
//! follows that guidance: timers live in a `HashMap` keyed by a storage
//! slot that never changes, while each `Timer`'s externally-visible `id`
//! field is free to become `-1` (spec.md's deletion marker) without
//! disturbing where it lives. `order` tracks insertion order
//! (head = index 0) for traversal.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use super::{EventFinalizerProc, EventLoop, TimeProc};

pub(crate) struct Timer {
    pub id: i64,
    pub deadline_sec: i64,
    pub deadline_ms: i64,
    pub proc: TimeProc,
    pub finalizer: Option<EventFinalizerProc>,
    pub userdata: Option<Rc<dyn Any>>,
    pub refcount: u32,
}

pub(crate) struct TimerList {
    timers: HashMap<u64, Timer>,
    order: Vec<u64>,
    next_slot: u64,
    next_id: i64,
}

impl TimerList {
    pub fn new() -> Self {
        TimerList { timers: HashMap::new(), order: Vec::new(), next_slot: 0, next_id: 0 }
    }

    pub fn next_id_ceiling(&self) -> i64 {
        self.next_id - 1
    }

    /// Inserts at the head of the list and returns the new timer's id.
    pub fn create(
        &mut self,
        deadline_sec: i64,
        deadline_ms: i64,
        proc: TimeProc,
        userdata: Option<Rc<dyn Any>>,
        finalizer: Option<EventFinalizerProc>,
    ) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        let slot = self.next_slot;
        self.next_slot += 1;
        self.timers.insert(
            slot,
            Timer { id, deadline_sec, deadline_ms, proc, finalizer, userdata, refcount: 0 },
        );
        self.order.insert(0, slot);
        id
    }

    fn slot_of(&self, id: i64) -> Option<u64> {
        self.timers.iter().find(|(_, t)| t.id == id).map(|(slot, _)| *slot)
    }

    /// Marks the timer deleted. If it isn't currently executing (refcount
    /// 0) it is unlinked immediately and handed back so the caller can run
    /// its finalizer now; otherwise it is left in place, `id = -1`, for the
    /// dispatch loop's final sweep to reap once the refcount drops.
    pub fn mark_deleted(&mut self, id: i64) -> Option<Option<Timer>> {
        let slot = self.slot_of(id)?;
        let timer = self.timers.get_mut(&slot).unwrap();
        timer.id = -1;
        if timer.refcount == 0 {
            self.order.retain(|s| *s != slot);
            Some(self.timers.remove(&slot))
        } else {
            Some(None)
        }
    }

    /// Earliest deadline among live (non-deleted) timers.
    pub fn nearest_deadline(&self) -> Option<(i64, i64)> {
        self.timers
            .values()
            .filter(|t| t.id != -1)
            .map(|t| (t.deadline_sec, t.deadline_ms))
            .min()
    }

    /// Clock moved backward: force every live timer to fire on the next
    /// dispatch pass (spec.md §4.1 "Clock-skew detection").
    pub fn force_all_due(&mut self) {
        for t in self.timers.values_mut() {
            if t.id != -1 {
                t.deadline_sec = 0;
                t.deadline_ms = 0;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Slots present at the moment this is called, head-first. Used as a
    /// stable work list for one dispatch pass: slots created afterward
    /// (by a firing timer's own callback) are simply absent from it.
    pub(super) fn snapshot_order(&self) -> Vec<u64> {
        self.order.clone()
    }

    pub(super) fn get(&self, slot: u64) -> Option<&Timer> {
        self.timers.get(&slot)
    }

    pub(super) fn bump_refcount(&mut self, slot: u64) {
        if let Some(t) = self.timers.get_mut(&slot) {
            t.refcount += 1;
        }
    }

    pub(super) fn release_refcount(&mut self, slot: u64) {
        if let Some(t) = self.timers.get_mut(&slot) {
            t.refcount = t.refcount.saturating_sub(1);
        }
    }

    pub(super) fn reschedule(&mut self, slot: u64, deadline_sec: i64, deadline_ms: i64) {
        if let Some(t) = self.timers.get_mut(&slot) {
            if t.id != -1 {
                t.deadline_sec = deadline_sec;
                t.deadline_ms = deadline_ms;
            }
        }
    }

    pub(super) fn delete_in_place(&mut self, slot: u64) {
        if let Some(t) = self.timers.get_mut(&slot) {
            t.id = -1;
        }
    }

    /// Final cleanup: every timer marked deleted with no outstanding
    /// reentrant call sweeps out of storage here. Returns the removed
    /// timers so the caller (which owns `&mut EventLoop`) can run their
    /// finalizers.
    pub(super) fn sweep(&mut self) -> Vec<Timer> {
        let dead: Vec<u64> = self
            .timers
            .iter()
            .filter(|(_, t)| t.id == -1 && t.refcount == 0)
            .map(|(slot, _)| *slot)
            .collect();
        let mut out = Vec::with_capacity(dead.len());
        for slot in dead {
            self.order.retain(|s| *s != slot);
            if let Some(t) = self.timers.remove(&slot) {
                out.push(t);
            }
        }
        out
    }
}

/// Runs every finalizer a `sweep()` turned up. Free function (not a
/// `TimerList` method) because it needs `&mut EventLoop` for the
/// finalizer's signature, and `TimerList` must not know about `EventLoop`.
pub(super) fn run_finalizers(el: &mut EventLoop, dead: Vec<Timer>) {
    for t in dead {
        if let Some(f) = t.finalizer {
            f(el, t.userdata);
        }
    }
}
