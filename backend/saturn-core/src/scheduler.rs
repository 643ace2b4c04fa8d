//! Priority-ordered event queue driving every component's timing (spec.md §3.1, §4.1).
//!
//! Modeled directly on the teacher's GBA scheduler (`gba-core::scheduler`): a small fixed-capacity
//! binary heap keyed by scaled absolute time, with `insert_or_update`/`remove`/`pop` primitives.
//! Two things are added that the GBA scheduler didn't need: per-event rate scaling
//! (`set_event_count_factor`, §4.1) so the CD block/SCSP/VDP can each advance in their own clock
//! domain, and a monotonic insertion sequence number so that two events landing on the same
//! timestamp fire in registration order (§4.1 ordering rule, §8 invariant 1, §8 SC-3).

use bincode::{Decode, Encode};
use sat_proc_macros::EnumAll;
use std::cmp::Ordering;

/// Every schedulable event kind in the core. New kinds are added here rather than through a
/// handler trait object, per §9's "avoidance of inheritance" note: dispatch is a single `match` in
/// the driver loop (`Saturn::run_scheduler_events`), not virtual dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, EnumAll)]
pub enum SchedulerEvent {
    VdpPhaseChange,
    Vdp1DrawStep,
    ScspSampleTick,
    ScspDspStep,
    ScuDspStep,
    CdDriveStep,
    CdSectorReady,
    SmpcCommandComplete,
    SmpcClockChangeLatch,
    /// Never scheduled; keeps the heap non-empty so `pop`/`peek` never need an `is_empty` check.
    Dummy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
struct HeapEntry {
    event: SchedulerEvent,
    time: u64,
    seq: u64,
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.time, self.seq).cmp(&(other.time, other.seq))
    }
}

#[derive(Debug, Clone, Copy, Encode, Decode)]
struct RateFactor {
    num: u32,
    den: u32,
}

impl Default for RateFactor {
    fn default() -> Self {
        Self { num: 1, den: 1 }
    }
}

const NUM_EVENTS: usize = SchedulerEvent::ALL.len();

#[derive(Debug, Clone, Encode, Decode)]
pub struct Scheduler {
    heap: Vec<HeapEntry>,
    scheduled: [bool; NUM_EVENTS],
    rate_factors: [RateFactor; NUM_EVENTS],
    now: u64,
    next_seq: u64,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        let mut heap = Vec::with_capacity(NUM_EVENTS);
        heap.push(HeapEntry { event: SchedulerEvent::Dummy, time: u64::MAX, seq: 0 });

        let mut scheduled = [false; NUM_EVENTS];
        scheduled[SchedulerEvent::Dummy as usize] = true;

        Self { heap, scheduled, rate_factors: [RateFactor::default(); NUM_EVENTS], now: 0, next_seq: 1 }
    }

    #[must_use]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Thereafter, every delay passed to `schedule_from_now`/`reschedule` for this event is
    /// multiplied by `num/den` before being added to the current time (§4.1).
    pub fn set_event_count_factor(&mut self, event: SchedulerEvent, num: u32, den: u32) {
        assert!(den > 0, "rate denominator must be nonzero");
        self.rate_factors[event as usize] = RateFactor { num, den };
    }

    fn scale(&self, event: SchedulerEvent, delta: u64) -> u64 {
        let RateFactor { num, den } = self.rate_factors[event as usize];
        delta * u64::from(num) / u64::from(den)
    }

    pub fn schedule_at(&mut self, event: SchedulerEvent, absolute_time: u64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.insert_or_update(event, absolute_time, seq);
    }

    pub fn schedule_from_now(&mut self, event: SchedulerEvent, delta: u64) {
        let scaled = self.scale(event, delta);
        self.schedule_at(event, self.now + scaled);
    }

    /// Equivalent to `schedule_from_now`; named separately to match the four scheduling entry
    /// points spec.md §4.1 lists.
    pub fn reschedule(&mut self, event: SchedulerEvent, new_delta: u64) {
        self.schedule_from_now(event, new_delta);
    }

    /// Schedules relative to the event's previously-fired time rather than `now`, so a handler
    /// that reschedules itself accumulates no drift relative to its own period. The invariant in
    /// §3.1 ("a rescheduled event always has a timestamp strictly greater than its firing time")
    /// holds as long as `delta` is nonzero.
    pub fn reschedule_from_previous(&mut self, event: SchedulerEvent, previous_time: u64, delta: u64) {
        let scaled = self.scale(event, delta);
        debug_assert!(scaled > 0, "rescheduled event must move strictly forward");
        self.schedule_at(event, previous_time + scaled);
    }

    pub fn remove(&mut self, event: SchedulerEvent) {
        if !self.scheduled[event as usize] {
            return;
        }
        self.scheduled[event as usize] = false;

        let len = self.heap.len();
        for i in 0..len {
            if self.heap[i].event == event {
                self.heap.swap(i, len - 1);
                self.heap.pop();
                if i < self.heap.len() {
                    self.heap_down(i);
                    self.heap_up(i);
                }
                return;
            }
        }
    }

    fn insert_or_update(&mut self, event: SchedulerEvent, time: u64, seq: u64) {
        if self.scheduled[event as usize] {
            for i in 0..self.heap.len() {
                if self.heap[i].event != event {
                    continue;
                }
                self.heap[i].time = time;
                self.heap[i].seq = seq;
                self.heap_down(i);
                self.heap_up(i);
                return;
            }
        }

        self.scheduled[event as usize] = true;
        self.heap.push(HeapEntry { event, time, seq });
        self.heap_up(self.heap.len() - 1);
    }

    /// Advances `now`; does not itself fire anything. Callers drain ready events with
    /// [`Self::pop_ready`] after calling this.
    pub fn tick(&mut self, master_cycles: u64) {
        self.now += master_cycles;
    }

    #[must_use]
    pub fn is_event_ready(&self) -> bool {
        self.heap[0].time <= self.now
    }

    /// Pops and returns the earliest event if its scheduled time has arrived, in FIFO order among
    /// ties (§4.1 ordering rule, §8 invariant 1).
    pub fn pop_ready(&mut self) -> Option<(SchedulerEvent, u64)> {
        if self.heap[0].time > self.now {
            return None;
        }

        let HeapEntry { event, time, .. } = self.heap[0];
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        self.heap.pop();
        self.heap_down(0);
        self.scheduled[event as usize] = false;

        Some((event, time))
    }

    /// Cycles remaining until the next scheduled event, used by CPU cores to size their
    /// instruction execution slice.
    #[must_use]
    pub fn cycles_until_next_event(&self) -> u64 {
        self.heap[0].time.saturating_sub(self.now)
    }

    fn heap_up(&mut self, mut i: usize) {
        while i != 0 {
            let parent = (i - 1) / 2;
            if self.heap[parent] <= self.heap[i] {
                return;
            }
            self.heap.swap(i, parent);
            i = parent;
        }
    }

    fn heap_down(&mut self, mut i: usize) {
        loop {
            let left = 2 * i + 1;
            if left >= self.heap.len() {
                return;
            }
            let right = left + 1;

            let smaller_child =
                if right < self.heap.len() && self.heap[right] < self.heap[left] { right } else { left };

            if self.heap[smaller_child] < self.heap[i] {
                self.heap.swap(i, smaller_child);
                i = smaller_child;
            } else {
                return;
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonicity_across_arbitrary_schedule_sequence() {
        let mut sched = Scheduler::new();
        sched.schedule_at(SchedulerEvent::VdpPhaseChange, 50);
        sched.schedule_at(SchedulerEvent::ScspSampleTick, 10);
        sched.schedule_at(SchedulerEvent::CdDriveStep, 30);
        sched.schedule_at(SchedulerEvent::ScuDspStep, 10);

        sched.tick(100);

        let mut last_time = 0;
        while let Some((_, time)) = sched.pop_ready() {
            assert!(time >= last_time, "events must fire in non-decreasing timestamp order");
            last_time = time;
        }
    }

    #[test]
    fn sc3_rate_scaling_and_registration_order_tie_break() {
        let mut sched = Scheduler::new();

        // A runs at the master rate; B runs at half the master rate, so every delta B passes in
        // its own clock units must be doubled to land on the master timeline (§4.1).
        sched.set_event_count_factor(SchedulerEvent::ScspSampleTick, 2, 1);

        // Both land on master time 10: A registered first, so it wins the tie (§4.1 ordering rule).
        sched.schedule_at(SchedulerEvent::VdpPhaseChange, 10);
        sched.schedule_from_now(SchedulerEvent::ScspSampleTick, 5);

        sched.tick(10);

        let first = sched.pop_ready().unwrap();
        let second = sched.pop_ready().unwrap();
        assert_eq!(first, (SchedulerEvent::VdpPhaseChange, 10));
        assert_eq!(second, (SchedulerEvent::ScspSampleTick, 10));

        // B reschedules itself by +5 of its own clock units -> +10 master ticks from its firing time.
        let b_fire_time = second.1;
        sched.reschedule_from_previous(SchedulerEvent::ScspSampleTick, b_fire_time, 5);

        sched.tick(9);
        assert!(sched.pop_ready().is_none(), "B should not be ready before absolute time 20");

        sched.tick(1);
        let (event, time) = sched.pop_ready().unwrap();
        assert_eq!(event, SchedulerEvent::ScspSampleTick);
        assert_eq!(time, 20);
    }

    #[test]
    fn remove_drops_a_pending_event() {
        let mut sched = Scheduler::new();
        sched.schedule_at(SchedulerEvent::CdSectorReady, 100);
        sched.remove(SchedulerEvent::CdSectorReady);
        sched.tick(1000);
        assert!(sched.pop_ready().is_none());
    }
}
