//! Live schedule state: which slot is due, which one is next.

use crate::clock::minute_stamp;
use crate::schedule::{Minute, Schedule, ScheduledSlot};
use chrono::{NaiveTime, Timelike};
use serde::Serialize;

/// The upcoming video as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextUp {
    pub name: String,
    pub minute: Minute,
}

impl NextUp {
    /// Scheduled time as HH:MM in the hour of `now`.
    pub fn scheduled_time_display(&self, now: NaiveTime) -> String {
        format!("{:02}:{:02}", now.hour(), self.minute.value())
    }
}

/// Owns the live schedule and the cached next projection.
///
/// Every mutation recomputes `next` from scratch.
#[derive(Debug, Default)]
pub struct SlotTracker {
    schedule: Schedule,
    next: Option<NextUp>,
    last_checked: Option<u32>,
}

impl SlotTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn generation(&self) -> u64 {
        self.schedule.generation()
    }

    /// Cached projection from the last mutation or refresh.
    pub fn next(&self) -> Option<&NextUp> {
        self.next.as_ref()
    }

    /// Discard the current schedule entirely and adopt `schedule`.
    pub fn replace(&mut self, schedule: Schedule, now: Option<Minute>) {
        self.schedule = schedule;
        self.last_checked = None;
        self.refresh_next(now);
    }

    /// First live slot whose minute is exactly `now`.
    pub fn due_slot(&self, now: Minute) -> Option<ScheduledSlot> {
        self.schedule.first_at(now).cloned()
    }

    /// First live slot at `now` or later this hour. Never wraps into the next hour.
    pub fn next_up(&self, now: Minute) -> Option<NextUp> {
        self.schedule.first_from(now).map(|slot| NextUp {
            name: slot.item.name.clone(),
            minute: slot.minute,
        })
    }

    /// Recompute the cached projection. An unknown time clears it.
    pub fn refresh_next(&mut self, now: Option<Minute>) {
        self.next = now.and_then(|m| self.next_up(m));
    }

    /// Remove exactly `slot`. False if it is no longer live.
    pub fn remove(&mut self, slot: &ScheduledSlot) -> bool {
        self.schedule.remove(slot).is_some()
    }

    /// Mark the wall-clock minute of `time` as evaluated.
    ///
    /// Returns false when that minute was already evaluated since the last reload.
    pub fn begin_check(&mut self, time: NaiveTime) -> bool {
        let stamp = minute_stamp(time);
        if self.last_checked == Some(stamp) {
            return false;
        }
        self.last_checked = Some(stamp);
        true
    }
}
