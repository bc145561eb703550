use crate::media::MediaItem;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Minutes in an hour; every slot minute is below this.
pub const MINUTES_PER_HOUR: u8 = 60;

/// A minute of the hour, always in `0..60`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Minute(u8);

impl Minute {
    pub fn new(value: u8) -> Option<Self> {
        (value < MINUTES_PER_HOUR).then_some(Minute(value))
    }

    /// Reduce any value into range.
    pub fn wrapping(value: u8) -> Self {
        Minute(value % MINUTES_PER_HOUR)
    }

    pub fn of(time: NaiveTime) -> Self {
        Minute(time.minute() as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Minute {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Minute::new(value).ok_or_else(|| format!("minute {} is outside 0..60", value))
    }
}

impl From<Minute> for u8 {
    fn from(m: Minute) -> u8 {
        m.0
    }
}

impl fmt::Display for Minute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{:02}", self.0)
    }
}

/// One video waiting for its minute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledSlot {
    pub item: MediaItem,
    pub minute: Minute,
}

/// Randomness used while building a schedule.
pub trait MinuteSource: Send {
    /// Reorder items before minutes are assigned.
    fn shuffle(&mut self, items: &mut [MediaItem]);
    /// Draw the next minute.
    fn draw(&mut self) -> Minute;
}

/// Uniform random minutes from fastrand.
#[derive(Debug, Clone)]
pub struct RandomMinutes {
    rng: fastrand::Rng,
}

impl RandomMinutes {
    pub fn new() -> Self {
        RandomMinutes {
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        RandomMinutes {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Default for RandomMinutes {
    fn default() -> Self {
        Self::new()
    }
}

impl MinuteSource for RandomMinutes {
    fn shuffle(&mut self, items: &mut [MediaItem]) {
        self.rng.shuffle(items);
    }

    fn draw(&mut self) -> Minute {
        Minute(self.rng.u8(..MINUTES_PER_HOUR))
    }
}

/// Hands out a fixed sequence of minutes (cycling) and keeps input order.
#[derive(Debug, Clone)]
pub struct ScriptedMinutes {
    minutes: Vec<Minute>,
    cursor: usize,
}

impl ScriptedMinutes {
    pub fn new(values: &[u8]) -> Self {
        ScriptedMinutes {
            minutes: values.iter().map(|&v| Minute::wrapping(v)).collect(),
            cursor: 0,
        }
    }
}

impl MinuteSource for ScriptedMinutes {
    fn shuffle(&mut self, _items: &mut [MediaItem]) {}

    fn draw(&mut self) -> Minute {
        if self.minutes.is_empty() {
            return Minute(0);
        }
        let m = self.minutes[self.cursor % self.minutes.len()];
        self.cursor += 1;
        m
    }
}

/// The live set of slots for one build. Only ever shrinks; a reload replaces it.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    slots: Vec<ScheduledSlot>,
    generation: u64,
}

impl Schedule {
    pub fn empty(generation: u64) -> Self {
        Schedule {
            slots: Vec::new(),
            generation,
        }
    }

    pub fn slots(&self) -> &[ScheduledSlot] {
        &self.slots
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// First slot, in schedule order, assigned exactly to `minute`.
    pub fn first_at(&self, minute: Minute) -> Option<&ScheduledSlot> {
        self.slots.iter().find(|s| s.minute == minute)
    }

    /// First slot, in schedule order, at `minute` or later in the same hour.
    pub fn first_from(&self, minute: Minute) -> Option<&ScheduledSlot> {
        self.slots.iter().find(|s| s.minute >= minute)
    }

    /// Remove one slot equal to `slot`. Returns it if it was present.
    pub fn remove(&mut self, slot: &ScheduledSlot) -> Option<ScheduledSlot> {
        let pos = self.slots.iter().position(|s| s == slot)?;
        Some(self.slots.remove(pos))
    }

    /// Slots sorted by minute, stable for equal minutes.
    pub fn by_minute(&self) -> Vec<&ScheduledSlot> {
        let mut sorted: Vec<&ScheduledSlot> = self.slots.iter().collect();
        sorted.sort_by_key(|s| s.minute);
        sorted
    }
}

/// Give every item its own random minute. Collisions are allowed.
pub fn build(mut items: Vec<MediaItem>, source: &mut dyn MinuteSource, generation: u64) -> Schedule {
    source.shuffle(&mut items);
    let slots = items
        .into_iter()
        .map(|item| {
            let minute = source.draw();
            info!("Scheduled {} at minute {}", item.name, minute.value());
            ScheduledSlot { item, minute }
        })
        .collect();
    Schedule { slots, generation }
}
