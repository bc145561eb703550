//! AppCore — the single scheduling context behind every operation.
//!
//! Owns the catalog, player, clock, randomness and the live slot tracker. The
//! poll loop, the CLI and the tests all drive scheduling through these methods.
//! It is not shared: the runtime moves it onto its own thread.

use crate::clock::{self, Clock, SystemClock};
use crate::config::Config;
use crate::error::{CatalogError, ClockError, PlayerError};
use crate::media::{FolderCatalog, MediaCatalog};
use crate::player::{ExternalPlayer, MediaPlayer, PlayerEvent};
use crate::schedule::{self, Minute, MinuteSource, RandomMinutes, Schedule, ScheduledSlot};
use crate::tracker::{NextUp, SlotTracker};
use crate::trigger::{self, FireOutcome};
use serde::Serialize;
use tracing::{debug, info, warn};

// ── Results ─────────────────────────────────────────────────────────────────

/// Result of one schedule check.
#[derive(Debug)]
pub enum CheckResult {
    Played(ScheduledSlot),
    PlaybackFailed(ScheduledSlot, PlayerError),
    NothingDue(Minute),
    /// This wall-clock minute was already evaluated.
    AlreadyChecked(Minute),
    ClockUnavailable(ClockError),
}

/// Result of a reload. A catalog failure still replaces the schedule (with nothing).
#[derive(Debug)]
pub struct ReloadReport {
    pub generation: u64,
    pub scheduled: usize,
    pub catalog_error: Option<CatalogError>,
}

impl ReloadReport {
    pub fn is_empty(&self) -> bool {
        self.scheduled == 0
    }
}

/// What the operator display shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub current_time: Option<String>,
    pub next: Option<NextUp>,
    pub scheduled_time: Option<String>,
    pub remaining: usize,
    pub generation: u64,
}

impl StatusSnapshot {
    /// Human-readable status block.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Current Time: {}",
            self.current_time.as_deref().unwrap_or("--:--:--")
        )];
        match &self.next {
            Some(next) => {
                lines.push(format!("Next Video: {}", next.name));
                lines.push(format!(
                    "Scheduled Time: {}",
                    self.scheduled_time.as_deref().unwrap_or("--:--")
                ));
            }
            None => lines.push("No upcoming videos.".to_string()),
        }
        lines
    }
}

// ── Core ────────────────────────────────────────────────────────────────────

pub struct AppCore {
    catalog: Box<dyn MediaCatalog>,
    player: Box<dyn MediaPlayer>,
    clock: Box<dyn Clock>,
    minutes: Box<dyn MinuteSource>,
    tracker: SlotTracker,
    generation: u64,
}

impl AppCore {
    /// Assemble a core from its collaborators. The schedule starts empty
    /// until the first `reload`.
    pub fn new(
        catalog: Box<dyn MediaCatalog>,
        player: Box<dyn MediaPlayer>,
        clock: Box<dyn Clock>,
        minutes: Box<dyn MinuteSource>,
    ) -> Self {
        AppCore {
            catalog,
            player,
            clock,
            minutes,
            tracker: SlotTracker::new(),
            generation: 0,
        }
    }

    /// Production wiring: folder catalog, external player, system clock.
    pub fn from_config<F>(config: &Config, on_player_event: F) -> Self
    where
        F: Fn(PlayerEvent) + Send + Sync + 'static,
    {
        let catalog = FolderCatalog::new(&config.media_folder, &config.extensions);
        let player = ExternalPlayer::new(
            config.player_command.clone(),
            config.player_args.clone(),
            config.background_audio_path(),
            on_player_event,
        );
        Self::new(
            Box::new(catalog),
            Box::new(player),
            Box::new(SystemClock),
            Box::new(RandomMinutes::new()),
        )
    }

    /// Swap in a different player, e.g. for dry runs.
    pub fn with_player(mut self, player: Box<dyn MediaPlayer>) -> Self {
        self.player = player;
        self
    }

    pub fn tracker(&self) -> &SlotTracker {
        &self.tracker
    }

    pub fn schedule(&self) -> &Schedule {
        self.tracker.schedule()
    }

    pub fn next(&self) -> Option<&NextUp> {
        self.tracker.next()
    }

    fn now_minute(&self) -> Option<Minute> {
        self.clock.now().ok().map(Minute::of)
    }

    /// Discard the schedule and build a fresh one from the catalog.
    pub fn reload(&mut self) -> ReloadReport {
        self.generation += 1;
        let (items, catalog_error) = match self.catalog.load() {
            Ok(items) => (items, None),
            Err(e) => (Vec::new(), Some(e)),
        };

        match &catalog_error {
            Some(e) => warn!("No videos found: {}", e),
            None if items.is_empty() => warn!("No videos found in catalog"),
            None => {}
        }

        let schedule = schedule::build(items, self.minutes.as_mut(), self.generation);
        let scheduled = schedule.len();
        let now = self.now_minute();
        self.tracker.replace(schedule, now);
        info!("Schedule #{} holds {} video(s)", self.generation, scheduled);

        ReloadReport {
            generation: self.generation,
            scheduled,
            catalog_error,
        }
    }

    /// Fire the slot due at the current minute, if any.
    pub fn check(&mut self) -> CheckResult {
        let now = match self.clock.now() {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping schedule check: {}", e);
                return CheckResult::ClockUnavailable(e);
            }
        };
        let minute = Minute::of(now);
        debug!("Checking schedule at minute {}", minute.value());

        if !self.tracker.begin_check(now) {
            debug!("Minute {} already checked", minute.value());
            return CheckResult::AlreadyChecked(minute);
        }

        let Some(slot) = self.tracker.due_slot(minute) else {
            debug!("No video scheduled for this minute.");
            return CheckResult::NothingDue(minute);
        };

        match trigger::fire(&mut self.tracker, &slot, self.player.as_mut(), minute) {
            FireOutcome::Played(slot) => CheckResult::Played(slot),
            FireOutcome::PlaybackFailed(slot, e) => CheckResult::PlaybackFailed(slot, e),
            // due_slot just returned it from the same tracker
            FireOutcome::NotScheduled => CheckResult::NothingDue(minute),
        }
    }

    /// Current time as HH:MM:SS.
    pub fn display_time(&self) -> Result<String, ClockError> {
        self.clock.now().map(clock::display_time)
    }

    pub fn status(&self) -> StatusSnapshot {
        let now = self.clock.now().ok();
        let next = self.tracker.next().cloned();
        let scheduled_time = match (&next, now) {
            (Some(n), Some(t)) => Some(n.scheduled_time_display(t)),
            _ => None,
        };
        StatusSnapshot {
            current_time: now.map(clock::display_time),
            next,
            scheduled_time,
            remaining: self.tracker.schedule().len(),
            generation: self.tracker.generation(),
        }
    }
}
