use crate::error::PlayerError;
use crate::player::MediaPlayer;
use crate::schedule::{Minute, ScheduledSlot};
use crate::tracker::SlotTracker;
use tracing::{info, warn};

/// What happened when a slot was fired.
#[derive(Debug)]
pub enum FireOutcome {
    /// Removed and handed to the player.
    Played(ScheduledSlot),
    /// Removed, but the player refused it. The slot is not retried.
    PlaybackFailed(ScheduledSlot, PlayerError),
    /// The slot was no longer live; nothing happened.
    NotScheduled,
}

/// Remove `slot`, start playback, then recompute the next projection.
///
/// The slot is consumed before the player is called, so a failing video is
/// never attempted twice.
pub fn fire(
    tracker: &mut SlotTracker,
    slot: &ScheduledSlot,
    player: &mut dyn MediaPlayer,
    now: Minute,
) -> FireOutcome {
    if !tracker.remove(slot) {
        warn!("{} at minute {} is not scheduled, skipping", slot.item.name, slot.minute.value());
        return FireOutcome::NotScheduled;
    }

    info!("Playing {} at {}:00", slot.item.name, slot.minute.value());
    let result = player.play(&slot.item);
    tracker.refresh_next(Some(now));

    match result {
        Ok(()) => FireOutcome::Played(slot.clone()),
        Err(e) => {
            warn!("Playback of {} failed: {}", slot.item.name, e);
            FireOutcome::PlaybackFailed(slot.clone(), e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaItem;
    use crate::schedule::{build, ScriptedMinutes};
    use std::path::PathBuf;

    #[derive(Default)]
    struct Recorder {
        played: Vec<String>,
        fail: bool,
    }

    impl MediaPlayer for Recorder {
        fn play(&mut self, item: &MediaItem) -> Result<(), PlayerError> {
            self.played.push(item.name.clone());
            if self.fail {
                return Err(PlayerError::MissingMedia(PathBuf::from(&item.locator)));
            }
            Ok(())
        }
    }

    fn m(v: u8) -> Minute {
        Minute::new(v).unwrap()
    }

    fn tracker(minutes: &[u8], now: u8) -> SlotTracker {
        let items = ["A", "B", "C"][..minutes.len()]
            .iter()
            .map(|n| MediaItem::new(*n, format!("{}.mp4", n)))
            .collect();
        let mut t = SlotTracker::new();
        t.replace(build(items, &mut ScriptedMinutes::new(minutes), 1), Some(m(now)));
        t
    }

    #[test]
    fn fire_removes_plays_and_refreshes_next() {
        let mut t = tracker(&[5, 40], 0);
        assert_eq!(t.next().unwrap().name, "A");
        let slot = t.due_slot(m(5)).unwrap();
        let mut player = Recorder::default();

        let outcome = fire(&mut t, &slot, &mut player, m(5));
        assert!(matches!(outcome, FireOutcome::Played(ref s) if s.item.name == "A"));
        assert_eq!(player.played, vec!["A"]);
        assert!(t.due_slot(m(5)).is_none());
        assert_eq!(t.next().unwrap().name, "B");
    }

    #[test]
    fn firing_twice_plays_once() {
        let mut t = tracker(&[5], 0);
        let slot = t.due_slot(m(5)).unwrap();
        let mut player = Recorder::default();

        fire(&mut t, &slot, &mut player, m(5));
        let second = fire(&mut t, &slot, &mut player, m(5));
        assert!(matches!(second, FireOutcome::NotScheduled));
        assert_eq!(player.played.len(), 1);
    }

    #[test]
    fn failed_playback_still_consumes_slot() {
        let mut t = tracker(&[5, 50], 0);
        let slot = t.due_slot(m(5)).unwrap();
        let mut player = Recorder {
            fail: true,
            ..Default::default()
        };

        let outcome = fire(&mut t, &slot, &mut player, m(5));
        assert!(matches!(outcome, FireOutcome::PlaybackFailed(_, PlayerError::MissingMedia(_))));
        assert_eq!(t.schedule().len(), 1);
        assert_eq!(t.next().unwrap().name, "B");
    }

    #[test]
    fn fire_matches_by_slot_not_by_minute() {
        let mut t = tracker(&[5, 5], 0);
        let b = t.schedule().slots()[1].clone();
        let mut player = Recorder::default();

        fire(&mut t, &b, &mut player, m(6));
        assert_eq!(player.played, vec!["B"]);
        assert_eq!(t.due_slot(m(5)).unwrap().item.name, "A");
    }
}
