use crate::error::ClockError;
use chrono::{Local, NaiveTime, Timelike};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Source of local wall-clock time.
pub trait Clock: Send {
    fn now(&self) -> Result<NaiveTime, ClockError>;
}

/// Local system time via chrono.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<NaiveTime, ClockError> {
        Ok(Local::now().time())
    }
}

/// A clock that only moves when told to. Clones share the same time.
///
/// `None` models a clock that cannot be read.
#[derive(Debug, Clone)]
pub struct ManualClock {
    time: Arc<Mutex<Option<NaiveTime>>>,
}

impl ManualClock {
    pub fn new(time: NaiveTime) -> Self {
        ManualClock {
            time: Arc::new(Mutex::new(Some(time))),
        }
    }

    /// Convenience constructor for `HH:MM:00`.
    pub fn at(hour: u32, minute: u32) -> Self {
        Self::new(NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN))
    }

    fn slot(&self) -> MutexGuard<'_, Option<NaiveTime>> {
        self.time.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, time: NaiveTime) {
        *self.slot() = Some(time);
    }

    pub fn set_hm(&self, hour: u32, minute: u32) {
        if let Some(t) = NaiveTime::from_hms_opt(hour, minute, 0) {
            self.set(t);
        }
    }

    /// Move forward, wrapping past midnight.
    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.slot();
        if let Some(t) = guard.as_mut() {
            *t = t.overflowing_add_signed(by).0;
        }
    }

    /// Make subsequent reads fail.
    pub fn break_clock(&self) {
        *self.slot() = None;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Result<NaiveTime, ClockError> {
        self.slot()
            .ok_or_else(|| ClockError("manual clock has no time set".to_string()))
    }
}

/// Format as HH:MM:SS for the operator display.
pub fn display_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

/// Identifies one wall-clock minute within the day (hour * 60 + minute).
pub fn minute_stamp(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_survives_a_panicking_holder() {
        let clock = ManualClock::at(8, 30);
        let shared = clock.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.time.lock().unwrap();
            panic!("poison the clock");
        })
        .join();

        assert!(clock.time.is_poisoned());
        assert_eq!(clock.now().unwrap(), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        clock.set_hm(8, 31);
        assert_eq!(clock.now().unwrap().minute(), 31);
    }

    #[test]
    fn display_time_is_zero_padded() {
        let t = NaiveTime::from_hms_opt(7, 5, 9).unwrap();
        assert_eq!(display_time(t), "07:05:09");
    }

    #[test]
    fn minute_stamp_distinguishes_hours() {
        let a = NaiveTime::from_hms_opt(10, 5, 0).unwrap();
        let b = NaiveTime::from_hms_opt(11, 5, 0).unwrap();
        let c = NaiveTime::from_hms_opt(10, 5, 59).unwrap();
        assert_ne!(minute_stamp(a), minute_stamp(b));
        assert_eq!(minute_stamp(a), minute_stamp(c));
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::at(9, 0);
        let other = clock.clone();
        clock.advance(chrono::Duration::minutes(61));
        assert_eq!(other.now().unwrap(), NaiveTime::from_hms_opt(10, 1, 0).unwrap());
    }

    #[test]
    fn manual_clock_wraps_at_midnight() {
        let clock = ManualClock::at(23, 59);
        clock.advance(chrono::Duration::minutes(2));
        assert_eq!(clock.now().unwrap(), NaiveTime::from_hms_opt(0, 1, 0).unwrap());
    }

    #[test]
    fn broken_clock_reports_error() {
        let clock = ManualClock::at(12, 0);
        clock.break_clock();
        assert!(clock.now().is_err());
        clock.set_hm(12, 30);
        assert!(clock.now().is_ok());
    }

    #[test]
    fn system_clock_reads() {
        assert!(SystemClock.now().is_ok());
    }
}
