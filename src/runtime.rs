//! Scheduler runtime — dedicated thread that owns the `AppCore`.
//!
//! Every tick and operator command is a message to this thread, so schedule
//! reads and writes never overlap. External code talks to it through
//! `SchedulerHandle` (wraps `mpsc::Sender<SchedulerCmd>`). Cadences are driven
//! by `recv_timeout` against the nearest deadline.

use crate::app_core::{AppCore, CheckResult, ReloadReport, StatusSnapshot};
use crate::tracker::NextUp;
use std::io::{BufRead, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

// ── Commands & Events ────────────────────────────────────────────────────────

/// Commands sent to the scheduler thread.
pub enum SchedulerCmd {
    /// Run the schedule check now.
    ForceCheck,
    /// Rebuild the schedule from the catalog.
    Reload,
    /// Reply with the current operator display.
    Status(mpsc::Sender<StatusSnapshot>),
    Shutdown,
}

/// Events emitted by the scheduler thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Display tick: HH:MM:SS.
    Clock(String),
    /// The clock could not be read. Sent once per outage.
    ClockUnavailable(String),
    Reloaded { generation: u64, scheduled: usize },
    /// A reload produced nothing to schedule, with the catalog error if any.
    CatalogEmpty(Option<String>),
    Fired { name: String, minute: u8 },
    PlaybackFailed { name: String, error: String },
    NextChanged(Option<NextUp>),
}

/// How often each periodic transition runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub display_tick: Duration,
    pub check_interval: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Cadence {
            display_tick: Duration::from_secs(1),
            check_interval: Duration::from_secs(60),
        }
    }
}

// ── Handle ───────────────────────────────────────────────────────────────────

/// Cloneable handle for sending commands to the scheduler thread.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<SchedulerCmd>,
}

impl SchedulerHandle {
    pub fn force_check(&self) {
        let _ = self.tx.send(SchedulerCmd::ForceCheck);
    }

    pub fn reload(&self) {
        let _ = self.tx.send(SchedulerCmd::Reload);
    }

    /// Ask for the current display. `None` once the thread has stopped.
    pub fn status(&self) -> Option<StatusSnapshot> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx.send(SchedulerCmd::Status(reply_tx)).ok()?;
        reply_rx.recv().ok()
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(SchedulerCmd::Shutdown);
    }
}

// ── Operator console ─────────────────────────────────────────────────────────

/// Why the operator console stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// The operator typed `q`. The caller should shut the scheduler down.
    Quit,
    /// Input hit end of file. The scheduler keeps running.
    InputClosed,
    /// The scheduler thread stopped on its own.
    SchedulerGone,
}

/// Read operator commands line by line and forward them to the scheduler.
///
/// `c`/`check`, `r`/`reload`, `s`/`status` (or an empty line) and
/// `q`/`quit`/`exit`. End of input only ends the console, so a detached
/// `corebot run` keeps its schedule.
pub fn run_console<R, W>(input: R, out: &mut W, handle: &SchedulerHandle) -> ConsoleExit
where
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let Ok(line) = line else { break };
        match line.trim().to_lowercase().as_str() {
            "c" | "check" => handle.force_check(),
            "r" | "reload" => handle.reload(),
            "s" | "status" | "" => match handle.status() {
                Some(status) => {
                    for l in status.lines() {
                        let _ = writeln!(out, "{}", l);
                    }
                }
                None => return ConsoleExit::SchedulerGone,
            },
            "q" | "quit" | "exit" => return ConsoleExit::Quit,
            other => {
                let _ = writeln!(out, "Unknown command '{}'", other);
            }
        }
    }
    ConsoleExit::InputClosed
}

// ── Runtime ──────────────────────────────────────────────────────────────────

/// Spawn the poll loop on a dedicated thread.
///
/// The loop reloads once, then runs both cadences until `Shutdown` or until
/// every handle is dropped. `on_event` is called from the scheduler thread.
pub fn spawn_scheduler<F>(
    core: AppCore,
    cadence: Cadence,
    on_event: F,
) -> std::io::Result<(SchedulerHandle, thread::JoinHandle<()>)>
where
    F: Fn(SchedulerEvent) + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<SchedulerCmd>();

    let join = thread::Builder::new()
        .name("scheduler".into())
        .spawn(move || {
            scheduler_loop(core, rx, cadence, on_event);
        })?;

    Ok((SchedulerHandle { tx }, join))
}

fn scheduler_loop<F>(mut core: AppCore, rx: mpsc::Receiver<SchedulerCmd>, cadence: Cadence, on_event: F)
where
    F: Fn(SchedulerEvent),
{
    let report = core.reload();
    emit_reload(&core, report, &on_event);

    let start = Instant::now();
    let mut next_display = start + cadence.display_tick;
    let mut next_check = start + cadence.check_interval;
    let mut clock_down = false;

    loop {
        let timeout = next_display
            .min(next_check)
            .saturating_duration_since(Instant::now());

        match rx.recv_timeout(timeout) {
            Ok(SchedulerCmd::ForceCheck) => {
                info!("Manually checking video playback");
                run_check(&mut core, &on_event);
            }
            Ok(SchedulerCmd::Reload) => {
                let report = core.reload();
                emit_reload(&core, report, &on_event);
            }
            Ok(SchedulerCmd::Status(reply)) => {
                let _ = reply.send(core.status());
            }
            Ok(SchedulerCmd::Shutdown) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                // All handles dropped
                break;
            }
        }

        let now = Instant::now();
        if now >= next_display {
            display_tick(&core, &mut clock_down, &on_event);
            next_display = advance(next_display, cadence.display_tick, now);
        }
        if now >= next_check {
            run_check(&mut core, &on_event);
            next_check = advance(next_check, cadence.check_interval, now);
        }
    }
    info!("Scheduler stopped");
}

/// Next deadline after `now`, dropping any ticks that were missed entirely.
fn advance(deadline: Instant, period: Duration, now: Instant) -> Instant {
    let next = deadline + period;
    if next <= now { now + period } else { next }
}

fn display_tick<F>(core: &AppCore, clock_down: &mut bool, on_event: &F)
where
    F: Fn(SchedulerEvent),
{
    match core.display_time() {
        Ok(time) => {
            if *clock_down {
                info!("Clock available again");
                *clock_down = false;
            }
            on_event(SchedulerEvent::Clock(time));
        }
        Err(e) => {
            if !*clock_down {
                warn!("{}", e);
                *clock_down = true;
                on_event(SchedulerEvent::ClockUnavailable(e.to_string()));
            }
        }
    }
}

fn run_check<F>(core: &mut AppCore, on_event: &F)
where
    F: Fn(SchedulerEvent),
{
    let result = panic::catch_unwind(AssertUnwindSafe(|| core.check()));
    let result = match result {
        Ok(r) => r,
        Err(_) => {
            error!("Schedule check panicked, continuing");
            return;
        }
    };

    match result {
        CheckResult::Played(slot) => {
            on_event(SchedulerEvent::Fired {
                name: slot.item.name,
                minute: slot.minute.value(),
            });
            on_event(SchedulerEvent::NextChanged(core.next().cloned()));
        }
        CheckResult::PlaybackFailed(slot, e) => {
            on_event(SchedulerEvent::PlaybackFailed {
                name: slot.item.name,
                error: e.to_string(),
            });
            on_event(SchedulerEvent::NextChanged(core.next().cloned()));
        }
        // The display tick reports the outage.
        CheckResult::ClockUnavailable(_) => {}
        CheckResult::NothingDue(_) | CheckResult::AlreadyChecked(_) => {}
    }
}

fn emit_reload<F>(core: &AppCore, report: ReloadReport, on_event: &F)
where
    F: Fn(SchedulerEvent),
{
    if report.is_empty() {
        on_event(SchedulerEvent::CatalogEmpty(
            report.catalog_error.map(|e| e.to_string()),
        ));
    }
    on_event(SchedulerEvent::Reloaded {
        generation: report.generation,
        scheduled: report.scheduled,
    });
    on_event(SchedulerEvent::NextChanged(core.next().cloned()));
}

// ── Tests ────────────────────────────────────────────────────────────────────
