use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use crate::clock::{Clock, Zone};
use crate::duration::format_compact;
use crate::parse::{Expression, ExpressionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Running,
    Expired,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TimerOptions {
    pub auto_quit: bool,
    pub debug: bool,
    pub zone: Option<Zone>,
}

/// Read-only view of the engine after an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub status: String,
    pub finished: bool,
    pub left: Duration,
}

/// Remaining time until `end`, floored to whole seconds; `None` once `now`
/// is past `end`.
pub fn remaining(end: DateTime<Utc>, now: DateTime<Utc>) -> Option<Duration> {
    if now > end {
        return None;
    }
    let secs = end.signed_duration_since(now).num_seconds();
    Some(Duration::from_secs(secs.max(0) as u64))
}

/// Countdown engine.
///
/// The deadline is an absolute wall-clock instant; remaining time is always
/// recomputed from the clock instead of accumulated from ticks.
pub struct Timer {
    title: String,
    kind: ExpressionKind,
    options: TimerOptions,
    clock: Arc<dyn Clock>,
    duration: Duration,
    end: DateTime<Utc>,
    left: Duration,
    status: String,
    finished: Arc<AtomicBool>,
}

impl Timer {
    pub fn new(expr: Expression, options: TimerOptions, clock: Arc<dyn Clock>) -> Self {
        let end = clock.now();
        Timer {
            title: expr.title,
            kind: expr.kind,
            options,
            clock,
            duration: expr.duration,
            end,
            left: Duration::ZERO,
            status: String::new(),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sets the deadline to now + `duration` and enters the running state.
    pub fn start(&mut self, duration: Duration) {
        let delta = TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX);
        let now = self.clock.now();
        self.duration = duration;
        self.end = now.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.left = duration;
        self.finished.store(false, Ordering::SeqCst);
        info!(title = %self.title, end = %self.end, "countdown started");
    }

    /// Starts over with the original duration, only once expired.
    /// Returns whether the countdown was restarted.
    pub fn restart(&mut self) -> bool {
        if self.state() == TimerState::Running {
            debug!("restart ignored while running");
            return false;
        }
        self.start(self.duration);
        true
    }

    pub fn state(&self) -> TimerState {
        if self.clock.now() > self.end {
            TimerState::Expired
        } else {
            TimerState::Running
        }
    }

    pub fn update(&mut self) -> Snapshot {
        let now = self.clock.now();
        match remaining(self.end, now) {
            None => {
                self.finished.store(true, Ordering::SeqCst);
                self.status = if self.options.auto_quit {
                    "Finished".to_string()
                } else {
                    "Finished\n\n[r]estart\n[q]uit".to_string()
                };
            }
            Some(left) => {
                self.finished.store(false, Ordering::SeqCst);
                self.left = left;
                self.status = format_compact(left);
                // Clock-time titles already show the end time.
                if self.kind != ExpressionKind::ClockTime {
                    let zone = self.options.zone.unwrap_or(Zone::Local);
                    self.status.push(' ');
                    self.status.push_str(&zone.short_time(self.end));
                }
                if self.options.debug {
                    self.status.push_str(&format!(
                        "\n\nnow: {now}\nexact left: {:?}\nend: {}",
                        self.end.signed_duration_since(now).to_std().unwrap_or_default(),
                        self.end,
                    ));
                }
            }
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status.clone(),
            finished: self.is_finished(),
            left: self.left,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn banner(&self) -> String {
        format!("== {} ==", self.title)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn auto_quit(&self) -> bool {
        self.options.auto_quit
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Flag shared with the expiry alarm, which sets it when it fires.
    pub fn finished_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.finished)
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }
}
