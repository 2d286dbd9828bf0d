//! Pre-expiry and expiry alarms.
//!
//! Each alarm is a background task that waits for a wall-clock instant by
//! polling the clock, then pushes a notice and reports the fire time on a
//! oneshot channel. Polling instead of sleeping for the whole span keeps the
//! alarms on time when the system clock jumps or the machine sleeps.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::duration::format_compact;
use crate::notify::{NotificationSink, Notice, Urgency};
use crate::timer::{remaining, Timer};

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Countdowns this short get no pre-expiry alarm.
pub const PRE_EXPIRY_MIN: Duration = Duration::from_secs(10);

const PRE_EXPIRY_FRACTION: f64 = 0.9;

/// Resolves at the first poll where the clock reads past `deadline`.
pub async fn wait_until(clock: &dyn Clock, deadline: DateTime<Utc>) -> DateTime<Utc> {
    loop {
        let now = clock.now();
        if now > deadline {
            return now;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

pub struct Alarm {
    handle: JoinHandle<()>,
    fired: oneshot::Receiver<DateTime<Utc>>,
}

impl Alarm {
    fn spawn<F>(clock: Arc<dyn Clock>, at: DateTime<Utc>, on_fire: F) -> Self
    where
        F: FnOnce(DateTime<Utc>) + Send + 'static,
    {
        let (tx, fired) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let now = wait_until(clock.as_ref(), at).await;
            on_fire(now);
            let _ = tx.send(now);
        });
        Alarm { handle, fired }
    }

    /// Fire time, or `None` if the alarm was cancelled.
    pub async fn fired(self) -> Option<DateTime<Utc>> {
        self.fired.await.ok()
    }
}

/// Alarms armed by one `start` of a countdown.
pub struct Alarms {
    pub pre_expiry: Option<Alarm>,
    pub expiry: Alarm,
}

impl Alarms {
    pub fn cancel(&self) {
        if let Some(pre) = &self.pre_expiry {
            pre.handle.abort();
        }
        self.expiry.handle.abort();
        debug!("alarms cancelled");
    }
}

/// Instant at which the given share of a run ending at `end` has elapsed,
/// or `None` when it falls outside the representable range.
fn pre_expiry_at(end: DateTime<Utc>, duration: Duration) -> Option<DateTime<Utc>> {
    let lead = (duration.as_secs_f64() * PRE_EXPIRY_FRACTION).floor() as i64;
    let lead = TimeDelta::try_seconds(lead)?;
    let start = end.checked_sub_signed(TimeDelta::from_std(duration).ok()?)?;
    start.checked_add_signed(lead)
}

pub struct Scheduler {
    sink: Arc<dyn NotificationSink>,
}

impl Scheduler {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Scheduler { sink }
    }

    /// Arms alarms for the timer's current run.
    pub fn arm(&self, timer: &Timer) -> Alarms {
        let clock = timer.clock();
        let end = timer.end();
        let duration = timer.duration();
        let title = timer.title().to_string();

        let pre_at = if duration > PRE_EXPIRY_MIN {
            let at = pre_expiry_at(end, duration);
            if at.is_none() {
                warn!(?duration, "pre-expiry instant out of range, skipping");
            }
            at
        } else {
            None
        };

        let pre_expiry = pre_at.map(|at| {
            let sink = Arc::clone(&self.sink);
            let title = title.clone();
            Alarm::spawn(Arc::clone(&clock), at, move |now| {
                let left = remaining(end, now).unwrap_or_default();
                info!(left = %format_compact(left), "pre-expiry alarm");
                sink.push(Notice {
                    title,
                    body: format!("{} left", format_compact(left)),
                    urgency: Urgency::Critical,
                });
            })
        });

        let sink = Arc::clone(&self.sink);
        let finished = timer.finished_flag();
        let expiry = Alarm::spawn(clock, end, move |_| {
            info!("expiry alarm");
            sink.push(Notice {
                title,
                body: "Finished".to_string(),
                urgency: Urgency::Critical,
            });
            finished.store(true, Ordering::SeqCst);
        });

        debug!(%end, pre_expiry = pre_expiry.is_some(), "alarms armed");
        Alarms { pre_expiry, expiry }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::parse::{Expression, ExpressionKind};
    use crate::timer::TimerOptions;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    /// Wall clock driven by tokio's pausable time.
    pub(crate) struct TokioClock {
        base: DateTime<Utc>,
        origin: tokio::time::Instant,
    }

    impl TokioClock {
        pub(crate) fn new() -> Arc<Self> {
            let base = NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
                .and_utc();
            Arc::new(TokioClock {
                base,
                origin: tokio::time::Instant::now(),
            })
        }
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<Utc> {
            self.base + TimeDelta::from_std(self.origin.elapsed()).unwrap()
        }
    }

    #[derive(Default)]
    pub(crate) struct Recorder {
        pub(crate) notices: Mutex<Vec<Notice>>,
    }

    impl Recorder {
        pub(crate) fn bodies(&self) -> Vec<String> {
            self.notices
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.body.clone())
                .collect()
        }
    }

    impl NotificationSink for Recorder {
        fn push(&self, notice: Notice) {
            self.notices.lock().unwrap().push(notice);
        }
    }

    fn timer(secs: u64, clock: Arc<TokioClock>) -> Timer {
        let expr = Expression {
            duration: Duration::from_secs(secs),
            title: format!("{secs}s Timer"),
            kind: ExpressionKind::Duration,
        };
        let mut timer = Timer::new(expr, TimerOptions::default(), clock);
        timer.start(Duration::from_secs(secs));
        timer
    }

    fn elapsed_secs(since: DateTime<Utc>, at: DateTime<Utc>) -> f64 {
        at.signed_duration_since(since).num_milliseconds() as f64 / 1000.0
    }

    #[tokio::test(start_paused = true)]
    async fn pre_expiry_fires_before_expiry() {
        let clock = TokioClock::new();
        let started = clock.now();
        let timer = timer(100, clock);
        let recorder = Arc::new(Recorder::default());
        let alarms = Scheduler::new(recorder.clone()).arm(&timer);

        let pre = alarms.pre_expiry.unwrap().fired().await.unwrap();
        let expiry = alarms.expiry.fired().await.unwrap();

        let pre = elapsed_secs(started, pre);
        let expiry = elapsed_secs(started, expiry);
        assert!((90.0..100.0).contains(&pre), "pre-expiry at {pre}");
        assert!(expiry >= 100.0, "expiry at {expiry}");
        assert!(pre < expiry);

        assert_eq!(recorder.bodies(), vec!["9s left", "Finished"]);
        assert!(
            recorder
                .notices
                .lock()
                .unwrap()
                .iter()
                .all(|n| n.urgency == Urgency::Critical)
        );
        assert!(timer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_pre_expiry_is_skipped() {
        let clock = TokioClock::new();
        let expr = Expression {
            duration: Duration::from_secs(u64::MAX / 2),
            title: "forever Timer".to_string(),
            kind: ExpressionKind::Duration,
        };
        let mut timer = Timer::new(expr, TimerOptions::default(), clock);
        timer.start(Duration::from_secs(u64::MAX / 2));

        let alarms = Scheduler::new(Arc::new(Recorder::default())).arm(&timer);
        assert!(alarms.pre_expiry.is_none());
        alarms.cancel();
    }

    #[test]
    fn pre_expiry_at_is_ninety_percent_in() {
        let end = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            .and_utc();
        let at = pre_expiry_at(end, Duration::from_secs(100)).unwrap();
        assert_eq!(end - at, TimeDelta::seconds(10));
        assert_eq!(
            pre_expiry_at(DateTime::<Utc>::MAX_UTC, Duration::from_secs(u64::MAX / 2)),
            None
        );
    }

    #[tokio::test(start_paused = true)]
    async fn short_countdown_has_only_expiry() {
        let clock = TokioClock::new();
        let timer = timer(10, clock);
        let recorder = Arc::new(Recorder::default());
        let alarms = Scheduler::new(recorder.clone()).arm(&timer);

        assert!(alarms.pre_expiry.is_none());
        alarms.expiry.fired().await.unwrap();
        assert_eq!(recorder.bodies(), vec!["Finished"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_alarms_never_fire() {
        let clock = TokioClock::new();
        let timer = timer(30, clock);
        let recorder = Arc::new(Recorder::default());
        let alarms = Scheduler::new(recorder.clone()).arm(&timer);

        alarms.cancel();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(alarms.expiry.fired().await.is_none());
        assert!(recorder.bodies().is_empty());
        assert!(!timer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_follows_wall_clock() {
        let clock = TokioClock::new();
        let deadline = clock.now() + TimeDelta::seconds(1);
        let fired = wait_until(clock.as_ref(), deadline).await;
        assert!(fired > deadline);
        assert!(fired - deadline <= TimeDelta::from_std(POLL_INTERVAL).unwrap());
    }
}
