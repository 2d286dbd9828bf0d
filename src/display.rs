use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::alarm::{Scheduler, POLL_INTERVAL};
use crate::error::RenderError;
use crate::timer::Timer;

pub const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Quit,
    Restart,
    Resize(u16, u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    Finished,
}

/// Output target for the countdown: a banner line and the status text.
pub trait Surface {
    fn resize(&mut self, cols: u16, rows: u16);
    fn draw(&mut self, banner: &str, status: &str) -> io::Result<()>;
}

/// Drives the countdown until a quit key, or until expiry with auto-quit.
///
/// Redraws on every tick and reacts to inputs between ticks. Alarms for the
/// current run are armed here and replaced on restart.
pub async fn run<S: Surface>(
    timer: &mut Timer,
    scheduler: &Scheduler,
    surface: &mut S,
    mut inputs: mpsc::UnboundedReceiver<Input>,
) -> Result<Exit, RenderError> {
    let banner = timer.banner();
    let mut alarms = scheduler.arm(timer);
    let mut ticker = interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut inputs_open = true;

    let exit = loop {
        tokio::select! {
            input = inputs.recv(), if inputs_open => match input {
                Some(Input::Quit) => break Exit::Quit,
                Some(Input::Restart) => {
                    if timer.restart() {
                        alarms.cancel();
                        alarms = scheduler.arm(timer);
                        info!("countdown restarted");
                    }
                }
                Some(Input::Resize(cols, rows)) => {
                    debug!(cols, rows, "resize");
                    surface.resize(cols, rows);
                }
                None => {
                    debug!("input stream closed");
                    inputs_open = false;
                }
            },
            _ = ticker.tick() => {
                let snapshot = timer.update();
                if let Err(e) = surface.draw(&banner, &snapshot.status) {
                    alarms.cancel();
                    return Err(RenderError::Draw(e));
                }
                if timer.auto_quit() && snapshot.finished {
                    break Exit::Finished;
                }
            }
        }
    };

    match exit {
        // The expiry notice is normally one poll away, unless the clock just
        // stepped back behind the deadline.
        Exit::Finished => {
            let fired = timeout(POLL_INTERVAL * 2, alarms.expiry.fired()).await;
            if fired.is_err() {
                warn!("exiting before the expiry notice was sent");
            }
        }
        Exit::Quit => alarms.cancel(),
    }
    Ok(exit)
}
