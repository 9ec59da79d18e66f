//! Pause-aware countdown used for every timed window of a session.

use std::time::Duration;

use tokio::{
    sync::watch,
    time::{Instant, sleep},
};

/// Monotonic countdown whose elapsed time only advances while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PausableClock {
    total: Duration,
    banked: Duration,
    running_since: Option<Instant>,
}

impl PausableClock {
    /// Start a countdown of `total`, frozen immediately when `paused` is set.
    pub fn start(total: Duration, paused: bool) -> Self {
        Self {
            total,
            banked: Duration::ZERO,
            running_since: (!paused).then(Instant::now),
        }
    }

    /// Configured length of the window.
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Time spent running, excluding paused spans, capped at the total.
    pub fn elapsed(&self) -> Duration {
        let running = self
            .running_since
            .map(|since| since.elapsed())
            .unwrap_or_default();
        (self.banked + running).min(self.total)
    }

    /// Time left before the window closes.
    pub fn remaining(&self) -> Duration {
        self.total.saturating_sub(self.elapsed())
    }

    /// Whether the countdown is frozen.
    pub fn is_paused(&self) -> bool {
        self.running_since.is_none()
    }

    /// Freeze the countdown. No-op when already paused.
    pub fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.banked += since.elapsed();
        }
    }

    /// Unfreeze the countdown. No-op when already running.
    pub fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    /// Time until the next whole tick boundary, never past the end of the window.
    fn next_step(&self, tick: Duration) -> Duration {
        let tick_nanos = tick.as_nanos().max(1);
        let into_tick = self.elapsed().as_nanos() % tick_nanos;
        let step = Duration::from_nanos((tick_nanos - into_tick) as u64);
        step.min(self.remaining())
    }
}

/// Notification emitted while a [`PausableClock`] is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// A tick boundary was reached; carries the remaining time.
    Tick(Duration),
    /// The countdown froze.
    Paused,
    /// The countdown resumed.
    Resumed,
}

/// Run `clock` to completion, honouring the pause flag published on `pause`.
///
/// `on_event` is called once up front with the initial remaining time, at every tick boundary
/// and on each pause transition. Returns once the remaining time reaches zero.
pub async fn drive<F>(
    clock: &mut PausableClock,
    tick: Duration,
    pause: &mut watch::Receiver<bool>,
    mut on_event: F,
) where
    F: FnMut(&PausableClock, ClockEvent),
{
    let mut pause_open = true;
    let initially_paused = *pause.borrow_and_update();
    apply_pause(clock, initially_paused, &mut on_event);
    on_event(clock, ClockEvent::Tick(clock.remaining()));

    loop {
        if clock.remaining().is_zero() {
            break;
        }

        if clock.is_paused() {
            if !pause_open {
                apply_pause(clock, false, &mut on_event);
                continue;
            }
            match pause.changed().await {
                Ok(()) => {
                    let paused = *pause.borrow_and_update();
                    apply_pause(clock, paused, &mut on_event);
                }
                Err(_) => pause_open = false,
            }
            continue;
        }

        let step = clock.next_step(tick);
        if !pause_open {
            sleep(step).await;
            on_event(clock, ClockEvent::Tick(clock.remaining()));
            continue;
        }

        tokio::select! {
            _ = sleep(step) => on_event(clock, ClockEvent::Tick(clock.remaining())),
            changed = pause.changed() => match changed {
                Ok(()) => {
                    let paused = *pause.borrow_and_update();
                    apply_pause(clock, paused, &mut on_event);
                }
                Err(_) => pause_open = false,
            },
        }
    }
}

fn apply_pause<F>(clock: &mut PausableClock, paused: bool, on_event: &mut F)
where
    F: FnMut(&PausableClock, ClockEvent),
{
    if paused && !clock.is_paused() {
        clock.pause();
        on_event(clock, ClockEvent::Paused);
    } else if !paused && clock.is_paused() {
        clock.resume();
        on_event(clock, ClockEvent::Resumed);
    }
}
