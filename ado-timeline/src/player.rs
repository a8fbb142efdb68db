use ado_data::cursor::{DateBounds, TimeSpanWindow};
use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::engine::Timeline;
use crate::speed::{PlaybackSpeed, TimelineError};

fn lock(timeline: &Mutex<Timeline>) -> MutexGuard<'_, Timeline> {
    timeline.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs a [`Timeline`] on a timer.
///
/// Every day the timeline moves to during playback is sent on the channel
/// returned by [`Player::new`]. At most one timer task exists; it is
/// aborted on pause, on any manual interaction, on range changes and when
/// the player is dropped. Must be used inside a tokio runtime.
pub struct Player {
    timeline: Arc<Mutex<Timeline>>,
    days: UnboundedSender<i64>,
    task: Option<JoinHandle<()>>,
}

impl Player {
    pub fn new(timeline: Timeline) -> (Self, UnboundedReceiver<i64>) {
        let (days, receiver) = unbounded_channel();
        let player = Player {
            timeline: Arc::new(Mutex::new(timeline)),
            days,
            task: None,
        };
        (player, receiver)
    }

    pub fn day(&self) -> i64 {
        lock(&self.timeline).day()
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.timeline).is_playing()
    }

    pub fn speed(&self) -> PlaybackSpeed {
        lock(&self.timeline).speed()
    }

    pub fn bounds(&self) -> DateBounds {
        lock(&self.timeline).bounds()
    }

    /// Start playing, restarting the timer if it already runs.
    pub fn play(&mut self) {
        self.abort();
        let (before, day, period) = {
            let mut timeline = lock(&self.timeline);
            let before = timeline.day();
            let day = timeline.start();
            (before, day, timeline.speed().interval())
        };
        if day != before {
            let _ = self.days.send(day);
        }
        debug!("Auto-play started at day {} every {:?}", day, period);
        self.task = Some(tokio::spawn(drive(
            Arc::clone(&self.timeline),
            self.days.clone(),
            period,
        )));
    }

    pub fn pause(&mut self) {
        self.abort();
        lock(&self.timeline).stop();
    }

    pub fn toggle(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) -> Result<(), TimelineError> {
        lock(&self.timeline).set_speed(speed)
    }

    /// Report a day the host applied; see [`Timeline::observe`].
    pub fn observe(&mut self, day: i64) {
        let playing = {
            let mut timeline = lock(&self.timeline);
            timeline.observe(day);
            timeline.is_playing()
        };
        if !playing {
            self.abort();
        }
    }

    pub fn next(&mut self) -> i64 {
        self.abort();
        lock(&self.timeline).next()
    }

    pub fn prev(&mut self) -> i64 {
        self.abort();
        lock(&self.timeline).prev()
    }

    pub fn scrub(&mut self, day: i64) -> i64 {
        self.abort();
        lock(&self.timeline).scrub(day)
    }

    pub fn set_bounds(&mut self, bounds: DateBounds) -> i64 {
        self.abort();
        let mut timeline = lock(&self.timeline);
        timeline.set_bounds(bounds);
        timeline.day()
    }

    pub fn set_window(&mut self, window: TimeSpanWindow) -> i64 {
        self.abort();
        let mut timeline = lock(&self.timeline);
        timeline.set_window(window);
        timeline.day()
    }

    pub fn reset_window(&mut self) -> i64 {
        self.abort();
        let mut timeline = lock(&self.timeline);
        timeline.reset_window();
        timeline.day()
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.abort();
    }
}

async fn drive(timeline: Arc<Mutex<Timeline>>, days: UnboundedSender<i64>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(day) = lock(&timeline).tick() else {
            break;
        };
        if days.send(day).is_err() {
            warn!("Auto-play receiver dropped, stopping at day {}", day);
            lock(&timeline).stop();
            break;
        }
    }
}
