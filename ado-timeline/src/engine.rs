use ado_data::cursor::{normalize_cursor, CursorRange, DateBounds, TimeSpanWindow};
use log::debug;
use std::collections::VecDeque;

use crate::speed::{PlaybackSpeed, TimelineError};

/// Day cursor plus auto-play state.
///
/// The cursor lives here, not in the view: every tick steps from the day
/// this struct last recorded. Day changes produced by [`Timeline::tick`]
/// are queued until the host reports them back through
/// [`Timeline::observe`], so playback keeps going even when the host lags
/// a few ticks behind. Any other reported change counts as manual
/// interaction and stops it.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    range: CursorRange,
    day: i64,
    speed: PlaybackSpeed,
    playing: bool,
    own_changes: VecDeque<i64>,
}

/// Unreported ticks kept before the oldest is forgotten.
const MAX_OWN_CHANGES: usize = 64;

impl Timeline {
    /// Starts stopped, on `requested` corrected into the effective range.
    pub fn new(range: CursorRange, requested: i64) -> Self {
        let day = normalize_cursor(requested, &range.effective()).day();
        Timeline {
            range,
            day,
            speed: PlaybackSpeed::default(),
            playing: false,
            own_changes: VecDeque::new(),
        }
    }

    pub fn day(&self) -> i64 {
        self.day
    }

    pub fn range(&self) -> &CursorRange {
        &self.range
    }

    pub fn bounds(&self) -> DateBounds {
        self.range.effective()
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) -> Result<(), TimelineError> {
        if self.playing {
            return Err(TimelineError::SpeedWhilePlaying);
        }
        self.speed = speed;
        Ok(())
    }

    /// Begin playing. From the last day, playback restarts at the first.
    /// Returns the day playback starts from.
    pub fn start(&mut self) -> i64 {
        let bounds = self.bounds();
        if self.day >= bounds.last {
            debug!("Auto-play at last day {}, jumping to {}", self.day, bounds.first);
            self.day = bounds.first;
            self.push_own_change();
        }
        self.playing = true;
        self.day
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.own_changes.clear();
    }

    /// Returns whether the timeline is playing afterwards.
    pub fn toggle(&mut self) -> bool {
        if self.playing {
            self.stop();
        } else {
            self.start();
        }
        self.playing
    }

    /// One auto-play step, wrapping from the last day back to the first.
    /// `None` when stopped.
    pub fn tick(&mut self) -> Option<i64> {
        if !self.playing {
            return None;
        }
        let bounds = self.bounds();
        let next = self.day + 1;
        self.day = if next > bounds.last || next < bounds.first {
            bounds.first
        } else {
            next
        };
        self.push_own_change();
        Some(self.day)
    }

    fn push_own_change(&mut self) {
        if self.own_changes.len() == MAX_OWN_CHANGES {
            self.own_changes.pop_front();
        }
        self.own_changes.push_back(self.day);
    }

    /// The host applied `day`. A day this timeline produced since the last
    /// manual action is consumed silently, together with every older
    /// unreported tick; anything else is a manual change and stops playback.
    pub fn observe(&mut self, day: i64) {
        if let Some(position) = self.own_changes.iter().position(|&own| own == day) {
            self.own_changes.drain(..=position);
            return;
        }
        if day != self.day {
            self.stop();
            self.day = normalize_cursor(day, &self.bounds()).day();
        }
    }

    /// Manual step forward, stopping at the last day.
    pub fn next(&mut self) -> i64 {
        self.stop();
        self.day = (self.day + 1).min(self.bounds().last);
        self.day
    }

    /// Manual step back, stopping at the first day.
    pub fn prev(&mut self) -> i64 {
        self.stop();
        self.day = (self.day - 1).max(self.bounds().first);
        self.day
    }

    /// Slider drag to `day`.
    pub fn scrub(&mut self, day: i64) -> i64 {
        self.stop();
        self.day = normalize_cursor(day, &self.bounds()).day();
        self.day
    }

    /// New dataset bounds, e.g. after switching index. Stops playback and
    /// corrects the cursor; any window is dropped.
    pub fn set_bounds(&mut self, bounds: DateBounds) {
        self.replace_range(CursorRange::new(bounds));
    }

    pub fn set_window(&mut self, window: TimeSpanWindow) {
        let mut range = self.range;
        range.set_window(window);
        self.replace_range(range);
    }

    pub fn reset_window(&mut self) {
        let mut range = self.range;
        range.reset();
        self.replace_range(range);
    }

    fn replace_range(&mut self, range: CursorRange) {
        self.stop();
        self.range = range;
        self.day = normalize_cursor(self.day, &self.bounds()).day();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(day: i64) -> Timeline {
        Timeline::new(CursorRange::new(DateBounds::new(100, 104).unwrap()), day)
    }

    #[test]
    fn test_new_corrects_day() {
        assert_eq!(timeline(110).day(), 104);
        assert_eq!(timeline(90).day(), 104);
        assert_eq!(timeline(102).day(), 102);
    }

    #[test]
    fn test_start_at_last_jumps_to_first() {
        let mut t = timeline(104);
        assert_eq!(t.start(), 100);
        assert_eq!(t.day(), 100);
        assert!(t.is_playing());
    }

    #[test]
    fn test_ticks_wrap_around() {
        let mut t = timeline(100);
        t.start();
        let len = t.bounds().days();
        for n in 1..=12 {
            let day = t.tick().unwrap();
            assert_eq!(day, 100 + n % len);
            assert!(t.is_playing());
        }
    }

    #[test]
    fn test_tick_when_stopped() {
        let mut t = timeline(100);
        assert_eq!(t.tick(), None);
        assert_eq!(t.day(), 100);
    }

    #[test]
    fn test_observe_own_tick_keeps_playing() {
        let mut t = timeline(100);
        t.start();
        let day = t.tick().unwrap();
        t.observe(day);
        assert!(t.is_playing());
        // flag is one-shot
        t.observe(103);
        assert!(!t.is_playing());
        assert_eq!(t.day(), 103);
    }

    #[test]
    fn test_observe_lagging_tick_keeps_playing() {
        let mut t = timeline(100);
        t.start();
        let first = t.tick().unwrap();
        let second = t.tick().unwrap();
        t.observe(first);
        assert!(t.is_playing());
        assert_eq!(t.day(), second);
        t.observe(second);
        assert!(t.is_playing());
        assert_eq!(t.tick(), Some(second + 1));
        // both were consumed
        t.observe(first);
        assert!(!t.is_playing());
    }

    #[test]
    fn test_observe_newest_consumes_older_ticks() {
        let mut t = timeline(100);
        t.start();
        let first = t.tick().unwrap();
        let second = t.tick().unwrap();
        t.observe(second);
        t.observe(first);
        assert!(!t.is_playing());
        assert_eq!(t.day(), first);
    }

    #[test]
    fn test_manual_next_stops() {
        let mut t = timeline(100);
        t.start();
        t.tick();
        assert_eq!(t.next(), 102);
        assert!(!t.is_playing());
        assert_eq!(t.tick(), None);
    }

    #[test]
    fn test_manual_steps_stop_at_edges() {
        let mut t = timeline(104);
        assert_eq!(t.next(), 104);
        let mut t = timeline(100);
        assert_eq!(t.prev(), 100);
    }

    #[test]
    fn test_speed_locked_while_playing() {
        let mut t = timeline(100);
        t.start();
        assert_eq!(
            t.set_speed(PlaybackSpeed::Double),
            Err(TimelineError::SpeedWhilePlaying)
        );
        assert!(!t.toggle());
        assert_eq!(t.set_speed(PlaybackSpeed::Double), Ok(()));
        assert_eq!(t.speed(), PlaybackSpeed::Double);
    }

    #[test]
    fn test_range_change_stops() {
        let mut t = timeline(101);
        t.start();
        t.set_window(TimeSpanWindow::last_days(2, 104));
        assert!(!t.is_playing());
        // 101 is before the narrowed minimum
        assert_eq!(t.day(), 104);
        assert_eq!(t.bounds().first, 103);

        t.start();
        t.reset_window();
        assert!(!t.is_playing());
        assert_eq!(t.bounds().first, 100);

        t.start();
        t.set_bounds(DateBounds::new(0, 50).unwrap());
        assert!(!t.is_playing());
        assert_eq!(t.day(), 50);
    }

    #[test]
    fn test_window_wraps_to_effective_first() {
        let mut t = timeline(104);
        t.set_window(TimeSpanWindow::last_days(3, 104));
        assert_eq!(t.start(), 102);
        assert_eq!(t.tick(), Some(103));
        assert_eq!(t.tick(), Some(104));
        assert_eq!(t.tick(), Some(102));
    }
}
