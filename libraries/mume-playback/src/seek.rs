//! Seek bar presentation
//!
//! The position reported by the audio backend lags behind user intent: after
//! a seek it keeps reporting the old position for a few ticks, and after a
//! track change it may report a large jump. [`SeekFilter`] decides what the
//! seek bar shows so the thumb does not snap back and forth. It never writes
//! canonical state; the value returned by [`SeekFilter::release_drag`] is
//! what the caller commits through
//! [`EngineHandle::seek_to`](crate::EngineHandle::seek_to).
//!
//! Time is passed in explicitly, which keeps the filter deterministic.

use crate::config::SeekConfig;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Hold {
    /// Released drag: ends on timeout or when raw catches up
    Seek,
    /// Raw jump: ends on timeout only
    Jump,
}

#[derive(Debug, Clone, Copy)]
struct Sticky {
    value: f64,
    until: Instant,
    hold: Hold,
}

/// Decides the displayed seek bar position
#[derive(Debug, Clone)]
pub struct SeekFilter {
    config: SeekConfig,
    drag: Option<f64>,
    sticky: Option<Sticky>,
    last_raw: Option<f64>,
    track_id: Option<String>,
}

impl Default for SeekFilter {
    fn default() -> Self {
        Self::new(SeekConfig::default())
    }
}

impl SeekFilter {
    pub fn new(config: SeekConfig) -> Self {
        Self {
            config,
            drag: None,
            sticky: None,
            last_raw: None,
            track_id: None,
        }
    }

    /// Start dragging from the value currently on screen
    pub fn begin_drag(&mut self, value: f64) {
        self.drag = Some(value);
    }

    /// Follow the thumb while dragging
    ///
    /// Ignored unless a drag is in progress.
    pub fn drag_to(&mut self, value: f64) {
        if self.drag.is_some() {
            self.drag = Some(value);
        }
    }

    /// Finish dragging at `value`
    ///
    /// Returns the position to seek to. The display holds that value until
    /// the backend reports a nearby position or the settle window elapses.
    pub fn release_drag(&mut self, value: f64, now: Instant) -> f64 {
        self.drag = None;
        self.sticky = Some(Sticky {
            value,
            until: now + self.config.settle_window(),
            hold: Hold::Seek,
        });
        value
    }

    /// Abandon a drag without seeking
    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Drop drag and hold state
    pub fn reset(&mut self) {
        self.drag = None;
        self.sticky = None;
    }

    /// Tell the filter which track the raw feed belongs to
    ///
    /// A different track clears drag and hold state. This catches track
    /// changes the raw feed cannot show, such as skipping while raw is
    /// already 0.
    pub fn follow_track(&mut self, track_id: Option<&str>) {
        if self.track_id.as_deref() != track_id {
            self.track_id = track_id.map(str::to_string);
            self.reset();
        }
    }

    /// Position to display for the raw backend position at `now`
    ///
    /// Raw dropping to exactly 0 from a non-zero value counts as a track
    /// change. A steady 0 does not, so a seek released at the start of a
    /// track still holds until the backend catches up.
    pub fn display(&mut self, raw: f64, now: Instant) -> f64 {
        let previous = self.last_raw.replace(raw);

        // Track change
        if raw == 0.0 && previous.is_some_and(|p| p != 0.0) {
            self.reset();
            return 0.0;
        }

        if let Some(value) = self.drag {
            return value;
        }

        if let Some(sticky) = self.sticky {
            let expired = now >= sticky.until;
            let settled = sticky.hold == Hold::Seek
                && (raw - sticky.value).abs() <= self.config.settle_tolerance_secs;
            if !expired && !settled {
                return sticky.value;
            }
            // The movement that ended a hold is not a new jump
            self.sticky = None;
            return raw;
        }

        if let Some(previous) = previous {
            if (raw - previous).abs() >= self.config.jump_threshold_secs {
                self.sticky = Some(Sticky {
                    value: raw,
                    until: now + self.config.settle_window(),
                    hold: Hold::Jump,
                });
            }
        }

        raw
    }
}

/// Format seconds as `m:ss`
///
/// Negative and non-finite values format as `0:00`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Slider upper bound: the duration, or 1 while it is unknown
pub fn slider_max(duration: f64) -> f64 {
    if duration > 0.0 {
        duration
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn follows_raw_without_interaction() {
        let mut filter = SeekFilter::default();
        let t0 = Instant::now();

        assert!(approx(filter.display(1.0, t0), 1.0));
        assert!(approx(filter.display(1.15, t0 + ms(150)), 1.15));
    }

    #[test]
    fn drag_value_wins_while_dragging() {
        let mut filter = SeekFilter::default();
        let t0 = Instant::now();
        filter.display(10.0, t0);

        filter.begin_drag(10.0);
        filter.drag_to(95.0);
        assert!(filter.is_dragging());
        assert!(approx(filter.display(10.15, t0 + ms(150)), 95.0));
    }

    #[test]
    fn release_holds_until_raw_settles() {
        let mut filter = SeekFilter::default();
        let t0 = Instant::now();
        filter.display(10.0, t0);

        filter.begin_drag(10.0);
        assert!(approx(filter.release_drag(95.0, t0), 95.0));
        assert!(!filter.is_dragging());

        // Backend still reports the old position
        assert!(approx(filter.display(10.15, t0 + ms(100)), 95.0));
        // Caught up within tolerance
        assert!(approx(filter.display(95.3, t0 + ms(300)), 95.3));
        assert!(approx(filter.display(95.45, t0 + ms(450)), 95.45));
    }

    #[test]
    fn release_hold_times_out() {
        let mut filter = SeekFilter::default();
        let t0 = Instant::now();
        filter.display(10.0, t0);

        filter.release_drag(95.0, t0);
        assert!(approx(filter.display(10.5, t0 + ms(799)), 95.0));
        assert!(approx(filter.display(10.65, t0 + ms(800)), 10.65));
    }

    #[test]
    fn jump_sticks_for_settle_window() {
        let mut filter = SeekFilter::default();
        let t0 = Instant::now();
        filter.display(10.0, t0);

        assert!(approx(filter.display(60.0, t0 + ms(150)), 60.0));
        assert!(approx(filter.display(60.15, t0 + ms(300)), 60.0));
        assert!(approx(filter.display(61.0, t0 + ms(950)), 61.0));
    }

    #[test]
    fn small_moves_are_not_jumps() {
        let mut filter = SeekFilter::default();
        let t0 = Instant::now();
        filter.display(10.0, t0);

        assert!(approx(filter.display(11.9, t0 + ms(150)), 11.9));
        assert!(approx(filter.display(12.0, t0 + ms(300)), 12.0));
    }

    #[test]
    fn zero_clears_everything() {
        let mut filter = SeekFilter::default();
        let t0 = Instant::now();
        filter.display(50.0, t0);
        filter.begin_drag(50.0);
        filter.drag_to(80.0);

        assert!(approx(filter.display(0.0, t0 + ms(10)), 0.0));
        assert!(!filter.is_dragging());
        assert!(approx(filter.display(0.15, t0 + ms(160)), 0.15));
    }

    #[test]
    fn cancel_returns_to_raw() {
        let mut filter = SeekFilter::default();
        let t0 = Instant::now();
        filter.display(5.0, t0);
        filter.begin_drag(5.0);
        filter.drag_to(30.0);
        filter.cancel_drag();

        assert!(approx(filter.display(5.15, t0 + ms(150)), 5.15));
    }

    #[test]
    fn drag_to_without_begin_is_ignored() {
        let mut filter = SeekFilter::default();
        filter.drag_to(30.0);
        assert!(!filter.is_dragging());
    }

    #[test]
    fn hold_survives_steady_zero() {
        let mut filter = SeekFilter::default();
        let t0 = Instant::now();
        filter.display(0.0, t0);

        filter.release_drag(95.0, t0);
        assert!(approx(filter.display(0.0, t0 + ms(150)), 95.0));
    }

    #[test]
    fn track_switch_at_zero_clears_hold() {
        let mut filter = SeekFilter::default();
        let t0 = Instant::now();
        filter.follow_track(Some("a"));
        filter.display(0.0, t0);

        filter.begin_drag(0.0);
        filter.release_drag(95.0, t0);
        filter.follow_track(Some("b"));

        assert!(approx(filter.display(0.0, t0 + ms(150)), 0.0));
        assert!(approx(filter.display(0.15, t0 + ms(300)), 0.15));
    }

    #[test]
    fn same_track_keeps_hold() {
        let mut filter = SeekFilter::default();
        let t0 = Instant::now();
        filter.follow_track(Some("a"));
        filter.display(10.0, t0);

        filter.release_drag(95.0, t0);
        filter.follow_track(Some("a"));
        assert!(approx(filter.display(10.15, t0 + ms(150)), 95.0));

        filter.follow_track(None);
        assert!(approx(filter.display(10.3, t0 + ms(300)), 10.3));
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(5.9), "0:05");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(600.0), "10:00");
        assert_eq!(format_time(-3.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }

    #[test]
    fn slider_max_defaults_to_one() {
        assert!(approx(slider_max(0.0), 1.0));
        assert!(approx(slider_max(200.0), 200.0));
    }
}
