//! Playback clock and cooperative ticker.
//!
//! [`PlaybackClock`] is a plain state machine advanced by explicit
//! [`tick`](PlaybackClock::tick) calls; it never schedules anything
//! itself. [`Ticker`] is the loop that drives it: a single worker owning
//! its own cancellation flag, joined on stop, so teardown is
//! deterministic and no callback fires after [`Ticker::stop`] returns.
//!
//! All cursor mutation flows through whatever single loop calls `tick`,
//! so the transport needs no locking of its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::warn;

use crate::render::VisualizationMode;
use crate::TimeRange;

/// Tuning parameters for the playback clock.
///
/// These control visual smoothness, not correctness: the net simulation
/// rate is `speed × sim_ms_per_wall_ms` regardless of how ticks are
/// batched into commits.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Minimum wall-clock time between executed frames.
    /// Default: 33 ms (~30 Hz).
    pub frame_interval: Duration,

    /// Simulated milliseconds advanced per wall millisecond at 1× speed.
    /// Default: 1800.0, so one wall second plays ~30 simulated minutes.
    pub sim_ms_per_wall_ms: f64,

    /// Minimum buffered simulated time before the cursor visibly moves.
    /// Default: 15 simulated minutes.
    pub commit_batch: chrono::Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(33),
            sim_ms_per_wall_ms: 1800.0,
            commit_batch: chrono::Duration::minutes(15),
        }
    }
}

/// Read-only snapshot of the transport and view state, for renderers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub current_time: DateTime<Utc>,
    pub is_playing: bool,
    pub speed: f64,
    pub auto_track: bool,
    pub visualization_mode: VisualizationMode,
}

/// Virtual clock over a dataset's time range, with transport controls.
///
/// States are `PAUSED` and `PLAYING`. Reaching the end of the range while
/// playing commits exactly `range.end` and pauses; seeking backward and
/// playing again restarts the run.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    range: TimeRange,
    current: DateTime<Utc>,
    playing: bool,
    speed: f64,
    config: PlaybackConfig,
    /// Wall time accumulated since the last executed frame.
    wall_accum: Duration,
    /// Simulated time buffered but not yet committed to the cursor.
    sim_buffer_ms: f64,
}

impl PlaybackClock {
    /// Clock with default tuning, cursor at the start of the range.
    pub fn new(range: TimeRange) -> Self {
        Self::with_config(range, PlaybackConfig::default())
    }

    pub fn with_config(range: TimeRange, config: PlaybackConfig) -> Self {
        Self {
            range,
            current: range.start,
            playing: false,
            speed: 1.0,
            config,
            wall_accum: Duration::ZERO,
            sim_buffer_ms: 0.0,
        }
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn current_time(&self) -> DateTime<Utc> {
        self.current
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Fraction of the range covered by the cursor, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.range.progress(self.current)
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
        self.wall_accum = Duration::ZERO;
        self.sim_buffer_ms = 0.0;
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Set the cursor directly, clamped to the range.
    ///
    /// Allowed in either state and does not change it. Buffered simulated
    /// time is discarded; a direct cursor set supersedes pending
    /// accumulation.
    pub fn seek(&mut self, t: DateTime<Utc>) {
        self.current = self.range.clamp(t);
        self.sim_buffer_ms = 0.0;
    }

    /// Change the rate multiplier.
    ///
    /// Non-positive or non-finite values are ignored with a warning.
    /// The commit buffer is left alone; it keeps accumulating under the
    /// new rate.
    pub fn set_speed(&mut self, multiplier: f64) {
        if multiplier > 0.0 && multiplier.is_finite() {
            self.speed = multiplier;
        } else {
            warn!("ignoring invalid playback speed {multiplier}");
        }
    }

    /// Advance the clock by `elapsed` wall time.
    ///
    /// Frames are throttled to `frame_interval`; each executed frame adds
    /// `elapsed_wall_ms × speed × sim_ms_per_wall_ms` to the commit
    /// buffer, and the buffer moves the visible cursor only once it
    /// reaches `commit_batch`. Returns the committed cursor when a commit
    /// happened. Reaching the end of the range commits exactly
    /// `range.end` and pauses.
    pub fn tick(&mut self, elapsed: Duration) -> Option<DateTime<Utc>> {
        if !self.playing {
            return None;
        }

        self.wall_accum += elapsed;
        if self.wall_accum < self.config.frame_interval {
            return None;
        }

        let wall_ms = self.wall_accum.as_secs_f64() * 1_000.0;
        self.wall_accum = Duration::ZERO;
        self.sim_buffer_ms += wall_ms * self.speed * self.config.sim_ms_per_wall_ms;

        if self.sim_buffer_ms < self.config.commit_batch.num_milliseconds() as f64 {
            return None;
        }

        let advance = chrono::Duration::milliseconds(self.sim_buffer_ms as i64);
        self.sim_buffer_ms = 0.0;

        let target = self.current + advance;
        if target >= self.range.end {
            self.current = self.range.end;
            self.playing = false;
        } else {
            self.current = target;
        }
        Some(self.current)
    }
}

// ============================================================================
// Ticker
// ============================================================================

/// A stoppable worker loop invoking a callback at a fixed period.
///
/// The callback receives the measured elapsed wall time since its last
/// invocation and returns `false` to end the loop early (e.g. when the
/// clock pauses itself at the end of the range). Dropping the ticker
/// stops and joins the worker, so no callback fires after teardown.
pub struct Ticker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(Duration) -> bool + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::spawn(move || {
            let mut last = Instant::now();
            while flag.load(Ordering::Relaxed) {
                thread::sleep(period);
                let now = Instant::now();
                let elapsed = now - last;
                last = now;

                // Re-check after sleeping so stop() wins over a pending tick
                if !flag.load(Ordering::Relaxed) {
                    break;
                }
                if !on_tick(elapsed) {
                    flag.store(false, Ordering::Relaxed);
                    break;
                }
            }
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Whether the worker loop is still alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop the loop and wait for the worker to exit. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::AtomicUsize;

    fn ts(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn range(start_ms: i64, end_ms: i64) -> TimeRange {
        TimeRange {
            start: ts(start_ms),
            end: ts(end_ms),
        }
    }

    /// Unthrottled config where 1 wall ms = 1 simulated ms, committing
    /// every 100 simulated ms. Keeps tick math exact in tests.
    fn test_config() -> PlaybackConfig {
        PlaybackConfig {
            frame_interval: Duration::ZERO,
            sim_ms_per_wall_ms: 1.0,
            commit_batch: chrono::Duration::milliseconds(100),
        }
    }

    #[test]
    fn test_transport_transitions() {
        let mut clock = PlaybackClock::new(range(0, 10_000));
        assert!(!clock.is_playing());

        clock.play();
        assert!(clock.is_playing());
        clock.pause();
        assert!(!clock.is_playing());
        clock.toggle();
        assert!(clock.is_playing());
    }

    #[test]
    fn test_paused_clock_ignores_ticks() {
        let mut clock = PlaybackClock::with_config(range(0, 10_000), test_config());
        assert_eq!(clock.tick(Duration::from_millis(500)), None);
        assert_eq!(clock.current_time(), ts(0));
    }

    #[test]
    fn test_commit_batching() {
        let mut clock = PlaybackClock::with_config(range(0, 10_000), test_config());
        clock.play();

        // 60 simulated ms buffered: below the 100 ms batch, no commit
        assert_eq!(clock.tick(Duration::from_millis(60)), None);
        assert_eq!(clock.current_time(), ts(0));

        // 120 ms total: commits the whole buffer at once
        assert_eq!(clock.tick(Duration::from_millis(60)), Some(ts(120)));
    }

    #[test]
    fn test_frame_throttling() {
        let config = PlaybackConfig {
            frame_interval: Duration::from_millis(33),
            ..test_config()
        };
        let mut clock = PlaybackClock::with_config(range(0, 1_000_000), config);
        clock.play();

        // Sub-frame deltas accumulate without executing a frame
        assert_eq!(clock.tick(Duration::from_millis(10)), None);
        assert_eq!(clock.tick(Duration::from_millis(10)), None);
        // Crossing the frame interval converts all 40 wall ms at once,
        // but 40 simulated ms is still below the commit batch
        assert_eq!(clock.tick(Duration::from_millis(20)), None);
        // One more frame's worth pushes the buffer over 100 ms
        assert_eq!(clock.tick(Duration::from_millis(70)), Some(ts(110)));
    }

    #[test]
    fn test_speed_multiplier_scales_advance() {
        let mut clock = PlaybackClock::with_config(range(0, 100_000), test_config());
        clock.set_speed(5.0);
        clock.play();

        // 100 wall ms at 5x = 500 simulated ms
        assert_eq!(clock.tick(Duration::from_millis(100)), Some(ts(500)));
    }

    #[test]
    fn test_invalid_speed_is_ignored() {
        let mut clock = PlaybackClock::new(range(0, 1_000));
        clock.set_speed(0.0);
        assert_eq!(clock.speed(), 1.0);
        clock.set_speed(-2.0);
        assert_eq!(clock.speed(), 1.0);
        clock.set_speed(f64::NAN);
        assert_eq!(clock.speed(), 1.0);
        clock.set_speed(10.0);
        assert_eq!(clock.speed(), 10.0);
    }

    #[test]
    fn test_terminates_exactly_at_range_end() {
        let mut clock = PlaybackClock::with_config(range(0, 1_000), test_config());
        clock.play();

        assert_eq!(clock.tick(Duration::from_millis(600)), Some(ts(600)));
        // Overshoots: cursor lands exactly on end and the clock pauses
        assert_eq!(clock.tick(Duration::from_millis(600)), Some(ts(1_000)));
        assert_eq!(clock.current_time(), ts(1_000));
        assert!(!clock.is_playing());
        assert_eq!(clock.tick(Duration::from_millis(600)), None);
    }

    #[test]
    fn test_replay_after_seeking_back() {
        let mut clock = PlaybackClock::with_config(range(0, 1_000), test_config());
        clock.play();
        clock.tick(Duration::from_millis(2_000));
        assert!(!clock.is_playing());

        clock.seek(ts(0));
        clock.play();
        assert_eq!(clock.tick(Duration::from_millis(100)), Some(ts(100)));
    }

    #[test]
    fn test_seek_clamps_and_preserves_state() {
        let mut clock = PlaybackClock::with_config(range(1_000, 5_000), test_config());

        clock.seek(ts(0));
        assert_eq!(clock.current_time(), ts(1_000));
        clock.seek(ts(99_999));
        assert_eq!(clock.current_time(), ts(5_000));
        assert!(!clock.is_playing());

        clock.seek(ts(2_000));
        clock.play();
        clock.seek(ts(3_000));
        assert!(clock.is_playing());
    }

    #[test]
    fn test_seek_discards_buffered_time() {
        let mut clock = PlaybackClock::with_config(range(0, 100_000), test_config());
        clock.play();

        // 90 simulated ms buffered, not yet committed
        assert_eq!(clock.tick(Duration::from_millis(90)), None);
        clock.seek(ts(50_000));
        // Only post-seek accumulation reaches the cursor
        assert_eq!(clock.tick(Duration::from_millis(100)), Some(ts(50_100)));
    }

    #[test]
    fn test_pause_discards_buffered_time() {
        let mut clock = PlaybackClock::with_config(range(0, 100_000), test_config());
        clock.play();
        assert_eq!(clock.tick(Duration::from_millis(90)), None);

        clock.pause();
        clock.play();
        assert_eq!(clock.tick(Duration::from_millis(90)), None);
        assert_eq!(clock.tick(Duration::from_millis(20)), Some(ts(110)));
    }

    #[test]
    fn test_ticker_invokes_and_stops() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);

        let mut ticker = Ticker::spawn(Duration::from_millis(1), move |_| {
            seen.fetch_add(1, Ordering::Relaxed);
            true
        });

        while count.load(Ordering::Relaxed) < 3 {
            thread::yield_now();
        }
        ticker.stop();
        assert!(!ticker.is_running());

        let after_stop = count.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::Relaxed), after_stop);
    }

    #[test]
    fn test_ticker_callback_can_end_loop() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);

        let ticker = Ticker::spawn(Duration::from_millis(1), move |_| {
            seen.fetch_add(1, Ordering::Relaxed) < 4
        });

        while ticker.is_running() {
            thread::yield_now();
        }
        assert_eq!(count.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_ticker_drop_is_teardown() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);

        {
            let _ticker = Ticker::spawn(Duration::from_millis(1), move |_| {
                seen.fetch_add(1, Ordering::Relaxed);
                true
            });
            thread::sleep(Duration::from_millis(5));
        }

        let after_drop = count.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::Relaxed), after_drop);
    }
}
