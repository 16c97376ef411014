//! Frame timing and pacing.
//!
//! [`FrameClock`] is updated once per frame by the
//! [`FrameDriver`](crate::render::FrameDriver) and exposes the previous
//! frame's delta. [`FramePacer`] implements the optional FPS cap: before each
//! draw phase it sleeps whatever is left of the target interval.

use std::time::{Duration, Instant};

/// Frame counter and timing. Updated at the start of each frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    startup: Instant,
    frame_start: Instant,
    delta: Duration,
    frame_count: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            startup: now,
            frame_start: now,
            delta: Duration::ZERO,
            frame_count: 0,
        }
    }

    pub(crate) fn tick(&mut self, now: Instant) {
        self.delta = now.saturating_duration_since(self.frame_start);
        self.frame_start = now;
        self.frame_count += 1;
    }

    /// Duration of the previous frame.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Total time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.frame_start.saturating_duration_since(self.startup)
    }

    /// Number of frames started so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Estimated FPS based on the last frame's delta.
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleeps out the rest of a fixed frame interval.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Option<Duration>,
    last: Option<Instant>,
}

impl FramePacer {
    /// `fps` of `None` or `Some(0)` disables pacing.
    pub fn new(fps: Option<u32>) -> Self {
        let interval = fps
            .filter(|&f| f > 0)
            .map(|f| Duration::from_secs_f64(1.0 / f as f64));
        Self { interval, last: None }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// How long to sleep at `now` to honor the cap.
    pub fn remaining(&self, now: Instant) -> Duration {
        match (self.interval, self.last) {
            (Some(interval), Some(last)) => interval.saturating_sub(now.saturating_duration_since(last)),
            _ => Duration::ZERO,
        }
    }

    /// Sleep if the previous frame finished early, then start the next
    /// interval. Returns the instant the new frame starts.
    pub fn wait(&mut self) -> Instant {
        let pause = self.remaining(Instant::now());
        if !pause.is_zero() {
            log::trace!("Frame pacing: sleeping {pause:?}");
            std::thread::sleep(pause);
        }
        let now = Instant::now();
        self.last = Some(now);
        now
    }
}
