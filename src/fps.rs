use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sliding-window frame rate meter.
///
/// Keeps the arrival time of every frame seen in the last `window` and reports
/// `frames / (newest - oldest)`.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    window: Duration,
    arrivals: VecDeque<Instant>,
    fps: f64,
}

impl FpsMeter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            arrivals: VecDeque::new(),
            fps: 0.0,
        }
    }

    /// Records a frame arriving at `now` and returns the updated rate.
    pub fn tick(&mut self, now: Instant) -> f64 {
        self.arrivals.push_back(now);

        while let Some(&oldest) = self.arrivals.front() {
            if now.saturating_duration_since(oldest) > self.window {
                self.arrivals.pop_front();
            } else {
                break;
            }
        }

        if self.arrivals.len() > 1 {
            let span = self.span().as_secs_f64();
            if span > 0.0 {
                self.fps = self.arrivals.len() as f64 / span;
            }
        }
        self.fps
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn reset(&mut self) {
        self.arrivals.clear();
        self.fps = 0.0;
    }

    fn span(&self) -> Duration {
        match (self.arrivals.front(), self.arrivals.back()) {
            (Some(first), Some(last)) => last.saturating_duration_since(*first),
            _ => Duration::ZERO,
        }
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(meter: &mut FpsMeter, start: Instant, count: u32, interval: Duration) -> f64 {
        let mut fps = 0.0;
        for i in 0..count {
            fps = meter.tick(start + interval * i);
        }
        fps
    }

    #[test]
    fn single_frame_reports_zero() {
        let mut meter = FpsMeter::default();
        assert_eq!(meter.tick(Instant::now()), 0.0);
    }

    #[test]
    fn rate_is_count_over_span() {
        let mut meter = FpsMeter::default();
        // 11 frames spanning exactly one second.
        let fps = feed(&mut meter, Instant::now(), 11, Duration::from_millis(100));
        assert!((fps - 11.0).abs() < 1e-9, "fps = {fps}");
    }

    #[test]
    fn old_frames_leave_the_window() {
        let mut meter = FpsMeter::new(Duration::from_secs(1));
        let start = Instant::now();
        feed(&mut meter, start, 30, Duration::from_millis(10));

        // A long pause pushes every earlier frame out of the window.
        let later = start + Duration::from_secs(10);
        meter.tick(later);
        let fps = meter.tick(later + Duration::from_millis(500));
        assert!((fps - 4.0).abs() < 1e-9, "fps = {fps}");
    }

    #[test]
    fn duplicate_timestamps_keep_previous_rate() {
        let mut meter = FpsMeter::default();
        let now = Instant::now();
        meter.tick(now);
        assert_eq!(meter.tick(now), 0.0);

        let fps = meter.tick(now + Duration::from_millis(200));
        assert!((fps - 15.0).abs() < 1e-9, "fps = {fps}");
    }

    #[test]
    fn reset_clears_history() {
        let mut meter = FpsMeter::default();
        feed(&mut meter, Instant::now(), 5, Duration::from_millis(33));
        assert!(meter.fps() > 0.0);

        meter.reset();
        assert_eq!(meter.fps(), 0.0);
        assert_eq!(meter.tick(Instant::now()), 0.0);
    }
}
