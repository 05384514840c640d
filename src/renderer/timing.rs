use std::time::{Duration, Instant};

/// Accumulator resets once it falls this far behind.
const MAX_ACCUMULATED: Duration = Duration::from_secs(10);

/// Timer for tracking frame timing and elapsed time.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    start_time: Instant,
    last_update: Instant,
    /// Time since last tick
    pub delta: Duration,
    /// Total elapsed time since creation
    pub elapsed: Duration,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    #[must_use]
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            last_update: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
        }
    }

    pub fn tick(&mut self) {
        let now = Instant::now();
        self.delta = now - self.last_update;
        self.elapsed = now - self.start_time;
        self.last_update = now;
    }

    /// Time since the last tick, without ticking.
    #[must_use]
    pub fn peek(&self) -> Duration {
        self.last_update.elapsed()
    }

    #[must_use]
    pub fn dt_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}

/// Frames-per-second estimate refreshed once a second.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    last_update: Instant,
    frame_count: u32,
    accumulated_time: Duration,
    pub current_fps: f32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
            accumulated_time: Duration::ZERO,
            current_fps: 0.0,
        }
    }

    pub fn update(&mut self) -> Option<f32> {
        self.frame_count += 1;
        let now = Instant::now();
        self.accumulated_time += now - self.last_update;
        self.last_update = now;

        if self.accumulated_time.as_secs_f32() >= 1.0 {
            self.current_fps = self.frame_count as f32 / self.accumulated_time.as_secs_f32();
            self.accumulated_time = Duration::ZERO;
            self.frame_count = 0;
            return Some(self.current_fps);
        }

        None
    }
}

/// Fixed-timestep accumulator.
#[derive(Debug, Clone, Default)]
pub struct FixedStepper {
    accumulator: Duration,
}

impl FixedStepper {
    /// Adds `dt` and drains whole `step`s, returning how many were drained.
    ///
    /// A backlog beyond ten seconds is dropped instead of replayed.
    pub fn advance(&mut self, dt: Duration, step: Duration) -> u32 {
        self.accumulator += dt;
        if self.accumulator > MAX_ACCUMULATED {
            log::debug!("Fixed-update backlog dropped ({:?})", self.accumulator);
            self.accumulator = Duration::ZERO;
            return 0;
        }
        if step.is_zero() {
            return 0;
        }
        let mut steps = 0;
        while self.accumulator >= step {
            self.accumulator -= step;
            steps += 1;
        }
        steps
    }

    #[must_use]
    pub fn pending(&self) -> Duration {
        self.accumulator
    }
}
