use std::time::{Duration, Instant};

/// One engine step.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tick {
    /// Seconds since the previous tick.
    pub dt: f64,
    /// Scene seconds since the clock started.
    pub elapsed: f64,
    /// Monotonic tick counter, starting at 0.
    pub index: u64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ClockMode {
    /// Deltas follow the wall clock, clamped to `[min, max]`.
    Realtime { min: Duration, max: Duration },
    /// Every tick advances by exactly `1 / fps`.
    Fixed { fps: u32 },
}

impl ClockMode {
    pub fn realtime() -> Self {
        ClockMode::Realtime {
            min: Duration::from_micros(100),
            max: Duration::from_millis(250),
        }
    }
}

/// Produces [`Tick`]s for a render loop or an export session.
///
/// Realtime clamping keeps a paused debugger or a minimized window from
/// producing one enormous step.
#[derive(Debug, Clone)]
pub struct EngineClock {
    mode: ClockMode,
    last: Instant,
    elapsed: f64,
    index: u64,
}

impl EngineClock {
    pub fn new(mode: ClockMode) -> Self {
        if let ClockMode::Realtime { min, max } = mode {
            debug_assert!(min <= max);
        }
        Self {
            mode,
            last: Instant::now(),
            elapsed: 0.0,
            index: 0,
        }
    }

    pub fn realtime() -> Self {
        Self::new(ClockMode::realtime())
    }

    /// Fixed-step clock; `fps` of 0 is treated as 1.
    pub fn fixed(fps: u32) -> Self {
        Self::new(ClockMode::Fixed { fps: fps.max(1) })
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    /// Restarts scene time at zero.
    pub fn reset(&mut self) {
        self.last = Instant::now();
        self.elapsed = 0.0;
        self.index = 0;
    }

    pub fn tick(&mut self) -> Tick {
        let now = Instant::now();
        let dt = match self.mode {
            ClockMode::Realtime { min, max } => now
                .saturating_duration_since(self.last)
                .clamp(min, max)
                .as_secs_f64(),
            ClockMode::Fixed { fps } => 1.0 / f64::from(fps.max(1)),
        };
        self.last = now;

        self.elapsed += dt;
        let tick = Tick {
            dt,
            elapsed: self.elapsed,
            index: self.index,
        };
        self.index = self.index.wrapping_add(1);
        tick
    }
}

impl Default for EngineClock {
    fn default() -> Self {
        Self::realtime()
    }
}
