use std::time::Instant;

/// Wall-clock stopwatch reporting elapsed milliseconds
#[derive(Debug, Clone, Copy)]
pub struct ScopedTimer {
    start: Instant,
}

impl ScopedTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Run `f` and return its output together with the elapsed milliseconds
pub fn time_ms<T>(f: impl FnOnce() -> T) -> (T, f64) {
    let timer = ScopedTimer::start();
    let out = f();
    (out, timer.elapsed_ms())
}
