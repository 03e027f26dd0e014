use chrono::{DateTime, Local};

/// Source of "now" for title tokens, export timestamps, and file names
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<Local>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Local>) -> Self {
        Self { instant }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.instant
    }
}

/// Advances by a fixed step on every read
#[cfg(test)]
pub struct SteppingClock {
    start: DateTime<Local>,
    step: chrono::Duration,
    reads: std::sync::atomic::AtomicI32,
}

#[cfg(test)]
impl SteppingClock {
    pub fn new(start: DateTime<Local>, step: chrono::Duration) -> Self {
        Self {
            start,
            step,
            reads: std::sync::atomic::AtomicI32::new(0),
        }
    }
}

#[cfg(test)]
impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Local> {
        let n = self
            .reads
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.start + self.step * n
    }
}
