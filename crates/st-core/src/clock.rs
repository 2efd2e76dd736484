//! Injectable source of the current instant.

use chrono::{Local, NaiveDateTime};
use thiserror::Error;

/// Failure to obtain the current time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// The clock collaborator could not supply "now".
    #[error("clock unavailable: {0}")]
    Unavailable(String),
}

/// Supplies the current local wall-clock time.
///
/// Session schedules are local clock times without an offset, so the clock
/// reports naive local time as well.
pub trait Clock {
    fn now(&self) -> Result<NaiveDateTime, ClockError>;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Result<NaiveDateTime, ClockError> {
        (**self).now()
    }
}

/// Reads the operating system clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<NaiveDateTime, ClockError> {
        Ok(Local::now().naive_local())
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> Result<NaiveDateTime, ClockError> {
        Ok(self.0)
    }
}
