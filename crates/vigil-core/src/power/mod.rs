use crate::error::AssertionError;

pub mod display;

/// A held request that the display must not sleep.
///
/// Released when dropped, so every exit path that unwinds gives it back.
pub trait Assertion: Send {}

/// Platform capability to suppress display sleep.
pub trait SleepInhibitor: Send {
    /// Ask the OS for a no-display-sleep assertion labelled with `reason`.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError`] if the OS declines the request
    fn acquire(&mut self, reason: &str) -> Result<Box<dyn Assertion>, AssertionError>;
}

/// Create the inhibitor for the current platform.
#[must_use]
pub fn create_inhibitor() -> Box<dyn SleepInhibitor> {
    Box::new(display::DisplayInhibitor::new())
}
