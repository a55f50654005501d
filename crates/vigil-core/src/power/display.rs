use super::{Assertion, SleepInhibitor};
use crate::error::AssertionError;

const APP_NAME: &str = "vigil";
const APP_REVERSE_DOMAIN: &str = "io.github.vigil";

/// Keeps the display on through the `keepawake` crate
/// (IOKit power assertions on macOS, `SetThreadExecutionState` on Windows,
/// the freedesktop screensaver inhibit interface on Linux).
#[derive(Debug, Default)]
pub struct DisplayInhibitor;

impl DisplayInhibitor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SleepInhibitor for DisplayInhibitor {
    fn acquire(&mut self, reason: &str) -> Result<Box<dyn Assertion>, AssertionError> {
        let awake = ::keepawake::Builder::default()
            .display(true)
            .reason(reason)
            .app_name(APP_NAME)
            .app_reverse_domain(APP_REVERSE_DOMAIN)
            .create()
            .map_err(|e| AssertionError::Denied(e.to_string()))?;

        log::debug!("Acquired display sleep assertion: {reason}");
        Ok(Box::new(DisplayAssertion { _awake: awake }))
    }
}

struct DisplayAssertion {
    _awake: ::keepawake::KeepAwake,
}

impl Assertion for DisplayAssertion {}

impl Drop for DisplayAssertion {
    fn drop(&mut self) {
        log::debug!("Released display sleep assertion");
    }
}
