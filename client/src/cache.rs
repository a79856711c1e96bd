//! Last-good value cache used to smooth over unreadable server replies

use log::warn;
use std::fmt;

/// Remembers the most recent successfully decoded value.
///
/// A failed decode returns the previous value instead of an error, and the
/// fallback is counted so it stays visible in logs and tests.
#[derive(Debug, Clone)]
pub struct LastGood<T> {
    value: Option<T>,
    fallbacks: u64,
}

impl<T: Clone> LastGood<T> {
    pub fn new() -> Self {
        Self {
            value: None,
            fallbacks: 0,
        }
    }

    pub fn update<E: fmt::Display>(&mut self, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => {
                self.value = Some(value.clone());
                Some(value)
            }
            Err(e) => {
                self.fallbacks += 1;
                warn!("Unreadable reply ({}), reusing last good state", e);
                self.value.clone()
            }
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn fallbacks(&self) -> u64 {
        self.fallbacks
    }

    pub fn clear(&mut self) {
        self.value = None;
        self.fallbacks = 0;
    }
}

impl<T: Clone> Default for LastGood<T> {
    fn default() -> Self {
        Self::new()
    }
}
