use std::time::Duration;

use tokio::time::Instant;

/// Turns a stream of typing pulses into a boolean that decays after a quiet
/// window.
///
/// State is only the instant of the most recent pulse; `is_typing` is a pure
/// function of elapsed time, so there is nothing to get out of sync. Every
/// pulse restarts the window.
#[derive(Debug, Clone)]
pub struct PresenceDebouncer {
    window: Duration,
    last_pulse: Option<Instant>,
    enabled: bool,
}

impl PresenceDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_pulse: None,
            enabled: true,
        }
    }

    /// A debouncer that ignores pulses and always reads idle.
    pub fn disabled() -> Self {
        Self {
            window: Duration::ZERO,
            last_pulse: None,
            enabled: false,
        }
    }

    /// Record a pulse at `now`. Returns true on the idle -> active edge.
    pub fn pulse(&mut self, now: Instant) -> bool {
        if !self.enabled {
            return false;
        }
        let was_typing = self.is_typing(now);
        self.last_pulse = Some(now);
        !was_typing
    }

    pub fn is_typing(&self, now: Instant) -> bool {
        match self.last_pulse {
            Some(last) if self.enabled => now.saturating_duration_since(last) < self.window,
            _ => false,
        }
    }

    /// When the flag will drop if no further pulse arrives.
    pub fn expires_at(&self) -> Option<Instant> {
        if !self.enabled {
            return None;
        }
        self.last_pulse.map(|last| last + self.window)
    }

    pub fn clear(&mut self) {
        self.last_pulse = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
