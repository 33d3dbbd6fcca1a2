use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of uniqueness tokens for placement ids.
///
/// Tokens track wall-clock milliseconds but are strictly increasing: two
/// calls within the same millisecond (or after the wall clock stepped
/// backwards) still produce distinct, ordered values. Safe for concurrent
/// use across threads via an internal [`Mutex`].
pub struct TokenClock {
    last: Mutex<u64>,
}

impl TokenClock {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(0),
        }
    }

    /// Create a clock whose next token is at least `floor + 1`.
    pub fn starting_after(floor: u64) -> Self {
        Self {
            last: Mutex::new(floor),
        }
    }

    /// Next token, strictly greater than every token returned before.
    ///
    /// Saturates at `u64::MAX`; once reached, further calls keep returning it.
    pub fn next(&self) -> u64 {
        let wall = Self::wall_clock_ms();
        // The guarded value is a plain integer, so a poisoned lock still
        // holds a usable state.
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let token = wall.max(last.saturating_add(1));
        *last = token;
        token
    }

    /// Current wall-clock time in milliseconds since the UNIX epoch.
    fn wall_clock_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

impl Default for TokenClock {
    fn default() -> Self {
        Self::new()
    }
}
