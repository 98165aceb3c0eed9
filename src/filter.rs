use std::collections::HashMap;
use std::path::Path;

/// Minimum seconds between two accepted events for the same path.
pub const THROTTLE_SECONDS: f64 = 5.0;

/// Extensions that produce log entries; everything else is ignored.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["txt", "py", "md"];

/// Decides which notifications become blocks. Editors and OSes emit
/// bursts of events for one logical save; the per-path throttle
/// collapses a burst into at most one accepted event per window.
pub struct EventFilter {
    last_handled: HashMap<String, f64>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self {
            last_handled: HashMap::new(),
        }
    }

    /// Returns true if an event for `path` at time `now` (seconds since
    /// epoch) should be recorded. Accepting updates the throttle state;
    /// rejecting never does, so a cooling-down path is not re-armed by
    /// the very events being suppressed.
    pub fn should_handle(&mut self, path: &Path, now: f64) -> bool {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_lowercase(),
            None => return false,
        };
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return false;
        }

        // Throttle is keyed by the exact path string; a moved file's
        // cooldown starts fresh at its destination.
        let key = path.display().to_string();
        let last = self.last_handled.get(&key).copied().unwrap_or(f64::NEG_INFINITY);
        if now - last < THROTTLE_SECONDS {
            return false;
        }

        self.last_handled.insert(key, now);
        true
    }

    /// Drops entries whose cooldown has already expired. They can no
    /// longer influence any decision, so this only bounds memory.
    pub fn evict_stale(&mut self, now: f64) {
        self.last_handled
            .retain(|_, last| now - *last < THROTTLE_SECONDS);
    }

    pub fn tracked_paths(&self) -> usize {
        self.last_handled.len()
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::new()
    }
}
