//! Temporal Cache
//!
//! Remembers the last valid value of every field of every monitor, and
//! arbitrates between a fresh resolution and that memory.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default time a cached value stays usable after its last valid reading
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

/// Last valid reading of one field of one monitor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorState {
    last_valid_value: Option<String>,
    /// `None` until the first valid reading
    last_valid_at: Option<Instant>,
}

impl SensorState {
    pub fn last_valid_value(&self) -> Option<&str> {
        self.last_valid_value.as_deref()
    }

    pub fn last_valid_at(&self) -> Option<Instant> {
        self.last_valid_at
    }

    fn within_window(&self, now: Instant, window: Duration) -> bool {
        self.last_valid_at
            .is_some_and(|at| now.saturating_duration_since(at) <= window)
    }
}

/// State of all fields of one monitor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorState {
    sensors: BTreeMap<String, SensorState>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sensor(&self, field: &str) -> Option<&SensorState> {
        self.sensors.get(field)
    }

    pub fn last_valid_value(&self, field: &str) -> Option<&str> {
        self.sensors.get(field).and_then(SensorState::last_valid_value)
    }

    /// Cached values of every field other than `field`
    pub fn other_values<'a>(&'a self, field: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.sensors
            .iter()
            .filter(move |(name, _)| name.as_str() != field)
            .filter_map(|(name, sensor)| sensor.last_valid_value().map(|v| (name.as_str(), v)))
    }

    /// Record a fresh valid value, or fall back to memory.
    ///
    /// With `Some(value)` the field's state is updated and the value returned.
    /// With `None` the cached value is returned while it is at most `window`
    /// old, `None` afterwards.
    pub fn resolve(
        &mut self,
        field: &str,
        value: Option<String>,
        now: Instant,
        window: Duration,
    ) -> Option<String> {
        let sensor = self.sensors.entry(field.to_string()).or_default();
        match value {
            Some(value) => {
                sensor.last_valid_value = Some(value.clone());
                sensor.last_valid_at = Some(now);
                Some(value)
            }
            None if sensor.within_window(now, window) => sensor.last_valid_value.clone(),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

/// Limits on how many monitors are remembered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Least recently seen monitors are evicted beyond this many
    pub max_monitors: usize,
    /// Monitors not seen for this long are evicted
    pub idle_timeout: Option<Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_monitors: 256,
            idle_timeout: Some(Duration::from_secs(3600)),
        }
    }
}

#[derive(Debug)]
struct MonitorEntry {
    state: Arc<Mutex<MonitorState>>,
    last_seen: Instant,
}

impl MonitorEntry {
    /// Someone besides the cache holds this state
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.state) > 1
    }
}

/// Per-monitor states keyed by monitor identity, created lazily
#[derive(Debug, Default)]
pub struct MonitorCache {
    monitors: HashMap<String, MonitorEntry>,
    policy: CachePolicy,
}

impl MonitorCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            monitors: HashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// State of `monitor_id`, creating it on first reference.
    ///
    /// Monitors whose state is still held by a caller are never evicted, so
    /// the cache may briefly exceed `max_monitors`.
    pub fn get_or_create(&mut self, monitor_id: &str, now: Instant) -> Arc<Mutex<MonitorState>> {
        if let Some(entry) = self.monitors.get_mut(monitor_id) {
            entry.last_seen = now;
            return Arc::clone(&entry.state);
        }

        while self.monitors.len() >= self.policy.max_monitors.max(1) {
            if !self.evict_least_recent() {
                break;
            }
        }

        debug!("Tracking new monitor {:?}", monitor_id);
        let state = Arc::new(Mutex::new(MonitorState::new()));
        self.monitors.insert(
            monitor_id.to_string(),
            MonitorEntry {
                state: Arc::clone(&state),
                last_seen: now,
            },
        );
        state
    }

    pub fn get(&self, monitor_id: &str) -> Option<Arc<Mutex<MonitorState>>> {
        self.monitors.get(monitor_id).map(|e| Arc::clone(&e.state))
    }

    /// Drop monitors idle for longer than the policy allows.
    /// Returns how many were evicted.
    pub fn evict_idle(&mut self, now: Instant) -> usize {
        let Some(timeout) = self.policy.idle_timeout else {
            return 0;
        };
        let before = self.monitors.len();
        self.monitors.retain(|id, entry| {
            let keep = entry.in_use() || now.saturating_duration_since(entry.last_seen) <= timeout;
            if !keep {
                debug!("Evicting idle monitor {:?}", id);
            }
            keep
        });
        before - self.monitors.len()
    }

    fn evict_least_recent(&mut self) -> bool {
        let oldest = self
            .monitors
            .iter()
            .filter(|(_, entry)| !entry.in_use())
            .min_by_key(|(_, entry)| entry.last_seen)
            .map(|(id, _)| id.clone());

        match oldest {
            Some(id) => {
                debug!("Evicting least recently seen monitor {:?}", id);
                self.monitors.remove(&id);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, monitor_id: &str) -> bool {
        self.monitors.contains_key(monitor_id)
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}
