//! Frame Cleaner
//!
//! Turns one frame of raw OCR segments into one cleaned value per field, and
//! owns the temporal state of every monitor it has seen.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::cache::{CachePolicy, MonitorCache, MonitorState, DEFAULT_WINDOW};
use super::candidates::CandidateSet;
use super::diagnostics::{CleanDiagnostics, OverlapObserver};
use super::resolver::resolve_candidates;
use super::sanitize::sanitize;
use crate::error::Result;
use crate::fields::{FieldRegistry, FieldSpec};
use crate::segment::{BoundingBox, CleanedSegment, Segment};

/// Identity used for frames that arrive without a monitor id
pub const UNKNOWN_MONITOR: &str = "unknown monitor";

/// Cleaner behavior settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanerConfig {
    /// How long a cached value may stand in for a missing one
    pub window: Duration,
    /// Identity substituted when the caller gives none
    pub unknown_monitor_id: String,
    pub cache: CachePolicy,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            unknown_monitor_id: UNKNOWN_MONITOR.to_string(),
            cache: CachePolicy::default(),
        }
    }
}

/// Result of cleaning one frame
#[derive(Debug, Clone, PartialEq)]
pub struct CleanOutput {
    /// One entry per field, in first-seen order
    pub segments: Vec<CleanedSegment>,
    pub diagnostics: CleanDiagnostics,
}

#[derive(Debug)]
struct FieldGroup {
    name: String,
    candidates: CandidateSet,
    bbox: Option<BoundingBox>,
}

/// Cleans frames for any number of monitors.
///
/// Frames of different monitors may be cleaned in parallel; frames of the
/// same monitor are serialized on that monitor's state.
pub struct Cleaner {
    registry: Arc<FieldRegistry>,
    config: CleanerConfig,
    monitors: Mutex<MonitorCache>,
    observer: Option<Arc<dyn OverlapObserver>>,
}

impl Cleaner {
    /// Create a cleaner with default settings
    pub fn new(registry: FieldRegistry) -> Self {
        Self::with_config(registry, CleanerConfig::default())
    }

    pub fn with_config(registry: FieldRegistry, config: CleanerConfig) -> Self {
        let monitors = Mutex::new(MonitorCache::new(config.cache));
        Self {
            registry: Arc::new(registry),
            config,
            monitors,
            observer: None,
        }
    }

    /// Report every overlap exclusion to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn OverlapObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    /// Clean one frame at the current time
    pub fn clean(&self, frame: &[Segment], monitor_id: Option<&str>) -> Result<CleanOutput> {
        self.clean_at(frame, monitor_id, Instant::now())
    }

    /// Clean one frame as of `now`.
    ///
    /// Fails only on malformed input; noisy readings degrade to the cached
    /// value or `None`.
    pub fn clean_at(&self, frame: &[Segment], monitor_id: Option<&str>, now: Instant) -> Result<CleanOutput> {
        let groups = self.group_segments(frame)?;
        let groups = self.split_composites(groups);

        let monitor_id = monitor_id.unwrap_or(&self.config.unknown_monitor_id);
        debug!("Cleaning {} fields for monitor {:?}", groups.len(), monitor_id);

        let state = self.monitor(monitor_id, now);
        let mut state = state.lock();
        let mut diagnostics = CleanDiagnostics::new();

        let segments = groups
            .into_iter()
            .map(|group| {
                let value = match self.registry.lookup(&group.name) {
                    Some(spec) if spec.is_resolved() => {
                        let resolution = resolve_candidates(
                            &group.name,
                            Some(spec),
                            &self.registry,
                            group.candidates.iter(),
                            &state,
                            &mut diagnostics,
                        );
                        state.resolve(&group.name, resolution.into_value(), now, self.config.window)
                    }
                    _ => group.candidates.most_common().map(str::to_string),
                };
                CleanedSegment {
                    name: group.name,
                    value,
                    bbox: group.bbox,
                }
            })
            .collect();

        self.notify(&diagnostics);
        Ok(CleanOutput { segments, diagnostics })
    }

    /// Resolve already-collected readings of one field against a monitor's
    /// state, without sanitizing them first
    pub fn resolve_field_at<'c>(
        &self,
        monitor_id: Option<&str>,
        field: &str,
        candidates: impl IntoIterator<Item = &'c str>,
        now: Instant,
    ) -> Option<String> {
        let monitor_id = monitor_id.unwrap_or(&self.config.unknown_monitor_id);
        let state = self.monitor(monitor_id, now);
        let mut state = state.lock();
        let mut diagnostics = CleanDiagnostics::new();

        let resolution = resolve_candidates(
            field,
            self.registry.lookup(field),
            &self.registry,
            candidates,
            &state,
            &mut diagnostics,
        );
        let value = state.resolve(field, resolution.into_value(), now, self.config.window);

        self.notify(&diagnostics);
        value
    }

    /// Snapshot of a monitor's state, if it is being tracked
    pub fn monitor_state(&self, monitor_id: &str) -> Option<MonitorState> {
        let state = self.monitors.lock().get(monitor_id)?;
        let snapshot = state.lock().clone();
        Some(snapshot)
    }

    pub fn monitor_count(&self) -> usize {
        self.monitors.lock().len()
    }

    fn monitor(&self, monitor_id: &str, now: Instant) -> Arc<Mutex<MonitorState>> {
        let mut monitors = self.monitors.lock();
        monitors.evict_idle(now);
        monitors.get_or_create(monitor_id, now)
    }

    fn notify(&self, diagnostics: &CleanDiagnostics) {
        if let Some(observer) = &self.observer {
            for overlap in &diagnostics.overlaps {
                observer.on_overlap(overlap);
            }
        }
    }

    /// Group segments by field name in first-seen order, sanitizing values
    fn group_segments(&self, frame: &[Segment]) -> Result<Vec<FieldGroup>> {
        let mut groups: Vec<FieldGroup> = Vec::new();

        for segment in frame {
            let Some(name) = segment.field_name() else {
                continue;
            };
            let bbox = segment.crop_box()?;

            let idx = match groups.iter().position(|g| g.name == name) {
                Some(idx) => idx,
                None => {
                    groups.push(FieldGroup {
                        name: name.to_string(),
                        candidates: CandidateSet::new(),
                        bbox: None,
                    });
                    groups.len() - 1
                }
            };
            let group = &mut groups[idx];

            let raw = segment.value.as_deref();
            match self.registry.lookup(name) {
                Some(spec) => group.candidates.insert(sanitize(spec, raw)),
                None => group.candidates.insert(raw.unwrap_or_default()),
            }
            if bbox.is_some() {
                group.bbox = bbox;
            }
        }

        Ok(groups)
    }

    /// Replace combined readings like `120/80` by their two sub-fields.
    ///
    /// A field is split only when it has a usable reading, neither sub-field
    /// was read directly, and every reading contains the separator; otherwise
    /// it is kept whole.
    fn split_composites(&self, groups: Vec<FieldGroup>) -> Vec<FieldGroup> {
        let present: HashSet<String> = groups.iter().map(|g| g.name.clone()).collect();
        let mut out = Vec::with_capacity(groups.len() + 2);

        for group in groups {
            let split = match self.registry.lookup(&group.name) {
                Some(FieldSpec::Composite(spec)) => spec.split_into.as_ref(),
                _ => None,
            };
            let Some(split) = split else {
                out.push(group);
                continue;
            };

            let splittable = !group.candidates.is_empty()
                && !present.contains(&split.systolic)
                && !present.contains(&split.diastolic)
                && group.candidates.iter().all(|c| c.contains('/'));
            if !splittable {
                debug!("Keeping {} whole this frame", group.name);
                out.push(group);
                continue;
            }

            let (systolic, diastolic) = group.candidates.split('/');
            out.push(FieldGroup {
                name: split.systolic.clone(),
                candidates: systolic,
                bbox: group.bbox,
            });
            out.push(FieldGroup {
                name: split.diastolic.clone(),
                candidates: diastolic,
                bbox: group.bbox,
            });
        }

        out
    }
}
