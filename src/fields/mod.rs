//! Field Registry
//!
//! Static catalog mapping a display field name to its parsing and validation
//! rules. Catalogs come from the built-in device tables or from a TOML file,
//! and are immutable once a [`FieldRegistry`] is built.

pub mod catalog;
pub mod sample;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::CleanError;

pub use sample::sample_value;

/// Kind of medical device a field is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Vital-sign monitor
    Monitor,
    /// Ventilator
    Respirator,
    /// Infusion pump
    Ivac,
}

impl DeviceType {
    /// All known device types, in catalog order
    pub const ALL: [DeviceType; 3] = [DeviceType::Respirator, DeviceType::Monitor, DeviceType::Ivac];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Monitor => "monitor",
            DeviceType::Respirator => "respirator",
            DeviceType::Ivac => "ivac",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = CleanError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monitor" => Ok(DeviceType::Monitor),
            "respirator" => Ok(DeviceType::Respirator),
            "ivac" => Ok(DeviceType::Ivac),
            _ => Err(CleanError::UnknownDevice(s.to_string())),
        }
    }
}

/// Inclusive numeric bounds, either side optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Bounds {
    pub const fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// Unbounded on both sides
    pub const fn any() -> Self {
        Self { min: None, max: None }
    }

    pub fn contains(&self, value: f64) -> bool {
        if let Some(min) = self.min {
            if value < min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return false;
            }
        }
        true
    }

    /// Parse `text` as a number and check it against the bounds.
    /// Unparseable text never passes.
    pub fn accepts(&self, text: &str) -> bool {
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => self.contains(value),
            _ => false,
        }
    }
}

/// Domain repair applied to a numeric field's candidates before range checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Repair {
    /// When a dotted and undotted spelling of the same digits compete, keep the dotted one
    #[default]
    CollapseDecimal,
    /// A dotless reading strictly between `low` and `high` gets a decimal point
    /// after its second digit (`372` -> `37.2`)
    ImpliedDecimal { low: u32, high: u32 },
    /// `CollapseDecimal`, plus substring reduction re-inserts a decimal point
    /// dropped from the longer reading (`45` + `.5` -> `4.5`)
    MergeDecimal,
}

/// Rules shared by integer and float fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSpec {
    /// Maximum number of digits on the display
    pub max_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Soft range the value normally sits in
    #[serde(default)]
    pub display: Bounds,
    /// Hard range outside of which a reading is rejected
    #[serde(default)]
    pub valid: Bounds,
    #[serde(default)]
    pub repair: Repair,
}

impl NumericSpec {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            min_length: None,
            display: Bounds::any(),
            valid: Bounds::any(),
            repair: Repair::default(),
        }
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn display(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.display = Bounds::new(min, max);
        self
    }

    pub fn valid(mut self, min: f64, max: f64) -> Self {
        self.valid = Bounds::new(Some(min), Some(max));
        self
    }

    pub fn repair(mut self, repair: Repair) -> Self {
        self.repair = repair;
        self
    }
}

/// A float field: numeric rules plus the number of displayed decimals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatSpec {
    #[serde(flatten)]
    pub numeric: NumericSpec,
    #[serde(default = "default_decimal_digits")]
    pub decimal_digits: u32,
}

fn default_decimal_digits() -> u32 {
    1
}

/// Free text field (medication name, ventilation mode)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpec {
    pub max_length: usize,
}

/// Names of the two sub-fields a combined reading splits into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitFields {
    pub systolic: String,
    pub diastolic: String,
}

/// Pattern matched at the start of a raw reading
#[derive(Debug, Clone)]
pub struct FieldPattern {
    source: String,
    regex: Regex,
}

impl FieldPattern {
    pub fn new(source: &str) -> std::result::Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})", source))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl PartialEq for FieldPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl TryFrom<String> for FieldPattern {
    type Error = regex::Error;

    fn try_from(source: String) -> std::result::Result<Self, Self::Error> {
        FieldPattern::new(&source)
    }
}

impl From<FieldPattern> for String {
    fn from(pattern: FieldPattern) -> Self {
        pattern.source
    }
}

impl Serialize for FieldPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for FieldPattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        FieldPattern::new(&source).map_err(serde::de::Error::custom)
    }
}

/// A reading made of several numbers, like blood pressure `120/80`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSpec {
    pub max_length: usize,
    pub pattern: FieldPattern,
    /// Replacement template using `${n}` capture references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_into: Option<SplitFields>,
}

/// Parsing and validation rules of one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldSpec {
    Integer(NumericSpec),
    Float(FloatSpec),
    Text(TextSpec),
    Composite(CompositeSpec),
}

impl FieldSpec {
    pub fn max_length(&self) -> usize {
        match self {
            FieldSpec::Integer(spec) => spec.max_length,
            FieldSpec::Float(spec) => spec.numeric.max_length,
            FieldSpec::Text(spec) => spec.max_length,
            FieldSpec::Composite(spec) => spec.max_length,
        }
    }

    /// Numeric rules, for integer and float fields
    pub fn numeric(&self) -> Option<&NumericSpec> {
        match self {
            FieldSpec::Integer(spec) => Some(spec),
            FieldSpec::Float(spec) => Some(&spec.numeric),
            FieldSpec::Text(_) | FieldSpec::Composite(_) => None,
        }
    }

    /// Hard validity range; unbounded for non-numeric kinds
    pub fn valid_range(&self) -> Bounds {
        self.numeric().map(|n| n.valid).unwrap_or_default()
    }

    pub fn repair(&self) -> Repair {
        self.numeric().map(|n| n.repair).unwrap_or_default()
    }

    /// Whether readings of this field go through candidate resolution and the
    /// temporal cache rather than a plain vote
    pub fn is_resolved(&self) -> bool {
        !matches!(self, FieldSpec::Text(_))
    }
}

/// One named field in a catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceType>,
    pub spec: FieldSpec,
}

/// On-disk catalog layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldEntry>,
}

/// Read-only lookup from field name to [`FieldSpec`]
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    entries: Vec<FieldEntry>,
    index: HashMap<String, usize>,
}

impl FieldRegistry {
    /// Build a registry from catalog entries. A later entry with the same
    /// name replaces the earlier one.
    pub fn new(entries: impl IntoIterator<Item = FieldEntry>) -> Self {
        let mut registry = Self::default();
        for entry in entries {
            if let Some(&idx) = registry.index.get(&entry.name) {
                registry.entries[idx] = entry;
            } else {
                registry.index.insert(entry.name.clone(), registry.entries.len());
                registry.entries.push(entry);
            }
        }
        registry
    }

    /// Built-in catalog for every device type
    pub fn builtin() -> crate::error::Result<Self> {
        Self::for_devices(&DeviceType::ALL)
    }

    /// Built-in catalog restricted to the given device types
    pub fn for_devices(devices: &[DeviceType]) -> crate::error::Result<Self> {
        let mut entries = Vec::new();
        for device in DeviceType::ALL {
            if devices.contains(&device) {
                entries.extend(catalog::device_fields(device)?);
            }
        }
        Ok(Self::new(entries))
    }

    /// Parse a TOML catalog
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content).context("Failed to parse field catalog")?;
        Ok(Self::new(file.fields))
    }

    pub fn lookup(&self, name: &str) -> Option<&FieldSpec> {
        self.index.get(name).map(|&idx| &self.entries[idx].spec)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Field names belonging to a device type, in catalog order
    pub fn measurements(&self, device: DeviceType) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.device == Some(device))
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_toml_string(&self) -> Result<String> {
        let file = CatalogFile {
            fields: self.entries.clone(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }
}

/// Load a field catalog from a TOML file
pub fn load_registry(path: &Path) -> Result<FieldRegistry> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read field catalog {:?}", path))?;
    FieldRegistry::from_toml_str(&content)
}
