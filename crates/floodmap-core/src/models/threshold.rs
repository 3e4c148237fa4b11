//! Water threshold tables and their reconciliation against the selected images

use crate::error::{FloodError, Result};
use crate::models::product::Polarization;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Inclusive gray-level range swept by the vector extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRange {
    pub min: u32,
    pub max: u32,
}

impl ThresholdRange {
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min > max {
            return Err(FloodError::validation(
                "thresholds",
                format!("minimum {} is greater than maximum {}", min, max),
            ));
        }
        Ok(Self { min, max })
    }

    /// Every integer threshold in the range
    pub fn values(&self) -> impl Iterator<Item = u32> {
        self.min..=self.max
    }

    /// Number of products a sweep over this range produces
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        (self.max - self.min) as usize + 1
    }
}

/// Built-in water thresholds for the 8-bit scaled domain
pub fn default_range(polarization: Polarization) -> ThresholdRange {
    match polarization {
        Polarization::HH | Polarization::VH => ThresholdRange { min: 10, max: 12 },
        Polarization::HV | Polarization::VV => ThresholdRange { min: 4, max: 6 },
    }
}

/// One user-supplied row of the threshold table, before reconciliation
///
/// Values stay signed so negative input can be reported rather than wrapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEntry {
    pub polarization: String,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl ThresholdEntry {
    pub fn new(polarization: impl Into<String>, min: i64, max: i64) -> Self {
        Self { polarization: polarization.into(), min: Some(min), max: Some(max) }
    }

    /// Check the numeric part of the entry
    pub fn validate(&self) -> Result<ThresholdRange> {
        let parameter = format!("thresholds.{}", self.polarization);
        let min = self
            .min
            .ok_or_else(|| FloodError::validation(&parameter, "minimum threshold is missing"))?;
        let max = self
            .max
            .ok_or_else(|| FloodError::validation(&parameter, "maximum threshold is missing"))?;

        if min < 0 {
            return Err(FloodError::validation(&parameter, format!("minimum {} is negative", min)));
        }
        if max < 0 {
            return Err(FloodError::validation(&parameter, format!("maximum {} is negative", max)));
        }
        if min > max {
            return Err(FloodError::validation(
                &parameter,
                format!("minimum {} is greater than maximum {}", min, max),
            ));
        }

        let to_u32 = |v: i64| {
            u32::try_from(v)
                .map_err(|_| FloodError::validation(&parameter, format!("{} is out of range", v)))
        };
        Ok(ThresholdRange { min: to_u32(min)?, max: to_u32(max)? })
    }
}

impl FromStr for ThresholdEntry {
    type Err = FloodError;

    /// Parse `POL:MIN:MAX`, e.g. `HH:10:12`
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(FloodError::validation(
                "thresholds",
                format!("'{}' must look like POL:MIN:MAX, e.g. HH:10:12", s),
            ));
        }

        let number = |v: &str| {
            v.parse::<i64>().map_err(|_| {
                FloodError::validation("thresholds", format!("'{}' in '{}' is not an integer", v, s))
            })
        };

        Ok(Self {
            polarization: parts[0].to_string(),
            min: Some(number(parts[1])?),
            max: Some(number(parts[2])?),
        })
    }
}

impl fmt::Display for ThresholdEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string());
        write!(f, "{}:{}:{}", self.polarization, show(self.min), show(self.max))
    }
}

/// Non-fatal repair made to configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationWarning {
    pub parameter: String,
    pub message: String,
}

impl ConfigurationWarning {
    pub fn new(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self { parameter: parameter.into(), message: message.into() }
    }
}

impl fmt::Display for ConfigurationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.parameter, self.message)
    }
}

/// Reconciled thresholds, one range per selected polarization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    ranges: BTreeMap<Polarization, ThresholdRange>,
}

impl ThresholdSet {
    /// Table holding the built-in ranges for every polarization
    pub fn defaults() -> Self {
        Self {
            ranges: Polarization::ALL.iter().map(|p| (*p, default_range(*p))).collect(),
        }
    }

    pub fn get(&self, polarization: Polarization) -> Option<ThresholdRange> {
        self.ranges.get(&polarization).copied()
    }

    pub fn insert(&mut self, polarization: Polarization, range: ThresholdRange) {
        self.ranges.insert(polarization, range);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Polarization, ThresholdRange)> + '_ {
        self.ranges.iter().map(|(p, r)| (*p, *r))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Reconcile a user table against the polarizations that actually have images
    ///
    /// Unsupported and duplicate rows are dropped, images without a row get the
    /// built-in range, and rows without an image are discarded. Numeric problems
    /// cannot be repaired and are returned as errors.
    pub fn reconcile(
        entries: &[ThresholdEntry],
        selected: &[Polarization],
    ) -> Result<(Self, Vec<ConfigurationWarning>)> {
        let mut warnings = Vec::new();
        let mut rows: Vec<(Polarization, &ThresholdEntry)> = Vec::new();

        for entry in entries {
            let polarization = match entry.polarization.parse::<Polarization>() {
                Ok(p) => p,
                Err(_) => {
                    warnings.push(ConfigurationWarning::new(
                        "thresholds",
                        format!("dropped unsupported polarization entry {}", entry),
                    ));
                    continue;
                }
            };

            if rows.iter().any(|(p, _)| *p == polarization) {
                warnings.push(ConfigurationWarning::new(
                    "thresholds",
                    format!("dropped duplicate entry {}; the first {} entry is kept", entry, polarization),
                ));
                continue;
            }

            rows.push((polarization, entry));
        }

        let mut set = ThresholdSet::default();
        for polarization in selected {
            match rows.iter().find(|(p, _)| p == polarization) {
                Some((_, entry)) => {
                    set.insert(*polarization, entry.validate()?);
                }
                None => {
                    let range = default_range(*polarization);
                    warnings.push(ConfigurationWarning::new(
                        format!("thresholds.{}", polarization),
                        format!(
                            "no threshold supplied for selected {} image; using default {}..{}",
                            polarization, range.min, range.max
                        ),
                    ));
                    set.insert(*polarization, range);
                }
            }
        }

        for (polarization, entry) in &rows {
            if !selected.contains(polarization) {
                tracing::debug!(entry = %entry, "Threshold entry has no selected image");
            }
        }

        Ok((set, warnings))
    }
}

/// Validate every parseable row up front, before any stage runs
pub fn validate_entries(entries: &[ThresholdEntry]) -> Result<()> {
    for entry in entries {
        if entry.polarization.parse::<Polarization>().is_ok() {
            entry.validate()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults_per_polarization() {
        let set = ThresholdSet::defaults();
        assert_eq!(set.get(Polarization::HH), Some(ThresholdRange { min: 10, max: 12 }));
        assert_eq!(set.get(Polarization::HV), Some(ThresholdRange { min: 4, max: 6 }));
        assert_eq!(set.get(Polarization::VV), Some(ThresholdRange { min: 4, max: 6 }));
        assert_eq!(set.get(Polarization::VH), Some(ThresholdRange { min: 10, max: 12 }));
    }

    #[test]
    fn test_parse_entry() {
        let entry: ThresholdEntry = "HH:10:12".parse().unwrap();
        assert_eq!(entry, ThresholdEntry::new("HH", 10, 12));
        assert!("HH:10".parse::<ThresholdEntry>().is_err());
        assert!("HH:a:12".parse::<ThresholdEntry>().is_err());
    }

    #[test]
    fn test_reconcile_drops_unsupported_and_duplicates() {
        let entries = vec![
            ThresholdEntry::new("HH", 8, 9),
            ThresholdEntry::new("XY", 1, 2),
            ThresholdEntry::new("HH", 20, 30),
        ];

        let (set, warnings) = ThresholdSet::reconcile(&entries, &[Polarization::HH]).unwrap();

        assert_eq!(set.get(Polarization::HH), Some(ThresholdRange { min: 8, max: 9 }));
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].message.contains("unsupported"));
        assert!(warnings[1].message.contains("duplicate"));
    }

    #[test]
    fn test_reconcile_inserts_defaults_and_drops_unselected() {
        let entries = vec![ThresholdEntry::new("VV", 3, 5)];

        let (set, warnings) =
            ThresholdSet::reconcile(&entries, &[Polarization::HH, Polarization::HV]).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(Polarization::HH), Some(default_range(Polarization::HH)));
        assert_eq!(set.get(Polarization::HV), Some(default_range(Polarization::HV)));
        assert_eq!(set.get(Polarization::VV), None);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_min_greater_than_max_is_fatal() {
        let entries = vec![ThresholdEntry::new("HH", 12, 10)];
        let err = ThresholdSet::reconcile(&entries, &[Polarization::HH]).unwrap_err();
        assert!(matches!(err, FloodError::Validation { .. }));
        assert!(validate_entries(&entries).is_err());
    }

    #[test]
    fn test_negative_and_missing_values_are_fatal() {
        assert!(ThresholdEntry::new("HH", -1, 10).validate().is_err());
        let missing = ThresholdEntry { polarization: "HV".into(), min: Some(4), max: None };
        assert!(missing.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_range_sweep_count(min in 0u32..200, span in 0u32..50) {
            let range = ThresholdRange::new(min, min + span).unwrap();
            prop_assert_eq!(range.values().count(), (span + 1) as usize);
            prop_assert_eq!(range.len(), (span + 1) as usize);
        }
    }
}
