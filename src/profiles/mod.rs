//! # Plant Profiles
//!
//! A profile is a named set of acceptable environmental ranges. Profiles live
//! in a [`ProfileList`] that tracks which one is active; the list is loaded
//! from and saved to a [`ProfileStore`].
//!
//! ## File Format
//!
//! [`JsonProfileStore`] keeps profiles in a JSON document:
//!
//! ```json
//! {
//!   "plants": [
//!     { "name": "Basil", "temperature_low": 18, "temperature_high": 27,
//!       "humidity_low": 40, "humidity_high": 60,
//!       "moisture_low": 350, "moisture_high": 700, "air_quality_score_min": 1 }
//!   ]
//! }
//! ```
//!
//! `moisture_low`, `moisture_high` and `air_quality_score_min` are optional
//! and default to 0, 1000 and 0.

use crate::error::MonitorError;
use crate::validation::{secure_json_parse, validate_plant_name, validate_profile, MAX_PROFILE_FILE_BYTES};
use fs2::FileExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_MOISTURE_LOW: f64 = 0.0;
pub const DEFAULT_MOISTURE_HIGH: f64 = 1000.0;
pub const DEFAULT_AIR_QUALITY_MIN: f64 = 0.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantProfile {
    pub name: String,
    pub temperature_low: f64,
    pub temperature_high: f64,
    pub humidity_low: f64,
    pub humidity_high: f64,
    /// Defaults to [`DEFAULT_MOISTURE_LOW`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moisture_low: Option<f64>,
    /// Defaults to [`DEFAULT_MOISTURE_HIGH`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moisture_high: Option<f64>,
    /// Defaults to [`DEFAULT_AIR_QUALITY_MIN`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_quality_score_min: Option<f64>,
}

impl PlantProfile {
    /// Profile with temperature and humidity ranges; the rest use defaults.
    pub fn new(name: &str, temperature: (f64, f64), humidity: (f64, f64)) -> Self {
        Self {
            name: name.to_string(),
            temperature_low: temperature.0,
            temperature_high: temperature.1,
            humidity_low: humidity.0,
            humidity_high: humidity.1,
            moisture_low: None,
            moisture_high: None,
            air_quality_score_min: None,
        }
    }

    pub fn with_moisture(mut self, low: f64, high: f64) -> Self {
        self.moisture_low = Some(low);
        self.moisture_high = Some(high);
        self
    }

    pub fn with_air_quality_min(mut self, min: f64) -> Self {
        self.air_quality_score_min = Some(min);
        self
    }

    pub fn moisture_low(&self) -> f64 {
        self.moisture_low.unwrap_or(DEFAULT_MOISTURE_LOW)
    }

    pub fn moisture_high(&self) -> f64 {
        self.moisture_high.unwrap_or(DEFAULT_MOISTURE_HIGH)
    }

    pub fn air_quality_score_min(&self) -> f64 {
        self.air_quality_score_min.unwrap_or(DEFAULT_AIR_QUALITY_MIN)
    }
}

/// Persistence seam for the profile list.
pub trait ProfileStore {
    fn load(&mut self) -> Result<Vec<PlantProfile>, MonitorError>;
    fn save(&mut self, profiles: &[PlantProfile]) -> Result<(), MonitorError>;
}

/// Profiles plus the active-profile cursor.
///
/// `current` is `Some(i)` with `i < len` whenever the list is non-empty and
/// `None` exactly when it is empty.
#[derive(Debug, Clone, Default)]
pub struct ProfileList {
    profiles: Vec<PlantProfile>,
    current: Option<usize>,
}

impl ProfileList {
    pub fn new(profiles: Vec<PlantProfile>) -> Self {
        let current = if profiles.is_empty() { None } else { Some(0) };
        Self { profiles, current }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn as_slice(&self) -> &[PlantProfile] {
        &self.profiles
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&PlantProfile> {
        self.current.and_then(|i| self.profiles.get(i))
    }

    pub fn select(&mut self, index: usize) -> Result<&PlantProfile, MonitorError> {
        if index >= self.profiles.len() {
            return Err(MonitorError::Profile(format!(
                "no profile at index {} ({} loaded)",
                index,
                self.profiles.len()
            )));
        }
        self.current = Some(index);
        Ok(&self.profiles[index])
    }

    /// Append a validated profile and make it active.
    pub fn add(&mut self, mut profile: PlantProfile) -> Result<&PlantProfile, MonitorError> {
        let name =
            validate_plant_name(&profile.name).map_err(|e| MonitorError::Profile(e.to_string()))?;
        profile.name = name;
        validate_profile(&profile).map_err(|e| MonitorError::Profile(e.to_string()))?;
        if self
            .profiles
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(&profile.name))
        {
            return Err(MonitorError::Profile(format!(
                "a profile named '{}' already exists",
                profile.name
            )));
        }
        self.profiles.push(profile);
        let idx = self.profiles.len() - 1;
        self.current = Some(idx);
        Ok(&self.profiles[idx])
    }

    /// Remove the active profile. The cursor stays at the same position,
    /// clamped to the new end of the list.
    pub fn remove_current(&mut self) -> Result<PlantProfile, MonitorError> {
        let Some(idx) = self.current else {
            return Err(MonitorError::Profile("no profiles to remove".to_string()));
        };
        let removed = self.profiles.remove(idx);
        self.current = if self.profiles.is_empty() {
            None
        } else {
            Some(idx.min(self.profiles.len() - 1))
        };
        Ok(removed)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ProfileDocument {
    #[serde(default)]
    plants: Vec<PlantProfile>,
}

/// JSON file store with locked, atomic writes.
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_locked(&self, content: &str) -> std::io::Result<()> {
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.path)?;
        lock_file.lock_exclusive()?;

        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let base = self
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("plants.json");
        replace_via_temp(&dir, base, &self.path, content)?;
        drop(lock_file);
        Ok(())
    }
}

/// Write `content` to a fresh temp file in `dir` and rename it over `target`.
/// The temp file is removed again if any step fails.
fn replace_via_temp(dir: &Path, base: &str, target: &Path, content: &str) -> std::io::Result<()> {
    let mut counter = 0u32;
    let (tmp_path, mut tmp) = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => break (candidate, file),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
            }
            Err(e) => return Err(e),
        }
    };
    let written = tmp
        .write_all(content.as_bytes())
        .and_then(|()| tmp.flush())
        .and_then(|()| {
            let _ = tmp.sync_all();
            drop(tmp);
            fs::rename(&tmp_path, target)
        });
    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(&tmp_path) {
            warn!("Could not remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(e);
    }
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }
    Ok(())
}

impl ProfileStore for JsonProfileStore {
    fn load(&mut self) -> Result<Vec<PlantProfile>, MonitorError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "Profile file {} not found; starting with no profiles",
                    self.path.display()
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(MonitorError::Store(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        let doc: ProfileDocument = secure_json_parse(&content, MAX_PROFILE_FILE_BYTES)
            .map_err(|e| MonitorError::Store(format!("{}: {}", self.path.display(), e)))?;
        let mut plants = Vec::with_capacity(doc.plants.len());
        for plant in doc.plants {
            match validate_profile(&plant) {
                Ok(()) => plants.push(plant),
                Err(e) => warn!("Skipping stored profile '{}': {}", plant.name, e),
            }
        }
        info!(
            "Loaded {} plant profiles from {}",
            plants.len(),
            self.path.display()
        );
        Ok(plants)
    }

    fn save(&mut self, profiles: &[PlantProfile]) -> Result<(), MonitorError> {
        let doc = ProfileDocument {
            plants: profiles.to_vec(),
        };
        let content = serde_json::to_string_pretty(&doc)
            .map_err(|e| MonitorError::Store(format!("failed to serialize profiles: {}", e)))?;
        self.write_locked(&content).map_err(|e| {
            MonitorError::Store(format!("failed to write {}: {}", self.path.display(), e))
        })?;
        debug!("Saved {} profiles to {}", profiles.len(), self.path.display());
        Ok(())
    }
}

/// Starter profiles written by `plantmon init`.
pub fn starter_profiles() -> Vec<PlantProfile> {
    vec![
        PlantProfile::new("Basil", (18.0, 27.0), (40.0, 60.0))
            .with_moisture(350.0, 700.0)
            .with_air_quality_min(1.0),
        PlantProfile::new("Fern", (16.0, 24.0), (50.0, 80.0)).with_moisture(450.0, 850.0),
        PlantProfile::new("Snake Plant", (15.0, 30.0), (30.0, 50.0))
            .with_moisture(150.0, 450.0)
            .with_air_quality_min(0.0),
        PlantProfile::new("Tomato", (20.0, 29.0), (50.0, 70.0))
            .with_moisture(400.0, 800.0)
            .with_air_quality_min(2.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_files_in(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.contains(".tmp-"))
            .collect()
    }

    #[test]
    fn failed_replace_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory cannot be replaced by a file rename.
        let target = dir.path().join("plants.json");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        let err = replace_via_temp(dir.path(), "plants.json", &target, "{}");
        assert!(err.is_err());
        assert!(temp_files_in(dir.path()).is_empty());
        assert!(target.is_dir());
    }

    #[test]
    fn replace_writes_target_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("plants.json");
        fs::write(&target, "old").unwrap();
        replace_via_temp(dir.path(), "plants.json", &target, "new").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        assert!(temp_files_in(dir.path()).is_empty());
    }

    fn list() -> ProfileList {
        ProfileList::new(starter_profiles())
    }

    #[test]
    fn empty_list_has_no_cursor() {
        let l = ProfileList::new(Vec::new());
        assert_eq!(l.current_index(), None);
        assert!(l.current().is_none());
    }

    #[test]
    fn non_empty_list_starts_at_first() {
        assert_eq!(list().current_index(), Some(0));
    }

    #[test]
    fn add_makes_new_profile_current() {
        let mut l = list();
        l.add(PlantProfile::new("  Mint ", (15.0, 25.0), (40.0, 70.0)))
            .unwrap();
        assert_eq!(l.current_index(), Some(4));
        assert_eq!(l.current().unwrap().name, "Mint");
    }

    #[test]
    fn add_rejects_duplicates_and_bad_ranges() {
        let mut l = list();
        assert!(l
            .add(PlantProfile::new("basil", (18.0, 27.0), (40.0, 60.0)))
            .is_err());
        assert!(l
            .add(PlantProfile::new("Cactus", (35.0, 20.0), (10.0, 30.0)))
            .is_err());
        assert_eq!(l.len(), 4);
    }

    #[test]
    fn remove_clamps_cursor() {
        let mut l = list();
        l.select(3).unwrap();
        let removed = l.remove_current().unwrap();
        assert_eq!(removed.name, "Tomato");
        assert_eq!(l.current_index(), Some(2));
        l.select(0).unwrap();
        l.remove_current().unwrap();
        assert_eq!(l.current_index(), Some(0));
        assert_eq!(l.current().unwrap().name, "Fern");
    }

    #[test]
    fn removing_last_profile_clears_cursor() {
        let mut l = ProfileList::new(vec![PlantProfile::new("Solo", (1.0, 2.0), (3.0, 4.0))]);
        l.remove_current().unwrap();
        assert!(l.is_empty());
        assert_eq!(l.current_index(), None);
        assert!(l.remove_current().is_err());
    }

    #[test]
    fn select_out_of_range_keeps_cursor() {
        let mut l = list();
        l.select(1).unwrap();
        assert!(l.select(9).is_err());
        assert_eq!(l.current_index(), Some(1));
    }

    #[test]
    fn optional_fields_default() {
        let p: PlantProfile = serde_json::from_str(
            r#"{"name":"Ivy","temperature_low":10,"temperature_high":25,"humidity_low":30,"humidity_high":70}"#,
        )
        .unwrap();
        assert_eq!(p.moisture_low(), 0.0);
        assert_eq!(p.moisture_high(), 1000.0);
        assert_eq!(p.air_quality_score_min(), 0.0);
    }
}
