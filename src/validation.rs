//! Validation for user-entered plant profiles and profile files.

use crate::profiles::PlantProfile;

/// Longest accepted profile name, in characters.
pub const MAX_NAME_CHARS: usize = 40;

/// Largest profile file accepted by the JSON store.
pub const MAX_PROFILE_FILE_BYTES: usize = 256 * 1024;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Plant name cannot be empty")]
    EmptyName,

    #[error("Plant name is too long (maximum {max} characters)")]
    NameTooLong { max: usize },

    #[error("Plant name contains control characters")]
    ControlCharacters,

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("{field} range is inverted ({low} > {high})")]
    InvertedRange {
        field: &'static str,
        low: f64,
        high: f64,
    },

    #[error("Minimum air quality score must be between 0 and 3 (got {0})")]
    AirQualityOutOfRange(f64),

    #[error("Profile file exceeds {limit} bytes")]
    FileTooLarge { limit: usize },

    #[error("Profile file is not valid JSON: {0}")]
    InvalidFormat(String),
}

/// Trim and check a plant name. Returns the trimmed name.
pub fn validate_plant_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::NameTooLong {
            max: MAX_NAME_CHARS,
        });
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::ControlCharacters);
    }
    Ok(trimmed.to_string())
}

pub fn validate_range(field: &'static str, low: f64, high: f64) -> Result<(), ValidationError> {
    if !low.is_finite() || !high.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    if low > high {
        return Err(ValidationError::InvertedRange { field, low, high });
    }
    Ok(())
}

/// Check every range of a profile, with defaults applied to unset fields.
pub fn validate_profile(profile: &PlantProfile) -> Result<(), ValidationError> {
    validate_plant_name(&profile.name)?;
    validate_range(
        "Temperature",
        profile.temperature_low,
        profile.temperature_high,
    )?;
    validate_range("Humidity", profile.humidity_low, profile.humidity_high)?;
    validate_range("Moisture", profile.moisture_low(), profile.moisture_high())?;
    let aq = profile.air_quality_score_min();
    if !aq.is_finite() || !(0.0..=3.0).contains(&aq) {
        return Err(ValidationError::AirQualityOutOfRange(aq));
    }
    Ok(())
}

/// Parse JSON with a size cap. Leading NUL bytes from an interrupted write
/// are stripped first.
pub fn secure_json_parse<T>(content: &str, max_bytes: usize) -> Result<T, ValidationError>
where
    T: serde::de::DeserializeOwned,
{
    if content.len() > max_bytes {
        return Err(ValidationError::FileTooLarge { limit: max_bytes });
    }
    let normalized = content.trim_start_matches('\0');
    serde_json::from_str(normalized).map_err(|e| ValidationError::InvalidFormat(e.to_string()))
}
