//! Threshold line sent to the board.
//!
//! Seven fields in fixed order, newline-terminated:
//! `tLow,tHigh,hLow,hHigh,aqMin,mLow,mHigh`. The board recomputes its alarm
//! flags against these values.
use crate::profiles::PlantProfile;

/// Encode a profile's thresholds, without the trailing newline.
pub fn encode(profile: &PlantProfile) -> String {
    [
        profile.temperature_low,
        profile.temperature_high,
        profile.humidity_low,
        profile.humidity_high,
        profile.air_quality_score_min(),
        profile.moisture_low(),
        profile.moisture_high(),
    ]
    .iter()
    .map(|v| v.to_string())
    .collect::<Vec<_>>()
    .join(",")
}
