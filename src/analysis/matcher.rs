//! Plant profile scoring.
//!
//! Each profile earns one point per criterion the aggregate reading meets
//! (temperature, humidity, moisture, air quality), bounds inclusive.
use crate::profiles::PlantProfile;
use std::cmp::Ordering;

pub const MAX_SCORE: u8 = 4;
/// Closest matches reported when no profile scores [`MAX_SCORE`].
pub const CLOSEST_COUNT: usize = 3;

/// Aggregate reading a profile is scored against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub temperature: f64,
    pub humidity: f64,
    pub moisture: f64,
    /// Rounded latched air-quality score.
    pub air_quality: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub plant_name: String,
    pub score: u8,
    pub met_temp: bool,
    pub met_hum: bool,
    pub met_moist: bool,
    pub met_aq: bool,
    /// Human-readable description of each failed criterion.
    pub unmet: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Every profile that met all four criteria, in declaration order.
    Suitable(Vec<String>),
    /// Best partial matches, score descending then name ascending.
    Closest(Vec<MatchResult>),
}

fn within(value: f64, low: f64, high: f64) -> bool {
    low <= value && value <= high
}

pub fn score(profile: &PlantProfile, agg: &Aggregate) -> MatchResult {
    let met_temp = within(agg.temperature, profile.temperature_low, profile.temperature_high);
    let met_hum = within(agg.humidity, profile.humidity_low, profile.humidity_high);
    let met_moist = within(agg.moisture, profile.moisture_low(), profile.moisture_high());
    let met_aq = agg.air_quality >= profile.air_quality_score_min();

    let mut unmet = Vec::new();
    if !met_temp {
        unmet.push(format!(
            "temperature {:.1} outside {}-{}",
            agg.temperature, profile.temperature_low, profile.temperature_high
        ));
    }
    if !met_hum {
        unmet.push(format!(
            "humidity {:.1} outside {}-{}",
            agg.humidity, profile.humidity_low, profile.humidity_high
        ));
    }
    if !met_moist {
        unmet.push(format!(
            "moisture {:.1} outside {}-{}",
            agg.moisture,
            profile.moisture_low(),
            profile.moisture_high()
        ));
    }
    if !met_aq {
        unmet.push(format!(
            "air quality {} below minimum {}",
            agg.air_quality,
            profile.air_quality_score_min()
        ));
    }

    let score = [met_temp, met_hum, met_moist, met_aq]
        .iter()
        .filter(|m| **m)
        .count() as u8;
    MatchResult {
        plant_name: profile.name.clone(),
        score,
        met_temp,
        met_hum,
        met_moist,
        met_aq,
        unmet,
    }
}

/// Score every profile and apply the result policy.
pub fn match_profiles(profiles: &[PlantProfile], agg: &Aggregate) -> MatchOutcome {
    let mut results: Vec<MatchResult> = profiles.iter().map(|p| score(p, agg)).collect();

    let suitable: Vec<String> = results
        .iter()
        .filter(|r| r.score == MAX_SCORE)
        .map(|r| r.plant_name.clone())
        .collect();
    if !suitable.is_empty() {
        return MatchOutcome::Suitable(suitable);
    }

    results.sort_by(|a, b| match b.score.cmp(&a.score) {
        Ordering::Equal => a.plant_name.cmp(&b.plant_name),
        other => other,
    });
    results.truncate(CLOSEST_COUNT);
    MatchOutcome::Closest(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> PlantProfile {
        PlantProfile::new("Basil", (18.0, 25.0), (40.0, 60.0))
            .with_moisture(300.0, 700.0)
            .with_air_quality_min(1.0)
    }

    fn agg(temperature: f64) -> Aggregate {
        Aggregate {
            temperature,
            humidity: 50.0,
            moisture: 500.0,
            air_quality: 2.0,
        }
    }

    #[test]
    fn all_criteria_met_scores_four() {
        let r = score(&reference(), &agg(22.0));
        assert_eq!(r.score, 4);
        assert!(r.unmet.is_empty());
        assert_eq!(
            match_profiles(&[reference()], &agg(22.0)),
            MatchOutcome::Suitable(vec!["Basil".to_string()])
        );
    }

    #[test]
    fn hot_reading_drops_temperature_point() {
        let r = score(&reference(), &agg(30.0));
        assert_eq!(r.score, 3);
        assert!(!r.met_temp);
        assert!(r.met_hum && r.met_moist && r.met_aq);
        assert_eq!(r.unmet, vec!["temperature 30.0 outside 18-25"]);
    }

    #[test]
    fn bounds_are_inclusive() {
        let p = reference();
        let edge = Aggregate {
            temperature: 25.0,
            humidity: 40.0,
            moisture: 700.0,
            air_quality: 1.0,
        };
        assert_eq!(score(&p, &edge).score, 4);
    }

    #[test]
    fn closest_ties_break_by_name() {
        let zinnia = PlantProfile::new("Zinnia", (18.0, 25.0), (40.0, 60.0));
        let aloe = PlantProfile::new("Aloe", (18.0, 25.0), (40.0, 60.0));
        let cold = PlantProfile::new("Moss", (0.0, 5.0), (90.0, 100.0));
        let fig = PlantProfile::new("Fig", (10.0, 20.0), (40.0, 60.0));
        // At 30C: Zinnia and Aloe score 3, Fig scores 3, Moss scores 2.
        let outcome = match_profiles(&[zinnia, cold, aloe, fig], &agg(30.0));
        let MatchOutcome::Closest(results) = outcome else {
            panic!("expected closest matches");
        };
        let names: Vec<&str> = results.iter().map(|r| r.plant_name.as_str()).collect();
        assert_eq!(names, vec!["Aloe", "Fig", "Zinnia"]);
        assert!(results.iter().all(|r| r.score == 3));
    }

    #[test]
    fn suitable_keeps_declaration_order() {
        let b = PlantProfile::new("B", (0.0, 40.0), (0.0, 100.0));
        let a = PlantProfile::new("A", (0.0, 40.0), (0.0, 100.0));
        assert_eq!(
            match_profiles(&[b, a], &agg(22.0)),
            MatchOutcome::Suitable(vec!["B".to_string(), "A".to_string()])
        );
    }

    #[test]
    fn no_profiles_gives_empty_closest() {
        assert_eq!(
            match_profiles(&[], &agg(22.0)),
            MatchOutcome::Closest(Vec::new())
        );
    }
}
