//! Normal-mode line classification.
//!
//! A telemetry line carries 14 comma-separated fields:
//!
//! ```text
//! temp,humidity,moisture,airQuality,tempAvg,humidityAvg,moistureAvg,
//! tempTooHigh,tempTooLow,humidityTooLow,humidityTooHigh,soilTooDry,soilTooWet,airQualityIssue
//! ```
//!
//! Anything that does not parse is noise. Noise is expected on this link
//! (boot banners, debug prints) and is dropped without an error.
use super::{BULK_PREFIX, HANDSHAKE_LINE, RESET_ACK_LINE};
use log::trace;

pub const TELEMETRY_FIELDS: usize = 14;

/// Highest air-quality score the board reports.
pub const MAX_AIR_QUALITY: u8 = 3;

/// Alarm flags computed on the board against the thresholds it was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlarmFlags {
    pub temp_too_high: bool,
    pub temp_too_low: bool,
    pub humidity_too_low: bool,
    pub humidity_too_high: bool,
    pub soil_too_dry: bool,
    pub soil_too_wet: bool,
    pub air_quality_issue: bool,
}

impl AlarmFlags {
    pub fn any(&self) -> bool {
        self.temp_too_high
            || self.temp_too_low
            || self.humidity_too_low
            || self.humidity_too_high
            || self.soil_too_dry
            || self.soil_too_wet
            || self.air_quality_issue
    }

    /// Short names of the raised flags, in wire order.
    pub fn raised(&self) -> Vec<&'static str> {
        let table = [
            (self.temp_too_high, "temp high"),
            (self.temp_too_low, "temp low"),
            (self.humidity_too_low, "humidity low"),
            (self.humidity_too_high, "humidity high"),
            (self.soil_too_dry, "soil dry"),
            (self.soil_too_wet, "soil wet"),
            (self.air_quality_issue, "air quality"),
        ];
        table
            .into_iter()
            .filter_map(|(set, name)| set.then_some(name))
            .collect()
    }
}

/// One parsed telemetry line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryRecord {
    pub temperature: f64,
    pub humidity: f64,
    pub moisture: f64,
    pub air_quality: u8,
    pub temp_avg: f64,
    pub humidity_avg: f64,
    pub moisture_avg: f64,
    pub alarms: AlarmFlags,
}

/// Classification of a line received in Normal mode.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalLine {
    Handshake,
    ResetAck,
    Telemetry(TelemetryRecord),
    /// Bulk-protocol traffic seen outside a collection window.
    StrayBulk,
    Noise,
}

/// Classify one framed line. Rules are applied in order: handshake,
/// reset acknowledgement, bulk-looking traffic, then the 14-field record.
pub fn classify(line: &str) -> NormalLine {
    if line == HANDSHAKE_LINE {
        return NormalLine::Handshake;
    }
    if line == RESET_ACK_LINE {
        return NormalLine::ResetAck;
    }
    if line.starts_with('[') || line.contains("NaN") || line.starts_with(BULK_PREFIX) {
        return NormalLine::StrayBulk;
    }
    match parse_record(line) {
        Some(record) => NormalLine::Telemetry(record),
        None => {
            trace!("Dropping non-telemetry line");
            NormalLine::Noise
        }
    }
}

/// Parse the 14-field record. `None` on field-count or value mismatch.
pub fn parse_record(line: &str) -> Option<TelemetryRecord> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != TELEMETRY_FIELDS {
        return None;
    }
    let num = |i: usize| fields[i].parse::<f64>().ok().filter(|v| v.is_finite());
    let flag = |i: usize| parse_flag(fields[i]);

    let air_quality = fields[3].parse::<u8>().ok()?;
    if air_quality > MAX_AIR_QUALITY {
        return None;
    }
    Some(TelemetryRecord {
        temperature: num(0)?,
        humidity: num(1)?,
        moisture: num(2)?,
        air_quality,
        temp_avg: num(4)?,
        humidity_avg: num(5)?,
        moisture_avg: num(6)?,
        alarms: AlarmFlags {
            temp_too_high: flag(7)?,
            temp_too_low: flag(8)?,
            humidity_too_low: flag(9)?,
            humidity_too_high: flag(10)?,
            soil_too_dry: flag(11)?,
            soil_too_wet: flag(12)?,
            air_quality_issue: flag(13)?,
        },
    })
}

fn parse_flag(field: &str) -> Option<bool> {
    match field {
        "0" => Some(false),
        "1" => Some(true),
        f if f.eq_ignore_ascii_case("true") => Some(true),
        f if f.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Display label for an air-quality score.
pub fn air_quality_label(score: u8) -> &'static str {
    match score {
        3 => "Excellent",
        2 => "Good",
        1 => "Fair",
        0 => "Poor",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "22.5,48.0,512,2,22.1,47.5,505.5,0,0,0,0,0,1,0";

    #[test]
    fn parses_full_record() {
        let NormalLine::Telemetry(r) = classify(SAMPLE) else {
            panic!("expected telemetry");
        };
        assert_eq!(r.temperature, 22.5);
        assert_eq!(r.humidity, 48.0);
        assert_eq!(r.moisture, 512.0);
        assert_eq!(r.air_quality, 2);
        assert_eq!(r.moisture_avg, 505.5);
        assert!(r.alarms.soil_too_wet);
        assert!(!r.alarms.soil_too_dry);
        assert_eq!(r.alarms.raised(), vec!["soil wet"]);
    }

    #[test]
    fn control_lines_win_over_parsing() {
        assert_eq!(classify("Sensor ready."), NormalLine::Handshake);
        assert_eq!(classify("Reset data"), NormalLine::ResetAck);
    }

    #[test]
    fn bulk_shaped_lines_never_become_telemetry() {
        assert_eq!(classify("d,1,2,3,4,5,6,7,8,9,10,11,12,13"), NormalLine::StrayBulk);
        assert_eq!(classify("[1.0, 2.0]"), NormalLine::StrayBulk);
        assert_eq!(
            classify("22.5,NaN,512,2,22.1,47.5,505.5,0,0,0,0,0,1,0"),
            NormalLine::StrayBulk
        );
    }

    #[test]
    fn wrong_field_count_is_noise() {
        let short = "22.5,48.0,512,2,22.1,47.5,505.5,0,0,0,0,0,1";
        let long = format!("{SAMPLE},0");
        assert_eq!(classify(short), NormalLine::Noise);
        assert_eq!(classify(&long), NormalLine::Noise);
    }

    #[test]
    fn bad_values_are_noise() {
        assert_eq!(
            classify("warm,48.0,512,2,22.1,47.5,505.5,0,0,0,0,0,1,0"),
            NormalLine::Noise
        );
        assert_eq!(
            classify("22.5,48.0,512,7,22.1,47.5,505.5,0,0,0,0,0,1,0"),
            NormalLine::Noise
        );
        assert_eq!(
            classify("22.5,48.0,512,2,22.1,47.5,505.5,0,0,2,0,0,1,0"),
            NormalLine::Noise
        );
    }

    #[test]
    fn flags_accept_words() {
        let r = parse_record("20,40,300,1,20,40,300,true,FALSE,0,0,0,0,1").unwrap();
        assert!(r.alarms.temp_too_high);
        assert!(!r.alarms.temp_too_low);
        assert!(r.alarms.air_quality_issue);
    }

    #[test]
    fn parsing_is_deterministic() {
        assert_eq!(parse_record(SAMPLE), parse_record(SAMPLE));
    }

    #[test]
    fn labels() {
        assert_eq!(air_quality_label(3), "Excellent");
        assert_eq!(air_quality_label(0), "Poor");
        assert_eq!(air_quality_label(9), "Unknown");
    }
}
