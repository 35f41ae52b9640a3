//! Console command parser for the `monitor` loop.
//!
//! One line of user input becomes one [`ConsoleCommand`]. Keywords are
//! case-insensitive; profile numbers are 1-based as printed by `profiles`.
use crate::profiles::PlantProfile;
use log::trace;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Help,
    Analyze,
    Reset,
    Profiles,
    /// Zero-based index.
    SelectProfile(usize),
    AddProfile(PlantProfile),
    RemoveProfile,
    Send(String),
    Connect,
    Disconnect,
    Status,
    Quit,
    Empty,
    Unknown(String),
    Invalid(String),
}

pub const HELP_TEXT: &str = "\
Commands:
  analyze                     request bulk data and match plant profiles
  reset                       ask the board to clear its history
  profiles                    list plant profiles
  profile <n>                 make profile n active
  add <name> <tLo> <tHi> <hLo> <hHi> [mLo mHi aqMin]
  remove                      delete the active profile
  send <text>                 write a raw line to the board
  connect | disconnect        open or close the serial port
  status                      connection and counter summary
  quit";

#[derive(Debug, Default)]
pub struct CommandParser;

impl CommandParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, raw: &str) -> ConsoleCommand {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ConsoleCommand::Empty;
        }
        let (word, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (trimmed, ""),
        };
        let cmd = match word.to_ascii_lowercase().as_str() {
            "help" | "?" => ConsoleCommand::Help,
            "analyze" | "a" => ConsoleCommand::Analyze,
            "reset" => ConsoleCommand::Reset,
            "profiles" | "list" => ConsoleCommand::Profiles,
            "profile" | "p" => parse_select(rest),
            "add" => parse_add(rest),
            "remove" | "rm" => ConsoleCommand::RemoveProfile,
            "send" => {
                if rest.is_empty() {
                    ConsoleCommand::Invalid("Text required".into())
                } else {
                    ConsoleCommand::Send(rest.to_string())
                }
            }
            "connect" => ConsoleCommand::Connect,
            "disconnect" => ConsoleCommand::Disconnect,
            "status" => ConsoleCommand::Status,
            "quit" | "exit" | "q" => ConsoleCommand::Quit,
            _ => ConsoleCommand::Unknown(word.to_string()),
        };
        trace!("Parsed {:?} from '{}'", cmd, raw);
        cmd
    }
}

fn parse_select(rest: &str) -> ConsoleCommand {
    match rest.parse::<usize>() {
        Ok(n) if n >= 1 => ConsoleCommand::SelectProfile(n - 1),
        _ => ConsoleCommand::Invalid("Profile number required (see 'profiles')".into()),
    }
}

/// The name may contain spaces; the trailing 4 or 7 numeric tokens are ranges.
fn parse_add(rest: &str) -> ConsoleCommand {
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    let numeric = tokens
        .iter()
        .rev()
        .take_while(|t| t.parse::<f64>().is_ok())
        .count();
    let numbers_used = match numeric {
        n if n >= 7 => 7,
        4 => 4,
        _ => return ConsoleCommand::Invalid(
            "Usage: add <name> <tLo> <tHi> <hLo> <hHi> [mLo mHi aqMin]".into(),
        ),
    };
    let split = tokens.len() - numbers_used;
    if split == 0 {
        return ConsoleCommand::Invalid("Plant name required".into());
    }
    let name = tokens[..split].join(" ");
    let nums: Vec<f64> = tokens[split..]
        .iter()
        .filter_map(|t| t.parse::<f64>().ok())
        .collect();
    let mut profile = PlantProfile::new(&name, (nums[0], nums[1]), (nums[2], nums[3]));
    if numbers_used == 7 {
        profile = profile.with_moisture(nums[4], nums[5]).with_air_quality_min(nums[6]);
    }
    ConsoleCommand::AddProfile(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_case_insensitive() {
        let p = CommandParser::new();
        assert_eq!(p.parse("ANALYZE"), ConsoleCommand::Analyze);
        assert_eq!(p.parse("  Reset "), ConsoleCommand::Reset);
        assert_eq!(p.parse(""), ConsoleCommand::Empty);
        assert_eq!(p.parse("frobnicate"), ConsoleCommand::Unknown("frobnicate".into()));
    }

    #[test]
    fn profile_numbers_are_one_based() {
        let p = CommandParser::new();
        assert_eq!(p.parse("profile 2"), ConsoleCommand::SelectProfile(1));
        assert!(matches!(p.parse("profile 0"), ConsoleCommand::Invalid(_)));
        assert!(matches!(p.parse("profile"), ConsoleCommand::Invalid(_)));
    }

    #[test]
    fn add_with_short_form() {
        let p = CommandParser::new();
        let ConsoleCommand::AddProfile(profile) = p.parse("add Peace Lily 18 27 40 70") else {
            panic!("expected add");
        };
        assert_eq!(profile.name, "Peace Lily");
        assert_eq!(profile.temperature_high, 27.0);
        assert_eq!(profile.moisture_low, None);
    }

    #[test]
    fn add_with_full_form() {
        let p = CommandParser::new();
        let ConsoleCommand::AddProfile(profile) = p.parse("add Basil 18 25 40 60 300 700 1") else {
            panic!("expected add");
        };
        assert_eq!(profile.moisture_low, Some(300.0));
        assert_eq!(profile.moisture_high, Some(700.0));
        assert_eq!(profile.air_quality_score_min, Some(1.0));
    }

    #[test]
    fn add_requires_name_and_ranges() {
        let p = CommandParser::new();
        assert!(matches!(p.parse("add 18 25 40 60"), ConsoleCommand::Invalid(_)));
        assert!(matches!(p.parse("add Basil 18 25"), ConsoleCommand::Invalid(_)));
        assert!(matches!(p.parse("add Basil 18 25 40 60 300 700"), ConsoleCommand::Invalid(_)));
    }

    #[test]
    fn send_keeps_text_verbatim() {
        let p = CommandParser::new();
        assert_eq!(p.parse("send hello, board"), ConsoleCommand::Send("hello, board".into()));
        assert!(matches!(p.parse("send"), ConsoleCommand::Invalid(_)));
    }
}
