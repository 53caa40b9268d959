//! Chat command grammar.
//!
//! ```text
//! help | 說明 | 幫助
//! status | 狀態
//! stop | 停止
//! [<url>] <checkin YYYY-MM-DD> <checkout YYYY-MM-DD> [occupancy] [room type…]
//! ```

use crate::error::ValidationError;
use crate::types::{parse_date, Occupancy, SearchParams, Target};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    Stop,
    Watch(WatchCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchCommand {
    /// `None` falls back to the configured default target.
    pub target: Option<Target>,
    pub params: SearchParams,
    pub room_type: Option<String>,
}

impl Command {
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let text = text.trim();
        match text.to_lowercase().as_str() {
            "help" | "說明" | "幫助" => return Ok(Command::Help),
            "status" | "狀態" => return Ok(Command::Status),
            "stop" | "停止" => return Ok(Command::Stop),
            _ => {}
        }

        let mut tokens = text.split_whitespace().peekable();
        let target = match tokens.peek() {
            Some(t) if looks_like_url(t) => {
                let url = tokens.next().unwrap_or_default();
                Some(Target::new(url)?)
            }
            _ => None,
        };

        let (Some(checkin), Some(checkout)) = (tokens.next(), tokens.next()) else {
            return Err(ValidationError::MissingDates);
        };
        let checkin = parse_date(checkin)?;
        let checkout = parse_date(checkout)?;
        let occupancy = match tokens.next() {
            Some(raw) => Occupancy::parse(raw)?,
            None => Occupancy::default(),
        };
        let params = SearchParams::new(checkin, checkout, occupancy)?;

        let rest = tokens.collect::<Vec<_>>().join(" ");
        Ok(Command::Watch(WatchCommand {
            target,
            params,
            room_type: (!rest.is_empty()).then_some(rest),
        }))
    }
}

fn looks_like_url(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
