//! Projection of Meetup RSVP notifications.
//!
//! Reads `group.group_city`, `group.group_lat`, `group.group_lon`,
//! `event.event_id`, `group.group_id` and `member.member_id` verbatim and
//! derives the date from `event.time`, a millisecond Unix timestamp given
//! either as a JSON integer or as a numeric string.
use anyhow::anyhow;
use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;

use super::Record;
use crate::error::ProjectionError;
use crate::source::events::RawEvent;

const DATE_FORMAT: &str = "%Y%m%d";

#[derive(Deserialize, Default, Debug)]
pub struct Settings {
    /// IANA zone used to derive the date (default: local time)
    pub timezone: Option<String>,
}

/// Zone the calendar date is computed in
#[derive(Debug, Clone, Copy)]
pub enum DateZone {
    Local,
    Fixed(Tz),
}

pub struct Projector {
    zone: DateZone,
}

pub fn new(settings: Settings) -> Result<Projector, anyhow::Error> {
    let zone = match settings.timezone {
        None => DateZone::Local,
        Some(name) => DateZone::Fixed(
            name.parse::<Tz>()
                .map_err(|e| anyhow!("unknown timezone {name}: {e}"))?,
        ),
    };
    Ok(Projector { zone })
}

impl Projector {
    pub fn with_zone(zone: DateZone) -> Projector {
        Projector { zone }
    }

    fn format_date(&self, secs: i64) -> Result<String, ProjectionError> {
        let utc: DateTime<Utc> =
            DateTime::from_timestamp(secs, 0).ok_or_else(|| ProjectionError::MalformedTimestamp {
                raw: secs.to_string(),
                reason: String::from("seconds out of range"),
            })?;
        Ok(match self.zone {
            DateZone::Local => utc.with_timezone(&Local).format(DATE_FORMAT).to_string(),
            DateZone::Fixed(tz) => utc.with_timezone(&tz).format(DATE_FORMAT).to_string(),
        })
    }
}

impl super::Projector for Projector {
    fn get_name(&self) -> String {
        String::from("rsvp")
    }

    fn project(&self, event: &RawEvent) -> Result<Record, ProjectionError> {
        let city = text(event, "group.group_city", &["group", "group_city"])?;
        let latitude = number(event, "group.group_lat", &["group", "group_lat"])?;
        let longitude = number(event, "group.group_lon", &["group", "group_lon"])?;
        let millis = timestamp_millis(lookup(event, "event.time", &["event", "time"])?)?;
        let event_id = identifier(event, "event.event_id", &["event", "event_id"])?;
        let group_id = identifier(event, "group.group_id", &["group", "group_id"])?;
        let member_id = identifier(event, "member.member_id", &["member", "member_id"])?;

        Ok(Record {
            city,
            latitude,
            longitude,
            // truncating division: the last three digits are dropped
            date: self.format_date(millis / 1000)?,
            event_id,
            group_id,
            member_id,
        })
    }
}

fn lookup<'a>(
    event: &'a RawEvent,
    path: &'static str,
    keys: &[&str],
) -> Result<&'a Value, ProjectionError> {
    let mut v = event;
    for key in keys {
        v = match v {
            Value::Object(map) => map.get(*key).ok_or(ProjectionError::MissingField(path))?,
            Value::Null => return Err(ProjectionError::MissingField(path)),
            _ => {
                return Err(ProjectionError::TypeMismatch {
                    path,
                    expected: "object",
                })
            }
        };
    }
    if v.is_null() {
        return Err(ProjectionError::MissingField(path));
    }
    Ok(v)
}

fn text(event: &RawEvent, path: &'static str, keys: &[&str]) -> Result<String, ProjectionError> {
    match lookup(event, path, keys)? {
        Value::String(s) => Ok(s.clone()),
        _ => Err(ProjectionError::TypeMismatch {
            path,
            expected: "string",
        }),
    }
}

fn number(event: &RawEvent, path: &'static str, keys: &[&str]) -> Result<f64, ProjectionError> {
    lookup(event, path, keys)?
        .as_f64()
        .ok_or(ProjectionError::TypeMismatch {
            path,
            expected: "number",
        })
}

// upstream sends ids both as strings and as numbers
fn identifier(
    event: &RawEvent,
    path: &'static str,
    keys: &[&str],
) -> Result<String, ProjectionError> {
    match lookup(event, path, keys)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ProjectionError::TypeMismatch {
            path,
            expected: "string or number",
        }),
    }
}

// values under 1000 have no whole-second part to keep and are rejected
fn timestamp_millis(v: &Value) -> Result<i64, ProjectionError> {
    let malformed = |reason: &str| ProjectionError::MalformedTimestamp {
        raw: v.to_string(),
        reason: reason.to_string(),
    };
    let millis = match v {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| malformed("not an integer number of milliseconds")),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| malformed(&e.to_string())),
        _ => Err(malformed("expected integer or numeric string")),
    }?;
    if millis < 1000 {
        return Err(malformed("less than one second after the epoch"));
    }
    Ok(millis)
}
