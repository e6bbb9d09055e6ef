// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recurrence math for trigger firing
//!
//! All arithmetic is done in UTC. `next_occurrence` is the single source of
//! truth for "when does this trigger fire next": it is recomputed after
//! every fire and on every edit, and always returns an instant strictly
//! after its reference point (or `None` for an exhausted `Once`).

use chrono::{DateTime, Datelike, Days, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The time pattern governing repeated firing of a trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    /// Fire once at an absolute instant, then become spent
    Once { at: DateTime<Utc> },
    /// Fire every day at a time of day
    Daily { at: NaiveTime },
    /// Fire at a time of day on a set of weekdays
    Weekly {
        at: NaiveTime,
        #[serde(with = "weekday_set")]
        days: Vec<Weekday>,
    },
}

impl Recurrence {
    /// Compute the next fire instant strictly after `after`.
    ///
    /// `Once` returns its instant only while it is still in the future;
    /// `Weekly` with an empty day set has no occurrences (rejected at
    /// validation, but handled defensively here as `None`).
    pub fn next_occurrence(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Recurrence::Once { at } => (*at > after).then_some(*at),

            Recurrence::Daily { at } => {
                let today = after.date_naive().and_time(*at).and_utc();
                if today > after {
                    Some(today)
                } else {
                    Some((after.date_naive() + Days::new(1)).and_time(*at).and_utc())
                }
            }

            Recurrence::Weekly { at, days } => {
                if days.is_empty() {
                    return None;
                }
                // Today may still qualify if the time of day has not passed;
                // offset 7 covers wrapping back to the same weekday next week.
                for offset in 0..=7u64 {
                    let date = after.date_naive() + Days::new(offset);
                    if !days.contains(&date.weekday()) {
                        continue;
                    }
                    let candidate = date.and_time(*at).and_utc();
                    if candidate > after {
                        return Some(candidate);
                    }
                }
                None
            }
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::Once { at } => write!(f, "once at {}", at.format("%Y-%m-%d %H:%M UTC")),
            Recurrence::Daily { at } => write!(f, "daily at {}", at.format("%H:%M")),
            Recurrence::Weekly { at, days } => {
                let names: Vec<&str> = days.iter().map(|d| weekday_set::name(*d)).collect();
                write!(f, "weekly on {} at {}", names.join(","), at.format("%H:%M"))
            }
        }
    }
}

/// Serde helper storing weekdays as lowercase three-letter names
pub(crate) mod weekday_set {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub(crate) fn name(day: Weekday) -> &'static str {
        match day {
            Weekday::Mon => "mon",
            Weekday::Tue => "tue",
            Weekday::Wed => "wed",
            Weekday::Thu => "thu",
            Weekday::Fri => "fri",
            Weekday::Sat => "sat",
            Weekday::Sun => "sun",
        }
    }

    pub(crate) fn parse(s: &str) -> Result<Weekday, String> {
        match s {
            "mon" => Ok(Weekday::Mon),
            "tue" => Ok(Weekday::Tue),
            "wed" => Ok(Weekday::Wed),
            "thu" => Ok(Weekday::Thu),
            "fri" => Ok(Weekday::Fri),
            "sat" => Ok(Weekday::Sat),
            "sun" => Ok(Weekday::Sun),
            _ => Err(format!("unknown weekday: {}", s)),
        }
    }

    pub fn serialize<S: Serializer>(days: &[Weekday], serializer: S) -> Result<S::Ok, S::Error> {
        let names: Vec<&str> = days.iter().map(|d| name(*d)).collect();
        names.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Weekday>, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        names
            .iter()
            .map(|s| parse(s).map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Parse a lowercase three-letter weekday name (CLI input)
pub fn parse_weekday(s: &str) -> Result<Weekday, String> {
    weekday_set::parse(s)
}

#[cfg(test)]
#[path = "recurrence_tests.rs"]
mod tests;
