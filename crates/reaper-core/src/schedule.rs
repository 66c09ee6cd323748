//! Cron grammar and the schedule gate
//!
//! Both the sweep schedule and resource TTLs use the standard 5-field cron
//! grammar (`minute hour day-of-month month day-of-week`), evaluated in UTC.
//! The `cron` crate wants a leading seconds field and numbers weekdays from
//! 1 = Sunday, so expressions are normalized before parsing: a `0` seconds
//! field is prepended and numeric weekdays (0-7, 0 and 7 = Sunday) are
//! rewritten as day names.
//!
//! When both day-of-month and day-of-week are restricted, standard cron
//! fires on a day matching either field while the `cron` crate requires
//! both. Such expressions are split into one schedule per day field and the
//! earliest occurrence wins.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::str::FromStr;
use thiserror::Error;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Cron grammar errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CronError {
    #[error("empty cron expression")]
    Empty,

    #[error("expected 5 fields (minute hour day-of-month month day-of-week), found {found} in {expr:?}")]
    FieldCount { expr: String, found: usize },

    #[error("unknown descriptor @{0}")]
    UnknownDescriptor(String),

    #[error("invalid cron expression {expr:?}: {reason}")]
    Invalid { expr: String, reason: String },

    #[error("cron expression {expr:?} has no upcoming occurrence")]
    NoOccurrence { expr: String },
}

/// A parsed cron expression
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    /// One schedule, or one per day field when either day may match
    schedules: Vec<cron::Schedule>,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let expression = expr.trim().to_string();
        let schedules = normalize(&expression)?
            .iter()
            .map(|normalized| {
                cron::Schedule::from_str(normalized).map_err(|e| CronError::Invalid {
                    expr: expression.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            expression,
            schedules,
        })
    }

    /// The expression as written in the configuration
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First occurrence strictly after `instant`
    pub fn next_after(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedules
            .iter()
            .filter_map(|schedule| schedule.after(&instant).next())
            .min()
    }

    /// First occurrence at or after `instant`
    ///
    /// Occurrences fall on whole seconds, so an instant with a fractional
    /// part can only be matched by a later second.
    pub fn next_at_or_after(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let second = instant.trunc_subsecs(0);
        if second == instant {
            self.next_after(second - Duration::seconds(1))
        } else {
            self.next_after(second)
        }
    }
}

impl PartialEq for CronSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl Eq for CronSchedule {}

impl FromStr for CronSchedule {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Parse a sweep schedule, logging and discarding an invalid one
///
/// `None` keeps the gate closed until a valid schedule is configured.
pub fn parse_schedule(expr: &str) -> Option<CronSchedule> {
    match CronSchedule::parse(expr) {
        Ok(schedule) => Some(schedule),
        Err(e) => {
            tracing::warn!("Ignoring schedule: {}", e);
            None
        }
    }
}

/// Whether a periodic trigger at `now` should run a sweep
///
/// Never without a schedule; always when the reaper never ran; otherwise
/// only once `now` is strictly past the first occurrence after `last_run`.
pub fn should_run(
    schedule: Option<&CronSchedule>,
    last_run: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    let Some(schedule) = schedule else {
        return false;
    };
    let Some(last_run) = last_run else {
        return true;
    };
    match schedule.next_after(last_run) {
        Some(next) => now > next,
        None => false,
    }
}

/// Rewrite a 5-field expression into the 6-field dialect of the `cron` crate
///
/// Yields two expressions when both day fields are restricted: one with
/// day-of-week and one with day-of-month widened to `*`.
fn normalize(expr: &str) -> Result<Vec<String>, CronError> {
    if expr.is_empty() {
        return Err(CronError::Empty);
    }

    if let Some(descriptor) = expr.strip_prefix('@') {
        let fields = match descriptor.to_ascii_lowercase().as_str() {
            "yearly" | "annually" => "0 0 1 1 *",
            "monthly" => "0 0 1 * *",
            "weekly" => "0 0 * * 0",
            "daily" | "midnight" => "0 0 * * *",
            "hourly" => "0 * * * *",
            _ => return Err(CronError::UnknownDescriptor(descriptor.to_string())),
        };
        return normalize(fields);
    }

    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(CronError::FieldCount {
            expr: expr.to_string(),
            found: fields.len(),
        });
    }

    let weekdays = translate_weekdays(fields[4]).map_err(|reason| CronError::Invalid {
        expr: expr.to_string(),
        reason,
    })?;

    let (minute, hour, days, month) = (fields[0], fields[1], fields[2], fields[3]);
    if is_unrestricted(days) || is_unrestricted(fields[4]) {
        return Ok(vec![format!(
            "0 {} {} {} {} {}",
            minute, hour, days, month, weekdays
        )]);
    }

    Ok(vec![
        format!("0 {} {} {} {} *", minute, hour, days, month),
        format!("0 {} {} * {} {}", minute, hour, month, weekdays),
    ])
}

/// A day field starting with `*` or `?` leaves the other day field in charge
fn is_unrestricted(field: &str) -> bool {
    field.starts_with('*') || field == "?"
}

/// Expand numeric day-of-week items into day names
///
/// Named items (`Mon-Fri`) and a bare `*` pass through untouched.
fn translate_weekdays(field: &str) -> Result<String, String> {
    let mut out: Vec<String> = Vec::new();

    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step = step
                    .parse::<u32>()
                    .map_err(|_| format!("invalid day-of-week step {:?}", step))?;
                if step == 0 {
                    return Err("day-of-week step must be positive".to_string());
                }
                (range, Some(step))
            }
            None => (item, None),
        };

        let bounds = if range == "*" {
            if step.is_none() {
                out.push("*".to_string());
                continue;
            }
            Some((0, 6))
        } else if let Some((start, end)) = range.split_once('-') {
            match (start.parse::<u32>(), end.parse::<u32>()) {
                (Ok(start), Ok(end)) => Some((start, end)),
                (Err(_), Err(_)) => None,
                _ => return Err(format!("mixed day-of-week range {:?}", range)),
            }
        } else {
            match range.parse::<u32>() {
                Ok(day) if step.is_some() => Some((day, 7)),
                Ok(day) => Some((day, day)),
                Err(_) => None,
            }
        };

        let Some((start, end)) = bounds else {
            out.push(item.to_string());
            continue;
        };

        if start > 7 || end > 7 || start > end {
            return Err(format!("invalid day-of-week range {:?}", range));
        }

        let step = step.unwrap_or(1);
        let mut day = start;
        while day <= end {
            let name = WEEKDAYS[(day % 7) as usize].to_string();
            if !out.contains(&name) {
                out.push(name);
            }
            day += step;
        }
    }

    Ok(out.join(","))
}
