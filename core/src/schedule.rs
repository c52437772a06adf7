use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cron expression used when none is configured: daily at midnight UTC.
pub const DEFAULT_CRON: &str = "0 0 * * *";

/// Upper bound for `next_after` searches.
const SEARCH_HORIZON_DAYS: i64 = 5 * 366;

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Schedule,
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Schedule => write!(f, "schedule"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Clone, Copy)]
struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
}

const MINUTE: FieldSpec = FieldSpec {
    name: "minute",
    min: 0,
    max: 59,
};
const HOUR: FieldSpec = FieldSpec {
    name: "hour",
    min: 0,
    max: 23,
};
const DAY_OF_MONTH: FieldSpec = FieldSpec {
    name: "day-of-month",
    min: 1,
    max: 31,
};
const MONTH: FieldSpec = FieldSpec {
    name: "month",
    min: 1,
    max: 12,
};
// 7 is accepted as an alias for Sunday and folded onto 0 after parsing.
const DAY_OF_WEEK: FieldSpec = FieldSpec {
    name: "day-of-week",
    min: 0,
    max: 7,
};

/// Bit set of the values a single cron field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldSet {
    bits: u64,
    restricted: bool,
}

impl FieldSet {
    fn contains(&self, value: u32) -> bool {
        value < 64 && self.bits & (1u64 << value) != 0
    }

    fn values(&self) -> impl Iterator<Item = u32> + '_ {
        (0..64u32).filter(|v| self.contains(*v))
    }

    fn parse(raw: &str, spec: FieldSpec) -> Result<Self> {
        let mut bits = 0u64;
        for part in raw.split(',') {
            bits |= parse_part(part, spec).with_context(|| format!("invalid {} field '{}'", spec.name, raw))?;
        }
        Ok(Self {
            bits,
            restricted: !raw.starts_with('*'),
        })
    }
}

fn parse_part(part: &str, spec: FieldSpec) -> Result<u64> {
    if part.is_empty() {
        bail!("empty list element");
    }
    let (base, step) = match part.split_once('/') {
        Some((base, step)) => {
            let step: u32 = step.parse().map_err(|_| anyhow!("step '{}' is not a number", step))?;
            if step == 0 {
                bail!("step must be greater than zero");
            }
            (base, Some(step))
        }
        None => (part, None),
    };

    let (start, end) = if base == "*" {
        (spec.min, spec.max)
    } else if let Some((lo, hi)) = base.split_once('-') {
        (parse_value(lo, spec)?, parse_value(hi, spec)?)
    } else {
        let value = parse_value(base, spec)?;
        // `a/n` runs from `a` to the end of the field.
        if step.is_some() { (value, spec.max) } else { (value, value) }
    };

    if start > end {
        bail!("range {}-{} is reversed", start, end);
    }

    let step = step.unwrap_or(1) as usize;
    let mut bits = 0u64;
    for value in (start..=end).step_by(step) {
        bits |= 1u64 << value;
    }
    Ok(bits)
}

fn parse_value(raw: &str, spec: FieldSpec) -> Result<u32> {
    let value: u32 = raw
        .parse()
        .map_err(|_| anyhow!("'{}' is not a number", raw))?;
    if value < spec.min || value > spec.max {
        bail!("{} is outside {}..={}", value, spec.min, spec.max);
    }
    Ok(value)
}

/// A five-field cron expression evaluated in UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    source: String,
    minutes: FieldSet,
    hours: FieldSet,
    days_of_month: FieldSet,
    months: FieldSet,
    days_of_week: FieldSet,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            bail!("cron expression '{}' must have 5 fields, found {}", expr.trim(), fields.len());
        }
        let mut days_of_week = FieldSet::parse(fields[4], DAY_OF_WEEK)?;
        if days_of_week.contains(7) {
            days_of_week.bits = (days_of_week.bits & !(1u64 << 7)) | 1;
        }
        Ok(Self {
            source: fields.join(" "),
            minutes: FieldSet::parse(fields[0], MINUTE)?,
            hours: FieldSet::parse(fields[1], HOUR)?,
            days_of_month: FieldSet::parse(fields[2], DAY_OF_MONTH)?,
            months: FieldSet::parse(fields[3], MONTH)?,
            days_of_week,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn matches_day(&self, date: NaiveDate) -> bool {
        if !self.months.contains(date.month()) {
            return false;
        }
        let dom = self.days_of_month.contains(date.day());
        let dow = self.days_of_week.contains(date.weekday().num_days_from_sunday());
        // Classic cron: when both day fields are restricted either one may match.
        if self.days_of_month.restricted && self.days_of_week.restricted {
            dom || dow
        } else {
            dom && dow
        }
    }

    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        self.matches_day(at.date_naive()) && self.hours.contains(at.hour()) && self.minutes.contains(at.minute())
    }

    /// First fire time strictly after `after`, at minute resolution.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after.with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);
        let start_date = start.date_naive();

        for offset in 0..SEARCH_HORIZON_DAYS {
            let date = start_date + Duration::days(offset);
            if !self.matches_day(date) {
                continue;
            }
            let same_day = offset == 0;
            for hour in self.hours.values() {
                if same_day && hour < start.hour() {
                    continue;
                }
                for minute in self.minutes.values() {
                    if same_day && hour == start.hour() && minute < start.minute() {
                        continue;
                    }
                    let naive = date.and_hms_opt(hour, minute, 0)?;
                    return Some(Utc.from_utc_datetime(&naive));
                }
            }
        }
        None
    }

    /// The next `count` fire times after `from`. Stops early when the
    /// schedule never fires again within the search horizon.
    pub fn upcoming(&self, from: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let mut out = Vec::new();
        let mut cursor = from;
        while out.len() < count {
            match self.next_after(cursor) {
                Some(next) => {
                    out.push(next);
                    cursor = next;
                }
                None => break,
            }
        }
        out
    }
}

impl FromStr for CronSchedule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
