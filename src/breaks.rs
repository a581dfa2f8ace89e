// Break generators for continuous and temporal scales

use crate::parser::ast::TransformKind;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

/// Nice-number breaks (steps of 1, 2 or 5 times a power of ten)
pub fn pretty_breaks(min: f64, max: f64, n: usize) -> Vec<f64> {
    if n == 0 || !min.is_finite() || !max.is_finite() {
        return Vec::new();
    }
    if min >= max {
        return vec![min];
    }
    let step = nice_step(min, max, n);
    let first = (min / step - 1e-9).ceil() as i64;
    let last = (max / step + 1e-9).floor() as i64;
    // Dividing by the inverse step keeps 0.3 from printing as 0.30000000000000004
    let inverse = (1.0 / step).round();
    (first..=last)
        .map(|k| if step < 1.0 { k as f64 / inverse } else { k as f64 * step })
        .collect()
}

/// Step used by [`pretty_breaks`] for a range
pub fn nice_step(min: f64, max: f64, n: usize) -> f64 {
    let rough = (max - min) / n.max(1) as f64;
    let magnitude = 10f64.powf(rough.log10().floor());
    let residual = rough / magnitude;
    let nice = if residual <= 1.0 + 1e-9 {
        1.0
    } else if residual <= 2.0 + 1e-9 {
        2.0
    } else if residual <= 5.0 + 1e-9 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Breaks at powers of `base` with 1-2-5 fill-in, thinned to about `n`
pub fn log_breaks(min: f64, max: f64, n: usize, base: f64) -> Vec<f64> {
    if max <= 0.0 || n == 0 {
        return Vec::new();
    }
    let min = if min <= 0.0 { max.min(1.0) } else { min };
    if min >= max {
        return vec![min];
    }
    let min_exp = min.log(base).floor() as i32;
    let max_exp = max.log(base).ceil() as i32;

    let powers: Vec<f64> = (min_exp..=max_exp)
        .map(|e| base.powi(e))
        .filter(|v| *v >= min && *v <= max)
        .collect();
    if powers.len() >= n.min(3).max(2) {
        return thin_breaks(powers, n);
    }

    let mut breaks = Vec::new();
    for exp in min_exp..=max_exp {
        let power = base.powi(exp);
        for mult in [1.0, 2.0, 5.0] {
            let value = power * mult;
            if value >= min && value <= max {
                breaks.push(value);
            }
        }
    }
    breaks.sort_by(f64::total_cmp);
    breaks.dedup_by(|a, b| (*a - *b).abs() <= f64::EPSILON * a.abs().max(b.abs()));
    thin_breaks(breaks, n)
}

/// Pretty breaks computed in square-root space
pub fn sqrt_breaks(min: f64, max: f64, n: usize) -> Vec<f64> {
    let min = min.max(0.0);
    if min >= max || n == 0 {
        return Vec::new();
    }
    pretty_breaks(min.sqrt(), max.sqrt(), n)
        .into_iter()
        .map(|v| v * v)
        .filter(|v| *v >= min && *v <= max)
        .collect()
}

/// Log breaks mirrored around zero
pub fn symlog_breaks(min: f64, max: f64, n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let mut breaks = Vec::new();
    if min < 0.0 {
        let lo = if max < 0.0 { -max } else { 1.0 };
        breaks.extend(log_breaks(lo, -min, n / 2 + 1, 10.0).into_iter().rev().map(|v| -v));
    }
    if min <= 0.0 && max >= 0.0 {
        breaks.push(0.0);
    }
    if max > 0.0 {
        let lo = if min > 0.0 { min } else { 1.0 };
        breaks.extend(log_breaks(lo, max, n / 2 + 1, 10.0));
    }
    breaks
}

fn thin_breaks(breaks: Vec<f64>, n: usize) -> Vec<f64> {
    if breaks.len() <= n || n == 0 {
        return breaks;
    }
    if n == 1 {
        return vec![breaks[breaks.len() / 2]];
    }
    let step = (breaks.len() - 1) as f64 / (n - 1) as f64;
    let mut out: Vec<f64> = (0..n)
        .map(|i| breaks[((i as f64 * step).round() as usize).min(breaks.len() - 1)])
        .collect();
    out.dedup();
    out
}

/// Transform-aware break selection for a continuous domain
pub fn continuous_breaks(min: f64, max: f64, n: usize, trans: TransformKind) -> Vec<f64> {
    match trans {
        TransformKind::Log10 => log_breaks(min, max, n, 10.0),
        TransformKind::Log2 => log_breaks(min, max, n, 2.0),
        TransformKind::Sqrt => sqrt_breaks(min, max, n),
        TransformKind::Symlog => symlog_breaks(min, max, n),
        TransformKind::Identity | TransformKind::Reverse => pretty_breaks(min, max, n),
    }
}

// =============================================================================
// Temporal breaks
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TemporalUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TemporalUnit {
    /// Approximate length in milliseconds, for interval selection only
    fn approx_ms(&self) -> f64 {
        const SECOND: f64 = 1000.0;
        match self {
            TemporalUnit::Second => SECOND,
            TemporalUnit::Minute => 60.0 * SECOND,
            TemporalUnit::Hour => 3600.0 * SECOND,
            TemporalUnit::Day => 86_400.0 * SECOND,
            TemporalUnit::Week => 7.0 * 86_400.0 * SECOND,
            TemporalUnit::Month => 30.44 * 86_400.0 * SECOND,
            TemporalUnit::Year => 365.25 * 86_400.0 * SECOND,
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            TemporalUnit::Second => "%H:%M:%S",
            TemporalUnit::Minute | TemporalUnit::Hour => "%H:%M",
            TemporalUnit::Day | TemporalUnit::Week => "%b %d",
            TemporalUnit::Month => "%b %Y",
            TemporalUnit::Year => "%Y",
        }
    }
}

const INTERVALS: &[(i64, TemporalUnit)] = &[
    (1, TemporalUnit::Second),
    (5, TemporalUnit::Second),
    (15, TemporalUnit::Second),
    (30, TemporalUnit::Second),
    (1, TemporalUnit::Minute),
    (5, TemporalUnit::Minute),
    (15, TemporalUnit::Minute),
    (30, TemporalUnit::Minute),
    (1, TemporalUnit::Hour),
    (3, TemporalUnit::Hour),
    (6, TemporalUnit::Hour),
    (12, TemporalUnit::Hour),
    (1, TemporalUnit::Day),
    (2, TemporalUnit::Day),
    (1, TemporalUnit::Week),
    (2, TemporalUnit::Week),
    (1, TemporalUnit::Month),
    (3, TemporalUnit::Month),
    (6, TemporalUnit::Month),
    (1, TemporalUnit::Year),
];

fn to_datetime(ms: f64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms.round() as i64).map(|dt| dt.naive_utc())
}

fn to_ms(dt: NaiveDateTime) -> f64 {
    dt.and_utc().timestamp_millis() as f64
}

fn month_start(year: i32, month0: i32) -> Option<NaiveDateTime> {
    let total = year * 12 + month0;
    NaiveDate::from_ymd_opt(total.div_euclid(12), total.rem_euclid(12) as u32 + 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn align(dt: NaiveDateTime, count: i64, unit: TemporalUnit) -> Option<NaiveDateTime> {
    let date = dt.date();
    match unit {
        TemporalUnit::Second => {
            let s = dt.second() as i64 / count * count;
            date.and_hms_opt(dt.hour(), dt.minute(), s as u32)
        }
        TemporalUnit::Minute => {
            let m = dt.minute() as i64 / count * count;
            date.and_hms_opt(dt.hour(), m as u32, 0)
        }
        TemporalUnit::Hour => {
            let h = dt.hour() as i64 / count * count;
            date.and_hms_opt(h as u32, 0, 0)
        }
        TemporalUnit::Day => date.and_hms_opt(0, 0, 0),
        TemporalUnit::Week => {
            let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
            monday.and_hms_opt(0, 0, 0)
        }
        TemporalUnit::Month => {
            let m = (date.month0() as i64 / count * count) as i32;
            month_start(date.year(), m)
        }
        TemporalUnit::Year => {
            let y = (date.year() as i64).div_euclid(count) * count;
            month_start(y as i32, 0)
        }
    }
}

fn advance(dt: NaiveDateTime, count: i64, unit: TemporalUnit) -> Option<NaiveDateTime> {
    match unit {
        TemporalUnit::Second => Some(dt + Duration::seconds(count)),
        TemporalUnit::Minute => Some(dt + Duration::minutes(count)),
        TemporalUnit::Hour => Some(dt + Duration::hours(count)),
        TemporalUnit::Day => Some(dt + Duration::days(count)),
        TemporalUnit::Week => Some(dt + Duration::weeks(count)),
        TemporalUnit::Month => month_start(dt.year(), dt.month0() as i32 + count as i32),
        TemporalUnit::Year => month_start(dt.year() + count as i32, 0),
    }
}

/// Step between temporal breaks for a range of epoch milliseconds
fn temporal_interval(min: f64, max: f64, n: usize) -> Option<(i64, TemporalUnit)> {
    if n == 0 || !(min.is_finite() && max.is_finite()) || min >= max {
        return None;
    }
    let span = max - min;
    let picked = INTERVALS
        .iter()
        .find(|(count, unit)| span / (*count as f64 * unit.approx_ms()) <= n as f64);
    Some(match picked {
        Some(interval) => *interval,
        None => {
            // Multi-year spans: pretty steps over whole years
            let years = span / TemporalUnit::Year.approx_ms();
            (nice_step(0.0, years, n).max(1.0).round() as i64, TemporalUnit::Year)
        }
    })
}

/// strftime pattern matching the step [`temporal_breaks`] picks for a range
pub fn temporal_pattern(min: f64, max: f64, n: usize) -> Option<&'static str> {
    temporal_interval(min, max, n).map(|(_, unit)| unit.pattern())
}

/// Breaks at calendar boundaries for a range of epoch milliseconds
pub fn temporal_breaks(min: f64, max: f64, n: usize) -> Vec<f64> {
    if n > 0 && min.is_finite() && max.is_finite() && min >= max {
        return vec![min];
    }
    let Some((count, unit)) = temporal_interval(min, max, n) else {
        return Vec::new();
    };

    let (Some(start), Some(end)) = (to_datetime(min), to_datetime(max)) else {
        return Vec::new();
    };
    let mut breaks = Vec::new();
    let mut current = align(start, count, unit);
    while let Some(dt) = current {
        if dt > end {
            break;
        }
        if dt >= start {
            breaks.push(to_ms(dt));
        }
        current = advance(dt, count, unit).filter(|next| *next > dt);
    }
    breaks
}
