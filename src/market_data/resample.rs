// =============================================================================
// Calendar resampling — weekly / monthly OHLCV buckets
// =============================================================================
//
// Daily bars are grouped into calendar buckets (ISO week, calendar month) with
// the usual aggregation: open = first, high = max, low = min, close = last,
// volume = sum.  Each bucket is labeled with its calendar period END (the ISO
// week's Sunday, the last calendar day of the month), not with the last
// trading day inside it.
//
// That labeling is what makes forward-filling safe: a daily row at date `d`
// may only see bucket values whose label is <= `d`, and a bucket still in
// progress is always labeled in the future.  A weekly value therefore first
// appears on daily rows in the FOLLOWING week — never inside its own.

use chrono::{Datelike, Days, NaiveDate};

use super::Bar;

/// One resampled OHLCV bucket, labeled at calendar period end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    pub label: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Sunday of the ISO week containing `date`.
pub fn week_end(date: NaiveDate) -> NaiveDate {
    let to_sunday = 6 - date.weekday().num_days_from_monday() as u64;
    date + Days::new(to_sunday)
}

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (y, m) = (date.year(), date.month());
    let first_of_next = if m == 12 {
        NaiveDate::from_ymd_opt(y + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(y, m + 1, 1)
    };
    // Both branches construct day 1 of a valid month.
    first_of_next.unwrap() - Days::new(1)
}

/// Group `bars` into ISO-week buckets.
pub fn resample_weekly(bars: &[Bar]) -> Vec<Bucket> {
    resample(bars, week_end)
}

/// Group `bars` into calendar-month buckets.
pub fn resample_monthly(bars: &[Bar]) -> Vec<Bucket> {
    resample(bars, month_end)
}

fn resample(bars: &[Bar], label_of: fn(NaiveDate) -> NaiveDate) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = Vec::new();
    for bar in bars {
        let label = label_of(bar.date);
        match buckets.last_mut() {
            Some(b) if b.label == label => {
                b.high = b.high.max(bar.high);
                b.low = b.low.min(bar.low);
                b.close = bar.close;
                b.volume += bar.volume;
            }
            _ => buckets.push(Bucket {
                label,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
            }),
        }
    }
    buckets
}

/// Forward-fill bucket-level values onto daily rows.
///
/// `bucket_values` pairs each bucket label with the indicator value computed
/// for that bucket (possibly `None` during the bucket series' own warm-up);
/// both it and `dates` must be ascending.  Row `i` receives the value of the
/// latest bucket whose label is <= `dates[i]` — the value AT that label, even
/// when it is `None`, matching a reindex-then-fill over the bucket index.
pub fn forward_fill(
    bucket_values: &[(NaiveDate, Option<f64>)],
    dates: &[NaiveDate],
) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(dates.len());
    let mut current: Option<f64> = None;
    let mut j = 0usize;
    for &date in dates {
        while j < bucket_values.len() && bucket_values[j].0 <= date {
            current = bucket_values[j].1;
            j += 1;
        }
        out.push(current);
    }
    out
}
