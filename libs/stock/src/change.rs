use chrono::NaiveDate;

use crate::{StockError, TimeSeries};

/// Percent change between the two most recent completed trading days.
///
/// Keys are walked newest first. When the newest key is `today` it is treated
/// as an incomplete intraday entry and skipped. The comparison is
/// `(recent - prior) / recent * 100`, rounded half to even.
///
/// `today` is compared to the provider's keys as a plain `%Y-%m-%d` string,
/// so a provider in another time zone may not be matched near midnight.
pub fn percent_change(series: &TimeSeries, today: NaiveDate) -> Result<i64, StockError> {
    let today = today.format("%Y-%m-%d").to_string();

    let mut dates = series.keys().rev().peekable();
    let needed = if dates.peek().is_some_and(|d| **d == today) {
        dates.next();
        3
    } else {
        2
    };

    let (recent, prior) = match (dates.next(), dates.next()) {
        (Some(recent), Some(prior)) => (recent, prior),
        _ => {
            return Err(StockError::InsufficientHistory {
                needed,
                found: series.len(),
            });
        }
    };

    let recent_close = series[recent].close()?;
    let prior_close = series[prior].close()?;

    if recent_close == 0.0 {
        return Err(StockError::DataFormat(format!("close on {recent} is zero")));
    }

    let change = (recent_close - prior_close) / recent_close * 100.0;
    let rounded = change.round_ties_even();
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
    if !(rounded >= i64::MIN as f64 && rounded < i64::MAX as f64) {
        return Err(StockError::DataFormat(format!(
            "percent change between {prior} and {recent} is out of range: {change}"
        )));
    }

    Ok(rounded as i64)
}
