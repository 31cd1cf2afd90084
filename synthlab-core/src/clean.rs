//! Missing-value cleaning ahead of estimation.
//!
//! Rows at the head of the table that still contain any NaN are dropped;
//! interior and trailing NaN are forward-filled from the last real value in
//! the same column. Deterministic: same input, same output. Postcondition:
//! the result carries no NaN, the same columns, and the same or fewer rows.

use crate::frame::Frame;

/// Clean `frame` into a fully populated table.
///
/// When no row is fully populated the result keeps the columns and has zero
/// rows.
pub fn clean(frame: &Frame) -> Frame {
    let columns = frame.raw_columns();

    // First row where every column holds a real value.
    let lead = (0..frame.height())
        .find(|&i| columns.iter().all(|c| !c[i].is_nan()))
        .unwrap_or(frame.height());

    let dates = frame.dates()[lead..].to_vec();
    let cleaned = columns
        .iter()
        .map(|c| {
            let mut last = f64::NAN;
            c[lead..]
                .iter()
                .map(|&v| {
                    if !v.is_nan() {
                        last = v;
                    }
                    last
                })
                .collect()
        })
        .collect();

    Frame::from_raw_parts(dates, frame.tickers().to_vec(), cleaned)
}
