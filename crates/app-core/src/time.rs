use chrono::{DateTime, FixedOffset, Utc};

/// Timestamps are stored with an explicit `+00:00` offset.
pub fn utc_to_fixed_offset(utc_dt: &DateTime<Utc>) -> DateTime<FixedOffset> {
    utc_dt.fixed_offset()
}

pub fn now() -> DateTime<FixedOffset> {
    utc_to_fixed_offset(&Utc::now())
}
