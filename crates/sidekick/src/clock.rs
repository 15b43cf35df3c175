use chrono::{Local, NaiveDateTime};

/// Local wall-clock time. Stored and printed timestamps use it.
#[inline]
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
