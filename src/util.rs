use std::any::Any;
use std::time::Duration;

use anyhow::anyhow;
use chrono::{NaiveDateTime, Utc};

/// Current wall-clock time in the timezone-naive representation records use.
pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// `now()` plus a delay, saturating instead of overflowing.
pub(crate) fn now_plus(delay: Duration) -> NaiveDateTime {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| now().checked_add_signed(delay))
        .unwrap_or(NaiveDateTime::MAX)
}

/// Turn a caught panic payload into a loggable error.
pub(crate) fn try_to_extract_panic_info(info: &(dyn Any + Send)) -> anyhow::Error {
    if let Some(message) = info.downcast_ref::<String>() {
        anyhow!("job panicked: {message}")
    } else if let Some(message) = info.downcast_ref::<&str>() {
        anyhow!("job panicked: {message}")
    } else {
        anyhow!("job panicked")
    }
}
