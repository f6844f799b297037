use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::extras::{Extras, LAST_UPDATED_KEY};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::hours(1);

/// Soft rate limit on recomputation. Two callers inside the same window can
/// both pass; the gate is not a lock.
pub fn should_update(extras: &Extras, interval: Duration) -> bool {
    should_update_at(extras, interval, Utc::now())
}

pub fn should_update_at(extras: &Extras, interval: Duration, now: DateTime<Utc>) -> bool {
    let Some(raw) = extras.get(LAST_UPDATED_KEY) else {
        return true;
    };
    match parse_timestamp(raw) {
        Some(last_updated) => now - last_updated >= interval,
        None => {
            tracing::debug!(value = raw, "unparseable last-updated timestamp");
            true
        }
    }
}

pub fn stamp_last_updated(extras: Extras, now: DateTime<Utc>) -> Extras {
    extras.upsert(
        LAST_UPDATED_KEY,
        now.to_rfc3339_opts(SecondsFormat::Micros, false),
    )
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|value| value.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamped(at: DateTime<Utc>) -> Extras {
        stamp_last_updated(Extras::new(), at)
    }

    #[test]
    fn missing_timestamp_updates() {
        assert!(should_update_at(
            &Extras::new(),
            DEFAULT_REFRESH_INTERVAL,
            Utc::now()
        ));
    }

    #[test]
    fn recent_timestamp_skips() {
        let now = Utc::now();
        let extras = stamped(now - Duration::minutes(10));
        assert!(!should_update_at(&extras, DEFAULT_REFRESH_INTERVAL, now));
    }

    #[test]
    fn stale_timestamp_updates() {
        let now = Utc::now();
        let extras = stamped(now - Duration::hours(2));
        assert!(should_update_at(&extras, DEFAULT_REFRESH_INTERVAL, now));
    }

    #[test]
    fn threshold_is_inclusive() {
        let now = Utc::now();
        let extras = stamped(now - Duration::hours(1));
        assert!(should_update_at(&extras, DEFAULT_REFRESH_INTERVAL, now));
    }

    #[test]
    fn garbage_timestamp_updates() {
        let extras = Extras::new().upsert(LAST_UPDATED_KEY, "yesterday-ish");
        assert!(should_update_at(&extras, DEFAULT_REFRESH_INTERVAL, Utc::now()));
    }

    #[test]
    fn accepts_python_isoformat() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T12:30:00+00:00")
            .unwrap()
            .with_timezone(&Utc);
        let extras = Extras::new().upsert(LAST_UPDATED_KEY, "2024-05-01T12:00:00.123456+00:00");
        assert!(!should_update_at(&extras, DEFAULT_REFRESH_INTERVAL, now));
    }
}
