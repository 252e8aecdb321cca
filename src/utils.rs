use chrono::{ DateTime, Utc };

pub fn timestamp_to_elapsed(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(then);

    if duration.num_seconds() < 60 {
        "just now".to_string()
    } else if duration.num_minutes() < 60 {
        format!("{} minute{} ago", duration.num_minutes(), if duration.num_minutes() == 1 { "" } else { "s" })
    } else if duration.num_hours() < 24 {
        format!("{} hour{} ago", duration.num_hours(), if duration.num_hours() == 1 { "" } else { "s" })
    } else {
        format!("{} day{} ago", duration.num_days(), if duration.num_days() == 1 { "" } else { "s" })
    }
}

/// Time left until `when`, or `None` once it has passed.
pub fn time_until(when: DateTime<Utc>, now: DateTime<Utc>) -> Option<String> {
    let duration = when.signed_duration_since(now);
    if duration.num_seconds() <= 0 {
        return None;
    }

    Some(if duration.num_minutes() < 1 {
        "in under a minute".to_string()
    } else if duration.num_hours() < 1 {
        format!("in {} min", duration.num_minutes())
    } else if duration.num_days() < 1 {
        format!("in {}h", duration.num_hours())
    } else {
        format!("in {}d", duration.num_days())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn elapsed_buckets() {
        let now = Utc::now();
        assert_eq!(timestamp_to_elapsed(now - Duration::seconds(5), now), "just now");
        assert_eq!(timestamp_to_elapsed(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(timestamp_to_elapsed(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(timestamp_to_elapsed(now - Duration::hours(2), now), "2 hours ago");
        assert_eq!(timestamp_to_elapsed(now - Duration::days(1), now), "1 day ago");
    }

    #[test]
    fn until_buckets() {
        let now = Utc::now();
        assert_eq!(time_until(now - Duration::seconds(1), now), None);
        assert_eq!(time_until(now + Duration::seconds(30), now).as_deref(), Some("in under a minute"));
        assert_eq!(time_until(now + Duration::minutes(4), now).as_deref(), Some("in 4 min"));
        assert_eq!(time_until(now + Duration::hours(3), now).as_deref(), Some("in 3h"));
        assert_eq!(time_until(now + Duration::days(6), now).as_deref(), Some("in 6d"));
    }
}
