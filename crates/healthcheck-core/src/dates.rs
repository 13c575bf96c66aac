use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};

const MONTHS_ES: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sept", "oct", "nov", "dic",
];

/// Card date label: relative for the last week, absolute after that.
pub fn relative_label(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(timestamp);
    let mins = diff.num_minutes();
    let hours = diff.num_hours();
    let days = diff.num_days();

    if mins < 1 {
        return "Hace un momento".to_string();
    }
    if mins < 60 {
        return format!("Hace {} minuto{}", mins, plural(mins));
    }
    if hours < 24 {
        return format!("Hace {} hora{}", hours, plural(hours));
    }
    if days < 7 {
        return format!("Hace {} día{}", days, plural(days));
    }
    short_date(&timestamp.with_timezone(&Local))
}

fn plural(n: i64) -> &'static str {
    if n > 1 { "s" } else { "" }
}

/// `19 oct 2026, 14:05`
pub fn short_date<Tz: TimeZone>(dt: &DateTime<Tz>) -> String {
    format!(
        "{} {} {}, {:02}:{:02}",
        dt.day(),
        MONTHS_ES[dt.month0() as usize],
        dt.year(),
        dt.hour(),
        dt.minute()
    )
}

/// `19/10/2026, 14:05:09`, the format used in exported reports.
pub fn report_timestamp<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.format("%d/%m/%Y, %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 14, 5, 9).unwrap()
    }

    #[test]
    fn recent_is_a_moment_ago() {
        let now = base();
        assert_eq!(relative_label(now - Duration::seconds(30), now), "Hace un momento");
        // Clock skew (timestamp in the future) also reads as just now.
        assert_eq!(relative_label(now + Duration::seconds(30), now), "Hace un momento");
    }

    #[test]
    fn minutes_hours_days_pluralise() {
        let now = base();
        assert_eq!(relative_label(now - Duration::minutes(1), now), "Hace 1 minuto");
        assert_eq!(relative_label(now - Duration::minutes(45), now), "Hace 45 minutos");
        assert_eq!(relative_label(now - Duration::hours(1), now), "Hace 1 hora");
        assert_eq!(relative_label(now - Duration::hours(5), now), "Hace 5 horas");
        assert_eq!(relative_label(now - Duration::days(1), now), "Hace 1 día");
        assert_eq!(relative_label(now - Duration::days(6), now), "Hace 6 días");
    }

    #[test]
    fn older_than_a_week_is_absolute() {
        let now = base();
        let label = relative_label(now - Duration::days(30), now);
        assert!(label.contains("2026"), "{label}");
        assert!(label.contains(", "), "{label}");
    }

    #[test]
    fn short_date_uses_spanish_months() {
        assert_eq!(short_date(&base()), "19 oct 2026, 14:05");
    }

    #[test]
    fn report_timestamp_format() {
        assert_eq!(report_timestamp(&base()), "19/10/2026, 14:05:09");
    }
}
