use std::sync::LazyLock;

use regex::Regex;

pub const HOUR: i64 = 3_600;
pub const DAY: i64 = 86_400;
pub const WEEK: i64 = 604_800;
pub const MONTH: i64 = 2_592_000;
pub const QUARTER: i64 = 7_776_000;
pub const YEAR: i64 = 31_536_000;

static COUNT_UNIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)([dwmyh])").unwrap());

enum Span {
    PerUnit(i64),
    Fixed(i64),
}

static HORIZON_PATTERNS: LazyLock<Vec<(Regex, Span)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(\d+)\s*day").unwrap(), Span::PerUnit(DAY)),
        (Regex::new(r"(\d+)\s*week").unwrap(), Span::PerUnit(WEEK)),
        (Regex::new(r"(\d+)\s*month").unwrap(), Span::PerUnit(MONTH)),
        (Regex::new(r"(\d+)\s*hour").unwrap(), Span::PerUnit(HOUR)),
        (
            Regex::new(r"by\s+(?:end\s+of\s+)?(?:the\s+)?day").unwrap(),
            Span::Fixed(8 * HOUR),
        ),
        (
            Regex::new(r"by\s+(?:end\s+of\s+)?(?:the\s+)?week").unwrap(),
            Span::Fixed(4 * DAY),
        ),
        (Regex::new(r"intraday|day\s*trade").unwrap(), Span::Fixed(DAY)),
        (Regex::new(r"swing\s*trade").unwrap(), Span::Fixed(WEEK)),
        (Regex::new(r"long[\s-]?term").unwrap(), Span::Fixed(YEAR)),
    ]
});

/// Seconds for a timeframe label: a named span ("today", "week") or a count
/// with a unit suffix ("1d", "2w", "6h", "3m" months, "1y").
pub fn parse_timeframe(label: &str) -> Option<i64> {
    let label = label.trim().to_lowercase();
    let named = match label.as_str() {
        "today" => Some(DAY),
        "tomorrow" => Some(2 * DAY),
        "week" => Some(WEEK),
        "month" => Some(MONTH),
        "quarter" => Some(QUARTER),
        "year" => Some(YEAR),
        _ => None,
    };
    if named.is_some() {
        return named;
    }

    let caps = COUNT_UNIT.captures(&label)?;
    let value: i64 = caps[1].parse().ok()?;
    let unit = match &caps[2] {
        "h" => HOUR,
        "d" => DAY,
        "w" => WEEK,
        "m" => MONTH,
        "y" => YEAR,
        _ => return None,
    };
    value.checked_mul(unit)
}

/// Horizon phrase in free text ("3 days", "by end of week", "swing trade").
/// The first pattern that matches wins.
pub fn parse_horizon_from_text(text: &str) -> Option<i64> {
    let lower = text.to_lowercase();
    HORIZON_PATTERNS.iter().find_map(|(re, span)| {
        let caps = re.captures(&lower)?;
        match span {
            Span::PerUnit(unit) => caps[1].parse::<i64>().ok()?.checked_mul(*unit),
            Span::Fixed(secs) => Some(*secs),
        }
    })
}

pub fn humanize_duration(seconds: i64) -> String {
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("{n} {unit}")
        } else {
            format!("{n} {unit}s")
        }
    };
    match seconds {
        s if s < 60 => format!("{s} seconds"),
        s if s < HOUR => plural(s / 60, "minute"),
        s if s < DAY => plural(s / HOUR, "hour"),
        s => plural(s / DAY, "day"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timeframe_named_and_suffixed() {
        assert_eq!(parse_timeframe("1d"), Some(DAY));
        assert_eq!(parse_timeframe(" 7D "), Some(7 * DAY));
        assert_eq!(parse_timeframe("30d"), Some(30 * DAY));
        assert_eq!(parse_timeframe("2w"), Some(2 * WEEK));
        assert_eq!(parse_timeframe("6h"), Some(6 * HOUR));
        assert_eq!(parse_timeframe("week"), Some(WEEK));
        assert_eq!(parse_timeframe("tomorrow"), Some(172_800));
        assert_eq!(parse_timeframe("soon"), None);
        assert_eq!(parse_timeframe("d1"), None);
    }

    #[test]
    fn test_parse_horizon_from_text_first_match_wins() {
        assert_eq!(parse_horizon_from_text("holding 3 days"), Some(3 * DAY));
        assert_eq!(parse_horizon_from_text("out by end of the day"), Some(8 * HOUR));
        assert_eq!(parse_horizon_from_text("swing trade idea"), Some(WEEK));
        assert_eq!(parse_horizon_from_text("long-term hold"), Some(YEAR));
        assert_eq!(parse_horizon_from_text("no timing given"), None);
    }

    #[test]
    fn test_humanize_duration() {
        assert_eq!(humanize_duration(45), "45 seconds");
        assert_eq!(humanize_duration(60), "1 minute");
        assert_eq!(humanize_duration(7_200), "2 hours");
        assert_eq!(humanize_duration(WEEK), "7 days");
    }
}
