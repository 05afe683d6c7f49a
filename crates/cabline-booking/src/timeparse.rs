// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of customer-typed dates and times in the service's local zone.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// Parses a clock time typed in chat.
///
/// Accepts 12-hour input with a meridiem (`6 pm`, `6:30PM`, `11:59 p.m.`)
/// and 24-hour input with minutes (`18:30`, `07.05`). A bare hour without a
/// meridiem is ambiguous and rejected.
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let compact: String = text
        .trim()
        .to_lowercase()
        .replace("a.m.", "am")
        .replace("p.m.", "pm")
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '.' { ':' } else { c })
        .collect();

    let (clock, meridiem) = if let Some(rest) = compact.strip_suffix("am") {
        (rest, Some(false))
    } else if let Some(rest) = compact.strip_suffix("pm") {
        (rest, Some(true))
    } else {
        (compact.as_str(), None)
    };

    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) if m.len() == 2 => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?),
        Some(_) => return None,
        None if meridiem.is_some() => (clock.parse::<u32>().ok()?, 0),
        None => return None,
    };
    if clock.starts_with('+') || clock.starts_with('-') {
        return None;
    }

    let hour = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            }
        }
        None => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

const FULL_DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%d %b %Y", "%d %B %Y",
];

const YEARLESS_FORMATS: &[(&str, char)] = &[
    ("%d/%m/%Y", '/'),
    ("%d-%m-%Y", '-'),
    ("%d %b %Y", ' '),
    ("%d %B %Y", ' '),
];

/// Parses a calendar date typed in chat.
///
/// Dates without a year take the year of `today`, rolling over to the next
/// year when that would land before `today`. Past-date rejection is left to
/// the caller.
pub fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return None;
    }

    for format in FULL_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return Some(date);
        }
    }

    for (format, sep) in YEARLESS_FORMATS {
        let with_year = format!("{cleaned}{sep}{}", today.year());
        if let Ok(date) = NaiveDate::parse_from_str(&with_year, format) {
            if date >= today {
                return Some(date);
            }
            return date.with_year(today.year() + 1);
        }
    }
    None
}

/// The calendar date at `now` in the given zone.
pub fn local_today(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// Combines a local date and time into a UTC instant.
pub fn to_utc(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|local| local.with_timezone(&Utc))
}

/// Customer-facing rendering, e.g. `17 Oct 2026, 11:59 PM`.
pub fn format_local(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset)
        .format("%d %b %Y, %I:%M %p")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap()
    }

    #[test]
    fn twelve_hour_inputs() {
        assert_eq!(parse_time("6:00 PM"), Some(t(18, 0)));
        assert_eq!(parse_time("11:59 PM"), Some(t(23, 59)));
        assert_eq!(parse_time("6pm"), Some(t(18, 0)));
        assert_eq!(parse_time("7:05 a.m."), Some(t(7, 5)));
        assert_eq!(parse_time("12 am"), Some(t(0, 0)));
        assert_eq!(parse_time("12:30 PM"), Some(t(12, 30)));
    }

    #[test]
    fn twenty_four_hour_inputs() {
        assert_eq!(parse_time("18:30"), Some(t(18, 30)));
        assert_eq!(parse_time("07.05"), Some(t(7, 5)));
        assert_eq!(parse_time("00:00"), Some(t(0, 0)));
    }

    #[test]
    fn rejected_times() {
        for bad in ["", "18", "25:00", "13 pm", "0 am", "6:5 pm", "soon", "6:60", "-1:00"] {
            assert_eq!(parse_time(bad), None, "{bad}");
        }
    }

    #[test]
    fn full_dates() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let expected = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
        for input in ["25/10/2026", "25-10-2026", "2026-10-25", "25 Oct 2026", "25 October 2026"] {
            assert_eq!(parse_date(input, today), Some(expected), "{input}");
        }
    }

    #[test]
    fn yearless_dates_roll_forward() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(
            parse_date("25/10", today),
            NaiveDate::from_ymd_opt(2026, 10, 25)
        );
        assert_eq!(
            parse_date("5 Jan", today),
            NaiveDate::from_ymd_opt(2027, 1, 5)
        );
        assert_eq!(parse_date("17/10", today), Some(today));
    }

    #[test]
    fn past_full_date_is_returned_for_caller_to_reject() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(
            parse_date("16/10/2026", today),
            NaiveDate::from_ymd_opt(2026, 10, 16)
        );
        assert_eq!(parse_date("31/02/2026", today), None);
        assert_eq!(parse_date("next week", today), None);
    }

    #[test]
    fn local_conversion_uses_fixed_offset() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let utc = to_utc(date, t(23, 59), ist()).unwrap();
        assert_eq!(utc.to_rfc3339(), "2026-10-17T18:29:00+00:00");
        assert_eq!(local_today(utc, ist()), date);
        assert_eq!(format_local(utc, ist()), "17 Oct 2026, 11:59 PM");
    }

    #[test]
    fn local_today_crosses_midnight_before_utc() {
        let utc = Utc.with_ymd_and_hms(2026, 10, 17, 19, 0, 0).unwrap();
        assert_eq!(
            local_today(utc, ist()),
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
        );
    }

    proptest! {
        #[test]
        fn every_12h_time_parses(h in 1u32..=12, m in 0u32..60, pm in any::<bool>()) {
            let input = format!("{h}:{m:02} {}", if pm { "PM" } else { "AM" });
            let parsed = parse_time(&input).unwrap();
            let expected_hour = match (h, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            prop_assert_eq!(parsed, t(expected_hour, m));
        }

        #[test]
        fn parse_time_never_panics(s in ".{0,16}") {
            let _ = parse_time(&s);
        }
    }
}
