//! Due-date inference — turns free-text hints into concrete dates.
//!
//! Pure and deterministic given a fixed reference date. Business days
//! are Monday through Friday; no holiday calendar is modeled.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Default horizon when a hint is missing or unrecognized.
const DEFAULT_BUSINESS_DAYS: u32 = 10;

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Add `n` business days, walking one calendar day at a time and counting
/// only weekdays. The landing day is always a weekday.
pub fn add_business_days(start: NaiveDate, n: u32) -> NaiveDate {
    let mut current = start;
    let mut added = 0;
    while added < n {
        current = current + Days::new(1);
        if is_weekday(current) {
            added += 1;
        }
    }
    current
}

/// Next Friday strictly after `reference`. A Friday reference rolls to
/// the following Friday.
fn next_friday(reference: NaiveDate) -> NaiveDate {
    let until = (Weekday::Fri.num_days_from_monday() + 7
        - reference.weekday().num_days_from_monday())
        % 7;
    let until = if until == 0 { 7 } else { until };
    reference + Days::new(u64::from(until))
}

fn contains_any(hint: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| hint.contains(p))
}

/// Resolve a free-text due-date hint against `reference`.
///
/// Rules are evaluated in priority order; the first match wins. A missing
/// or unrecognized hint falls back to ten business days out.
pub fn resolve_due_date(raw_hint: Option<&str>, reference: NaiveDate) -> NaiveDate {
    if let Some(hint) = raw_hint {
        let hint = hint.to_lowercase();

        if contains_any(&hint, &["asap", "urgent", "immediately", "critical", "today"]) {
            return add_business_days(reference, 1);
        }
        if hint.contains("tomorrow") {
            return add_business_days(reference, 1);
        }
        if contains_any(&hint, &["this week", "end of week", "end of the week", "eow"]) {
            return next_friday(reference);
        }
        if hint.contains("next week") {
            return add_business_days(reference, 5);
        }
        if contains_any(&hint, &["two weeks", "2 weeks", "couple weeks"]) {
            return add_business_days(reference, 10);
        }
        if contains_any(&hint, &["next month", "end of month", "eom"]) {
            return add_business_days(reference, 15);
        }
    }
    add_business_days(reference, DEFAULT_BUSINESS_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 2026-03-04 is a Wednesday, 2026-03-06 a Friday, 2026-03-09 a Monday.

    #[test]
    fn urgent_hint_lands_next_business_day() {
        let wednesday = date(2026, 3, 4);
        let due = resolve_due_date(Some("this is urgent, please handle asap"), wednesday);
        assert_eq!(due, date(2026, 3, 5)); // Thursday
    }

    #[test]
    fn urgent_on_friday_skips_weekend() {
        let friday = date(2026, 3, 6);
        let due = resolve_due_date(Some("asap"), friday);
        assert_eq!(due, date(2026, 3, 9)); // Monday
        assert_eq!(due.weekday(), Weekday::Mon);
    }

    #[test]
    fn tomorrow_is_one_business_day() {
        let due = resolve_due_date(Some("by tomorrow"), date(2026, 3, 4));
        assert_eq!(due, date(2026, 3, 5));
    }

    #[test]
    fn this_week_lands_on_friday() {
        let due = resolve_due_date(Some("this week"), date(2026, 3, 4));
        assert_eq!(due, date(2026, 3, 6));
        assert_eq!(due.weekday(), Weekday::Fri);
    }

    #[test]
    fn this_week_on_friday_rolls_over() {
        let friday = date(2026, 3, 6);
        let due = resolve_due_date(Some("end of week"), friday);
        assert_eq!(due, date(2026, 3, 13)); // following Friday
    }

    #[test]
    fn next_week_is_five_business_days() {
        let monday = date(2026, 3, 2);
        let due = resolve_due_date(Some("next week"), monday);
        assert_eq!(due, date(2026, 3, 9));
        assert!(is_weekday(due));
    }

    #[test]
    fn two_weeks_is_ten_business_days() {
        let due = resolve_due_date(Some("in two weeks"), date(2026, 3, 2));
        assert_eq!(due, date(2026, 3, 16));
    }

    #[test]
    fn next_month_is_fifteen_business_days() {
        let due = resolve_due_date(Some("sometime next month"), date(2026, 3, 2));
        assert_eq!(due, date(2026, 3, 23));
    }

    #[test]
    fn empty_hint_defaults_to_ten_business_days() {
        let friday = date(2026, 3, 6);
        let due = resolve_due_date(Some(""), friday);
        // Two full business weeks forward, landing on a Friday.
        assert_eq!(due, date(2026, 3, 20));
        assert_eq!(due.weekday(), Weekday::Fri);
    }

    #[test]
    fn missing_hint_defaults_to_ten_business_days() {
        let due = resolve_due_date(None, date(2026, 3, 2));
        assert_eq!(due, date(2026, 3, 16));
    }

    #[test]
    fn unrecognized_hint_uses_default() {
        let due = resolve_due_date(Some("when the stars align"), date(2026, 3, 2));
        assert_eq!(due, date(2026, 3, 16));
    }

    #[test]
    fn urgent_wins_over_later_phrases() {
        // "asap" is rule 1 even when "next week" also appears.
        let due = resolve_due_date(Some("asap, next week at the latest"), date(2026, 3, 2));
        assert_eq!(due, date(2026, 3, 3));
    }

    #[test]
    fn hints_are_case_insensitive() {
        let due = resolve_due_date(Some("ASAP"), date(2026, 3, 4));
        assert_eq!(due, date(2026, 3, 5));
    }

    #[test]
    fn business_day_walk_never_lands_on_weekend() {
        let mut day = date(2026, 3, 1);
        for _ in 0..14 {
            for n in 1..=20 {
                assert!(is_weekday(add_business_days(day, n)));
            }
            day = day + Days::new(1);
        }
    }

    #[test]
    fn zero_business_days_is_identity() {
        let saturday = date(2026, 3, 7);
        assert_eq!(add_business_days(saturday, 0), saturday);
    }
}
