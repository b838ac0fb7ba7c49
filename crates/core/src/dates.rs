//! Date and time helpers for the short French display format.
//!
//! Records carry `chrono` values; this module renders them the way the practice
//! screens show them (`20 Fév 2026`, `09:00`) and parses user input back. Parsing
//! accepts ISO dates as well as the short or full French month names, with or
//! without accents.

use crate::error::{CabinetError, CabinetResult};
use chrono::{Datelike, NaiveDate, NaiveTime};

const SHORT_MONTHS: [&str; 12] = [
    "Jan", "Fév", "Mar", "Avr", "Mai", "Juin", "Juil", "Aoû", "Sep", "Oct", "Nov", "Déc",
];

// Matched against the folded (lowercase, unaccented) month token. `juin` and `juil`
// must come before any shorter prefix that would shadow them.
const MONTH_PREFIXES: [(&str, u32); 12] = [
    ("juin", 6),
    ("juil", 7),
    ("jan", 1),
    ("fev", 2),
    ("mar", 3),
    ("avr", 4),
    ("mai", 5),
    ("aou", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

/// Renders a date as `20 Fév 2026`.
pub fn format_date(date: NaiveDate) -> String {
    let month = SHORT_MONTHS[date.month0() as usize];
    format!("{} {} {}", date.day(), month, date.year())
}

/// Renders a time as `09:00`.
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Parses `2026-02-20`, `20 Fév 2026`, `20 fev. 2026` or `20 février 2026`.
pub fn parse_date(input: &str) -> CabinetResult<NaiveDate> {
    let text = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }

    let invalid = || CabinetError::InvalidDate(input.to_string());
    let parts: Vec<&str> = text.split_whitespace().collect();
    let [day, month, year] = parts.as_slice() else {
        return Err(invalid());
    };

    let day: u32 = day.parse().map_err(|_| invalid())?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month = month_number(month).ok_or_else(invalid)?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Parses `09:00` or `9h30`.
pub fn parse_time(input: &str) -> CabinetResult<NaiveTime> {
    let text = input.trim();
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%Hh%M"))
        .map_err(|_| CabinetError::InvalidTime(input.to_string()))
}

/// Serde adapter storing a time of day as `HH:MM`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_time(&text).map_err(serde::de::Error::custom)
    }
}

fn month_number(token: &str) -> Option<u32> {
    let folded = fold(token.trim_end_matches('.'));
    if folded.len() < 3 {
        return None;
    }
    MONTH_PREFIXES
        .iter()
        .find(|(prefix, _)| folded.starts_with(prefix))
        .map(|(_, month)| *month)
}

/// Lowercases and strips the accents that appear in French month names.
fn fold(token: &str) -> String {
    token
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'é' | 'è' | 'ê' => 'e',
            'û' | 'ù' => 'u',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn formats_short_french_dates() {
        assert_eq!(format_date(ymd(2026, 2, 20)), "20 Fév 2026");
        assert_eq!(format_date(ymd(2026, 12, 1)), "1 Déc 2026");
    }

    #[test]
    fn parses_display_and_iso_forms() {
        assert_eq!(parse_date("20 Fév 2026").expect("short"), ymd(2026, 2, 20));
        assert_eq!(parse_date("20 fev. 2026").expect("folded"), ymd(2026, 2, 20));
        assert_eq!(parse_date("3 juillet 2026").expect("full"), ymd(2026, 7, 3));
        assert_eq!(parse_date("2026-06-15").expect("iso"), ymd(2026, 6, 15));
    }

    #[test]
    fn rejects_ambiguous_or_impossible_dates() {
        assert!(matches!(parse_date("3 ju 2026"), Err(CabinetError::InvalidDate(_))));
        assert!(matches!(parse_date("31 Fév 2026"), Err(CabinetError::InvalidDate(_))));
        assert!(matches!(parse_date(""), Err(CabinetError::InvalidDate(_))));
    }

    #[test]
    fn parses_times() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).expect("valid time");
        assert_eq!(parse_time("09:00").expect("colon"), nine);
        assert_eq!(parse_time("9h00").expect("h"), nine);
        assert!(matches!(parse_time("25:00"), Err(CabinetError::InvalidTime(_))));
        assert_eq!(format_time(nine), "09:00");
    }
}
