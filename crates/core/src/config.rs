//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the controllers. Controllers never read environment variables or the wall clock
//! themselves; the reference date used by range filters is decided here and nowhere else.

use crate::constants::{
    DEFAULT_CURRENCY_SUFFIX, DEFAULT_PALETTE_LIMIT, DEFAULT_PHONE_COUNTRY_CODE,
    DEMO_REFERENCE_DATE,
};
use crate::dates::parse_date;
use crate::error::{CabinetError, CabinetResult};
use chrono::NaiveDate;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    today: NaiveDate,
    palette_limit: Option<usize>,
    currency_suffix: String,
    phone_country_code: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `palette_limit` of `None` leaves the palette uncapped; `Some(0)` is rejected.
    pub fn new(
        today: NaiveDate,
        palette_limit: Option<usize>,
        currency_suffix: String,
        phone_country_code: String,
    ) -> CabinetResult<Self> {
        let currency_suffix = currency_suffix.trim().to_string();
        if currency_suffix.is_empty() {
            return Err(CabinetError::InvalidInput(
                "currency_suffix cannot be empty".into(),
            ));
        }

        if palette_limit == Some(0) {
            return Err(CabinetError::InvalidInput(
                "palette_limit must be at least 1".into(),
            ));
        }

        if !phone_country_code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CabinetError::InvalidInput(
                "phone_country_code must contain digits only".into(),
            ));
        }

        Ok(Self {
            today,
            palette_limit,
            currency_suffix,
            phone_country_code,
        })
    }

    /// Configuration with default conventions anchored on `today`.
    pub fn with_today(today: NaiveDate) -> Self {
        Self {
            today,
            palette_limit: Some(DEFAULT_PALETTE_LIMIT),
            currency_suffix: DEFAULT_CURRENCY_SUFFIX.to_string(),
            phone_country_code: DEFAULT_PHONE_COUNTRY_CODE.to_string(),
        }
    }

    /// Configuration pinned to the date the bundled demo data was written against.
    pub fn demo() -> Self {
        let today = NaiveDate::parse_from_str(DEMO_REFERENCE_DATE, "%Y-%m-%d")
            .unwrap_or(NaiveDate::MIN);
        Self::with_today(today)
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn palette_limit(&self) -> Option<usize> {
        self.palette_limit
    }

    pub fn currency_suffix(&self) -> &str {
        &self.currency_suffix
    }

    pub fn phone_country_code(&self) -> &str {
        &self.phone_country_code
    }
}

/// Resolve the reference date from an optional override value.
///
/// If `value` is `None` or empty/whitespace, the local wall-clock date is used. Otherwise the
/// value must parse as an ISO or short French date.
pub fn resolve_today(value: Option<String>) -> CabinetResult<NaiveDate> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        Some(v) => parse_date(&v),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_currency_suffix() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 20).expect("valid date");
        let err = CoreConfig::new(today, Some(12), "  ".into(), "216".into())
            .expect_err("empty suffix");
        assert!(matches!(err, CabinetError::InvalidInput(msg) if msg.contains("currency_suffix")));
    }

    #[test]
    fn rejects_zero_palette_limit() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 20).expect("valid date");
        let err =
            CoreConfig::new(today, Some(0), "DT".into(), "216".into()).expect_err("zero limit");
        assert!(matches!(err, CabinetError::InvalidInput(msg) if msg.contains("palette_limit")));
    }

    #[test]
    fn demo_config_is_pinned() {
        let cfg = CoreConfig::demo();
        assert_eq!(cfg.today(), NaiveDate::from_ymd_opt(2026, 2, 20).expect("valid"));
        assert_eq!(cfg.currency_suffix(), "DT");
        assert_eq!(cfg.palette_limit(), Some(12));
    }

    #[test]
    fn resolve_today_prefers_override() {
        let date = resolve_today(Some(" 20 Fév 2026 ".into())).expect("parse override");
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 2, 20).expect("valid"));
        assert!(resolve_today(Some("not a date".into())).is_err());
        assert!(resolve_today(Some("   ".into())).is_ok());
    }
}
