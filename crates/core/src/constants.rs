//! Constants used throughout the cabinet core crate.
//!
//! Defaults for configuration and domain conventions live here so that the
//! controllers and the CLI agree on them.

/// Default suffix appended to consultation amounts ("50" becomes "50 DT").
pub const DEFAULT_CURRENCY_SUFFIX: &str = "DT";

/// Default cap on the number of items the command palette shows.
pub const DEFAULT_PALETTE_LIMIT: usize = 12;

/// Default international dialling prefix used for messaging deep links.
pub const DEFAULT_PHONE_COUNTRY_CODE: &str = "216";

/// Length of the trailing "week" range window, anchor day included.
pub const WEEK_RANGE_DAYS: i64 = 7;

/// Base URL of the messaging deep link.
pub const WHATSAPP_BASE_URL: &str = "https://wa.me/";

/// Prefix of prescription identifiers (`ORD-2026-001`).
pub const PRESCRIPTION_ID_PREFIX: &str = "ORD";

/// Reference date the bundled demo data is pinned to.
pub const DEMO_REFERENCE_DATE: &str = "2026-02-20";

/// Environment variable holding the reference date override.
pub const TODAY_ENV_VAR: &str = "CABINET_TODAY";

/// Environment variable pointing at a YAML seed file.
pub const SEED_ENV_VAR: &str = "CABINET_SEED";
