use anyhow::{Context, Result, anyhow, bail};
use dotenvy::dotenv;
use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use strum_macros::EnumString;

use crate::attendance::geofence::{Campus, Geofence};
use crate::services::helpdesk::HelpDesk;
use crate::utils::date_key::{DEFAULT_DAY_OFFSET_MINUTES, DayCalendar};
use crate::utils::geo::LatLng;
use crate::utils::identity::DEFAULT_LOGIN_DOMAIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StoreBackend {
    Mysql,
    Memory,
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub login_domain: String,

    pub calendar: DayCalendar,
    pub geofence: Geofence,
    pub location_timeout_secs: u64,

    pub photo_root: String,
    pub photo_public_base: String,
    pub profile_cache_capacity: u64,

    pub help: HelpDesk,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests don't touch the
    /// process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| var(key).with_context(|| format!("{key} must be set"));

        let store_backend: StoreBackend = parse_or(&var, "STORE_BACKEND", StoreBackend::Mysql)?;
        let database_url = var("DATABASE_URL");
        if store_backend == StoreBackend::Mysql && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORE_BACKEND=mysql");
        }

        let offset: i32 = parse_or(&var, "DAY_OFFSET_MINUTES", DEFAULT_DAY_OFFSET_MINUTES)?;
        let calendar = DayCalendar::new(offset)
            .ok_or_else(|| anyhow!("DAY_OFFSET_MINUTES out of range: {offset}"))?;

        let radius_m: f64 = required("GEOFENCE_RADIUS_M")?
            .trim()
            .parse()
            .context("GEOFENCE_RADIUS_M must be a number")?;
        if !radius_m.is_finite() || radius_m <= 0.0 {
            bail!("GEOFENCE_RADIUS_M must be a positive number of meters");
        }
        let default_campus = parse_center(&required("GEOFENCE_DEFAULT_CENTER")?)
            .context("GEOFENCE_DEFAULT_CENTER")?;
        let branches = match var("GEOFENCE_BRANCHES") {
            Some(raw) => parse_branches(&raw).context("GEOFENCE_BRANCHES")?,
            None => HashMap::new(),
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            store_backend,
            database_url,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or(&var, "ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parse_or(&var, "REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: parse_or(&var, "RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: parse_or(&var, "RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parse_or(&var, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: var("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            login_domain: var("LOGIN_DOMAIN").unwrap_or_else(|| DEFAULT_LOGIN_DOMAIN.to_string()),

            calendar,
            geofence: Geofence::new(branches, default_campus, radius_m),
            location_timeout_secs: parse_or(&var, "LOCATION_TIMEOUT_SECS", 10)?,

            photo_root: var("PHOTO_ROOT").unwrap_or_else(|| "uploads".to_string()),
            photo_public_base: var("PHOTO_PUBLIC_BASE").unwrap_or_else(|| "/uploads".to_string()),
            profile_cache_capacity: parse_or(&var, "PROFILE_CACHE_CAPACITY", 10_000)?,

            help: HelpDesk {
                phone: var("HELP_PHONE").unwrap_or_default(),
                country_code: var("HELP_COUNTRY_CODE").unwrap_or_else(|| "91".to_string()),
                whatsapp_message: var("HELP_WHATSAPP_MESSAGE")
                    .unwrap_or_else(|| "Hello, I need help with the student portal.".to_string()),
            },
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {key}={raw:?}: {e}")),
        None => Ok(default),
    }
}

/// `"ABS Main:19.28,73.05"`
pub fn parse_center(raw: &str) -> Result<Campus> {
    let (name, coords) = raw
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("expected name:lat,lng, got {raw:?}"))?;
    let (lat, lng) = coords
        .split_once(',')
        .ok_or_else(|| anyhow!("expected lat,lng, got {coords:?}"))?;

    let center = LatLng::new(lat.trim().parse()?, lng.trim().parse()?);
    if !center.is_finite() || name.trim().is_empty() {
        bail!("invalid campus {raw:?}");
    }
    Ok(Campus {
        name: name.trim().to_string(),
        center,
    })
}

/// `{"Bhiwandi": {"name": "ABS Bhiwandi", "center": {"lat": 19.28, "lng": 73.05}}}`
pub fn parse_branches(raw: &str) -> Result<HashMap<String, Campus>> {
    let branches: HashMap<String, Campus> = serde_json::from_str(raw)?;
    if let Some((branch, _)) = branches.iter().find(|(_, c)| !c.center.is_finite()) {
        bail!("branch {branch:?} has a non-finite center");
    }
    Ok(branches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("SERVER_ADDR", "127.0.0.1:8080"),
        ("STORE_BACKEND", "memory"),
        ("JWT_SECRET", "secret"),
        ("GEOFENCE_RADIUS_M", "50"),
        ("GEOFENCE_DEFAULT_CENTER", "ABS Main:19.4189,72.8181"),
    ];

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_lookup(lookup(BASE)).unwrap();
        assert_eq!(cfg.store_backend, StoreBackend::Memory);
        assert_eq!(cfg.access_token_ttl, 900);
        assert_eq!(cfg.api_prefix, "/api");
        assert_eq!(cfg.login_domain, "abs-login.local");
        assert_eq!(cfg.location_timeout_secs, 10);
        assert_eq!(cfg.geofence.radius_m(), 50.0);
        assert_eq!(cfg.geofence.campus_for(Some("Nowhere")).name, "ABS Main");
        assert_eq!(cfg.calendar.offset().local_minus_utc(), 330 * 60);
    }

    #[test]
    fn radius_is_required() {
        let pairs: Vec<_> = BASE
            .iter()
            .copied()
            .filter(|(k, _)| *k != "GEOFENCE_RADIUS_M")
            .collect();
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let pairs: Vec<_> = BASE
            .iter()
            .map(|&(k, v)| if k == "GEOFENCE_RADIUS_M" { (k, "-5") } else { (k, v) })
            .collect();
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn mysql_needs_database_url() {
        let mut pairs = BASE.to_vec();
        pairs.retain(|(k, _)| *k != "STORE_BACKEND");
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        pairs.push(("DATABASE_URL", "mysql://u:p@localhost/portal"));
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.store_backend, StoreBackend::Mysql);
    }

    #[test]
    fn branch_centers_parse() {
        let mut pairs = BASE.to_vec();
        pairs.push((
            "GEOFENCE_BRANCHES",
            r#"{"Bhiwandi": {"name": "ABS Bhiwandi", "center": {"lat": 19.2800029, "lng": 73.0549311}}}"#,
        ));
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.geofence.campus_for(Some("Bhiwandi")).name, "ABS Bhiwandi");
    }

    #[test]
    fn center_format() {
        let c = parse_center("ABS: Main:19.5,72.8").unwrap();
        assert_eq!(c.name, "ABS: Main");
        assert_eq!(c.center, LatLng::new(19.5, 72.8));
        assert!(parse_center("19.5,72.8").is_err());
        assert!(parse_center("Main:north,east").is_err());
    }
}
