pub mod clock;
pub mod date_key;
pub mod geo;
pub mod identity;
pub mod profile_cache;
