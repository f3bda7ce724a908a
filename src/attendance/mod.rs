pub mod device;
pub mod geofence;
pub mod normalizer;
pub mod punch;
