//! Decibel / linear gain conversion for per-channel track volumes

/// Lowest volume the UI can express
pub const MIN_DB: f64 = -150.0;
/// Highest volume the UI can express
pub const MAX_DB: f64 = 24.0;

pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Inverse of [`db_to_linear`]. Silence maps to [`MIN_DB`].
pub fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        return MIN_DB;
    }
    20.0 * linear.log10()
}

pub fn clamp_db(db: f64) -> f64 {
    db.clamp(MIN_DB, MAX_DB)
}
