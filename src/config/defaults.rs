/// Polling interval, also the requested device buffer duration (milliseconds).
pub const DEFAULT_INTERVAL_MS: u64 = 50;
pub const MIN_INTERVAL_MS: u64 = 1;
pub const MAX_INTERVAL_MS: u64 = 10_000;

/// Gate threshold on the 0-100 amplitude scale.
pub const DEFAULT_THRESHOLD: u32 = 50;
pub const MIN_THRESHOLD: u32 = 0;
pub const MAX_THRESHOLD: u32 = 100;

pub const DEFAULT_KEY: &str = "space";

pub(super) const MAX_DEVICE_NAME_LEN: usize = 256;
