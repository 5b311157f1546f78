//! Action bits and provisioning constants

// Action bit constants
pub const VIEW: u8 = 1;
pub const CREATE: u8 = 1 << 1;
pub const EDIT: u8 = 1 << 2;
pub const DELETE: u8 = 1 << 3;
pub const MANAGE: u8 = 1 << 4;

// Length of the trial a freshly provisioned tenant starts on
pub const TRIAL_DAYS: i64 = 14;

pub const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

// Upper bound on `-N` suffixes tried when making a tenant slug unique
pub const MAX_SLUG_SUFFIX: u32 = 10_000;
