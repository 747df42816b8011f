//! Standard MAL wire error numbers
//!
//! Error bodies carry one of these `u32` values as their first element.
//! The block starts at 65536; numbers below that are reserved for
//! area/service-defined errors.

pub const DELIVERY_FAILED: u32 = 65536;
pub const DELIVERY_TIMEDOUT: u32 = 65537;
pub const DELIVERY_DELAYED: u32 = 65538;
pub const DESTINATION_UNKNOWN: u32 = 65539;
pub const DESTINATION_TRANSIENT: u32 = 65540;
pub const DESTINATION_LOST: u32 = 65541;
pub const AUTHENTICATION_FAIL: u32 = 65542;
pub const AUTHORISATION_FAIL: u32 = 65543;
pub const ENCRYPTION_FAIL: u32 = 65544;
pub const UNSUPPORTED_AREA: u32 = 65545;
pub const UNSUPPORTED_OPERATION: u32 = 65546;
pub const UNSUPPORTED_VERSION: u32 = 65547;
pub const BAD_ENCODING: u32 = 65548;
pub const INTERNAL: u32 = 65549;
pub const UNKNOWN: u32 = 65550;
pub const INCORRECT_STATE: u32 = 65551;
pub const TOO_MANY: u32 = 65552;
pub const SHUTDOWN: u32 = 65553;
