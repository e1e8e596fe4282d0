//! Authentication support components.
//!
//! Credential checking and token issuance live outside this crate; only the
//! failed-login throttle is part of the core.

pub mod throttle;

pub use throttle::LoginThrottle;
