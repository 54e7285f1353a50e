pub mod fingerprint;
pub mod session;
