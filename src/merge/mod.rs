pub mod config;
pub mod engine;
pub mod fingerprint;
pub mod keys;
pub mod ledger;
pub mod matches;
pub mod paths;
pub mod source;
