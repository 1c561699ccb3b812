//! hostsync - keep a marked block of the hosts file in sync with a remote source.

pub mod backup;
pub mod block;
pub mod cli;
pub mod config;
pub mod doctor;
pub mod error;
pub mod fetch;
pub mod hosts;
pub mod logging;
pub mod platform;
pub mod state;
pub mod store;
pub mod sync;
