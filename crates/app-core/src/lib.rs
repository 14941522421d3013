pub mod boundary;
pub mod config;
pub mod error;
pub mod extractors;
pub mod identity;
pub mod logging;
pub mod middleware;
pub mod rejection;
pub mod time;
