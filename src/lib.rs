//! Checks a list of HTTP sites and emails their recipients when a site goes
//! down or comes back up. Last known status is kept between runs so each
//! transition is reported once; an external scheduler triggers each run.

pub mod config;
pub mod engine;
pub mod error;
pub mod factory;
pub mod models;
pub mod notify;
pub mod probe;
pub mod store;
pub mod utils;
