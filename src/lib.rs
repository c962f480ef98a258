#![forbid(unsafe_code)]

pub use botapi;

pub mod config;
pub mod errors;
pub mod ledger;
pub mod messenger;
pub mod model;
pub mod router;
pub mod util;
