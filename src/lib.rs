#![deny(clippy::semicolon_if_nothing_returned)]
#![deny(clippy::unnecessary_semicolon)]
#![deny(clippy::explicit_iter_loop)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::unwrap_or_default)]

pub mod marshal;
pub mod parameter;
pub mod params;
pub mod provider;
pub mod query;
pub mod rw;
pub mod store;
pub mod types;
