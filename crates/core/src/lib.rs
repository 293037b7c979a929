#![deny(warnings)]

pub mod camera;
pub mod classify;
pub mod config;
pub mod display;
pub mod respond;
pub mod server;
pub mod session;
pub mod stabilize;
pub mod state;
pub mod util;
