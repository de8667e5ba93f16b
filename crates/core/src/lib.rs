#![deny(warnings)]

pub mod camera;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod detector;
pub mod mirror;
pub mod mood;
pub mod reveal;
pub mod voice;
pub mod weather;
