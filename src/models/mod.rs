// src/models/mod.rs
pub mod auth;
pub mod media;
pub mod script;

pub use media::*;
pub use script::*;
