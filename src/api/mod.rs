// src/api/mod.rs

pub mod server;

pub use server::serve;
