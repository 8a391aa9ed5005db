// src/lib.rs

//! Poll-notice archive library
//!
//! Keeps a local, incrementally synchronized copy of the documents published
//! on the poll-notice registry and derives a filterable catalog from it.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
