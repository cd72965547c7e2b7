// src/lib.rs

//! Wayback Machine forum harvester library

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
