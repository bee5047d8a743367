//! Combinatorial batch image-variation engine.
//!
//! This library expands a sparse multi-category option selection into a
//! concrete list of generation jobs and drives them through an external
//! image-to-image service under a bounded concurrency cap, with two-tier
//! failure classification and independent retry ceilings.

pub mod app_state;
pub mod config;
pub mod models;
pub mod services;
