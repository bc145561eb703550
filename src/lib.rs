//! corebot — Core library for the hourly video scheduler.
//!
//! Scheduling, playback triggering and the poll loop live here.
//! The CLI consumes this crate.

pub mod app_core;
pub mod clock;
pub mod config;
pub mod error;
pub mod media;
pub mod player;
pub mod runtime;
pub mod schedule;
pub mod tracker;
pub mod trigger;
