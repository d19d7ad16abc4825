//! Background Tasks Module
//!
//! # Tasks
//! - Expired entry sweep for the in-process store

mod cleanup;

pub use cleanup::spawn_cleanup_task;
