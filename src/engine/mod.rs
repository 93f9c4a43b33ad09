//! # Engine Module
//!
//! Entity-component-system runtime.
//!
//! This module contains the ECS building blocks:
//! - Identifiers and signatures
//! - Component registration and dense storage
//! - Entity allocation
//! - System descriptors and the dependency graph
//! - Tick scheduling and performance counters
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod component;
pub mod storage;
pub mod entity;
pub mod systems;
pub mod graph;
pub mod perf;
pub mod scheduler;
pub mod manager;
