//! Background delivery for starling.
//!
//! A single supervised worker drains the durable delivery queue, signing
//! and POSTing each item to its inbox with bounded, exponentially backed
//! off retries.

pub mod worker;

pub use worker::{CycleStats, DeliveryWorker, MAX_ATTEMPTS, WorkerHandle, backoff_for};
