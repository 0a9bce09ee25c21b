//! Ignis Core
//!
//! Core types shared between the orchestrator and the backend client.
//!
//! This crate contains:
//! - Event types: the decoded GitHub `workflow_job` event and runner
//!   identity derivation
//! - Spec types: the microVM create request sent to a backend host and
//!   the instance records it returns

pub mod event;
pub mod spec;
