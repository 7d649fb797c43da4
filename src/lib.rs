//! Devsync Library
//!
//! Directory-tree synchronization between a host directory and a
//! resource-constrained device, reachable either as a locally mounted
//! directory or through a request/response command channel.

pub mod backend;
pub mod engine;
pub mod entry;
pub mod local;
pub mod plan;
pub mod progress;
pub mod remote;
pub mod report;
