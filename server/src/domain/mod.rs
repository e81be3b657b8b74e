//! Domain logic: authorization decisions, the review workflow, and
//! real-time delivery

pub mod access;
pub mod realtime;
pub mod workflow;
