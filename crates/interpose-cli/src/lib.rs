//! Interpose demo harness
//!
//! Wires a demo target, a console interceptor and a synthesized proxy
//! together, the way an application would use `interpose-engine`.

pub mod commands;
pub mod config;
pub mod demo;
pub mod output;
