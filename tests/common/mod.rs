//! Shared test utilities for executor, processor and property tests.
//!
//! This module provides:
//! - Recording mocks for the history engine, domain cache and both resenders
//! - Task builders

#![allow(dead_code)]

pub mod mock_domain;
pub mod mock_engine;
pub mod mock_resend;
pub mod tasks;

pub use mock_domain::*;
pub use mock_engine::*;
pub use mock_resend::*;
pub use tasks::*;
