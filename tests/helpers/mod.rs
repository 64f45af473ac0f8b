#![allow(dead_code)]
//! Shared fakes and harnesses for the integration tests.

pub mod app;
pub mod fake_git;
pub mod fake_probe;
