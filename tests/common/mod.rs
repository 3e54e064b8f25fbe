//! Common test utilities and mock implementations

#![allow(dead_code)]

pub mod mock_bus;

pub use mock_bus::{MockBus, MockDelay, MockError, Operation};
