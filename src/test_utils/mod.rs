//! the test_utils folder here will share fixtures and helpers between the
//! unit tests of every module

pub use common::*;
pub use fixtures::*;
