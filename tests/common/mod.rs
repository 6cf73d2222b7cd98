#![allow(dead_code)]

//! Common test infrastructure
//!
//! Integration tests import from this module only.

mod constants;
mod fixtures;
mod mock_api;

#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{free_port, test_settings};
#[cfg(unix)]
#[allow(unused_imports)]
pub use fixtures::write_settings_file;
#[allow(unused_imports)]
pub use mock_api::{MockConfig, MockFastbound, SignResponse};
