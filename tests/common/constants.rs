//! Shared constants for end-to-end tests

pub const ACCOUNT_NUMBER: &str = "123456";

pub const API_KEY: &str = "kkJ4K3dHoHqZzNvoDJ";

/// `Basic` credentials for `API_KEY` used as both username and password.
pub const EXPECTED_AUTHORIZATION: &str = "Basic a2tKNEszZEhvSHFaek52b0RKOmtrSjRLM2RIb0hxWnpOdm9ESg==";

pub const AUDIT_USER: &str = "pgibbons@initech.com";

pub const BOOK_FILE_NAME: &str = "MOCK_BOUND_BOOK.pdf";

pub const BOOK_CONTENT: &[u8] = b"Guns. Lots of guns.";

/// How long to wait for an asynchronous condition before failing a test
pub const WAIT_TIMEOUT_MS: u64 = 5_000;
