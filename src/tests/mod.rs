//! Consolidated test modules.
//!
//! In-process end-to-end tests that drive the full router against
//! wiremock-backed upstream endpoints.

mod report_e2e;
