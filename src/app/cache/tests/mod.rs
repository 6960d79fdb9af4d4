//! Cache integration tests
//!
//! Several `FetchingCache` instances sharing one root stand in for separate
//! processes on the same host.
