//! OAuth 2.1 authorization server core.
//!
//! Issues and redeems single-use authorization codes, validates PKCE proofs,
//! authenticates clients via private-key JWT assertions, and mints bearer
//! access/refresh tokens.

pub mod config;
pub mod errors;
pub mod http;
pub mod oauth;
pub mod storage;
