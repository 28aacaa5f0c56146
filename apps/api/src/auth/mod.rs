//! Email/password accounts and bearer-token sessions.

pub mod extractor;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod policy;
pub mod users;
