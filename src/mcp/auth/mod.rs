//! Planday session management.
//!
//! - `exchange`: the OAuth2 refresh-token grant
//! - `authority`: the shared session and its refresh policy

mod authority;
mod exchange;

pub use authority::SessionAuthority;
pub use exchange::OAuthExchanger;
