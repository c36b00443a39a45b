//! Peer-facing bookkeeping: the peer table and the syn-cookie handshake
//! state. Transport sockets live elsewhere; everything here is pure state
//! driven by explicit timestamps so it can be tested without a clock.

pub mod peers;
pub mod syn_cookies;

pub use peers::{PeerContainer, PeerInfo};
pub use syn_cookies::SynCookies;
