//! Syn-cookie challenge state for the node-id handshake.
//!
//! A fresh 32-byte cookie is issued per connecting endpoint; the peer must
//! return it signed by its claimed node key. Outstanding cookies are capped
//! per IP and expire after a short cutoff.

use ferrite_crypto::verify_signature;
use ferrite_types::{Account, Signature};
use rand::RngCore;
use std::collections::HashMap;
use std::net::{Ipv6Addr, SocketAddrV6};

/// Outstanding-cookie cap per source IP.
const MAX_COOKIES_PER_IP: usize = 10;
/// Cookies older than this are purged.
pub const COOKIE_CUTOFF_SECS: u64 = 5;

struct CookieEntry {
    cookie: [u8; 32],
    created_at: u64,
}

pub struct SynCookies {
    cookies: HashMap<SocketAddrV6, CookieEntry>,
    per_ip: HashMap<Ipv6Addr, usize>,
}

impl SynCookies {
    pub fn new() -> Self {
        Self {
            cookies: HashMap::new(),
            per_ip: HashMap::new(),
        }
    }

    /// Issue a cookie for `endpoint`. Returns `None` when one is already
    /// outstanding or the source IP is at its cap.
    pub fn assign(
        &mut self,
        endpoint: &SocketAddrV6,
        now: u64,
        rng: &mut impl RngCore,
    ) -> Option<[u8; 32]> {
        if self.cookies.contains_key(endpoint) {
            return None;
        }
        let ip_count = self.per_ip.entry(*endpoint.ip()).or_insert(0);
        if *ip_count >= MAX_COOKIES_PER_IP {
            return None;
        }
        let mut cookie = [0u8; 32];
        rng.fill_bytes(&mut cookie);
        *ip_count += 1;
        self.cookies.insert(
            *endpoint,
            CookieEntry {
                cookie,
                created_at: now,
            },
        );
        Some(cookie)
    }

    /// Check a handshake response: the signature must verify over the
    /// stored cookie for the claimed account. A valid response consumes the
    /// cookie.
    pub fn validate(
        &mut self,
        endpoint: &SocketAddrV6,
        account: &Account,
        signature: &Signature,
    ) -> bool {
        let Some(entry) = self.cookies.get(endpoint) else {
            return false;
        };
        if !verify_signature(&entry.cookie, signature, &account.public_key()) {
            return false;
        }
        self.remove(endpoint);
        true
    }

    fn remove(&mut self, endpoint: &SocketAddrV6) {
        if self.cookies.remove(endpoint).is_some() {
            if let Some(count) = self.per_ip.get_mut(endpoint.ip()) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.per_ip.remove(endpoint.ip());
                }
            }
        }
    }

    /// Drop cookies created before `cutoff`.
    pub fn purge(&mut self, cutoff: u64) {
        let expired: Vec<SocketAddrV6> = self
            .cookies
            .iter()
            .filter(|(_, entry)| entry.created_at < cutoff)
            .map(|(endpoint, _)| *endpoint)
            .collect();
        for endpoint in expired {
            self.remove(&endpoint);
        }
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

impl Default for SynCookies {
    fn default() -> Self {
        Self::new()
    }
}
