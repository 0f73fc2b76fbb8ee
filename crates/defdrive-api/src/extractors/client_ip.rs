//! `ClientIp` extractor: the address link restrictions are checked against.
//!
//! The TCP peer address (`ConnectInfo`) is authoritative. `X-Forwarded-For`
//! and `X-Real-IP` are only read when the peer is a configured trusted proxy,
//! otherwise any caller could claim an allow-listed address.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use ipnet::IpNet;

use defdrive_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// A parsed trusted proxy entry (either an IP or CIDR range).
#[derive(Debug, Clone)]
pub enum TrustedEntry {
    /// A single address.
    Ip(IpAddr),
    /// A network range.
    Cidr(IpNet),
}

/// Which peers may report the client address through headers.
#[derive(Debug, Clone)]
pub enum TrustedProxies {
    /// Never trust forwarded headers.
    None,
    /// Trust headers from every peer (development only).
    All,
    /// Trust headers only from these IPs/CIDRs.
    List(Vec<TrustedEntry>),
}

impl TrustedProxies {
    /// Parse `server.trusted_proxies`. Unparsable entries are logged and skipped.
    pub fn from_config(proxies: &[String]) -> Self {
        if proxies.is_empty() {
            return Self::None;
        }
        if proxies.iter().any(|p| p.trim() == "*") {
            return Self::All;
        }

        let entries = proxies
            .iter()
            .map(|p| p.trim())
            .filter_map(|p| {
                if p.contains('/') {
                    match p.parse::<IpNet>() {
                        Ok(net) => Some(TrustedEntry::Cidr(net)),
                        Err(e) => {
                            tracing::warn!(entry = p, error = %e, "Invalid CIDR in trusted_proxies");
                            None
                        }
                    }
                } else {
                    match p.parse::<IpAddr>() {
                        Ok(ip) => Some(TrustedEntry::Ip(ip.to_canonical())),
                        Err(e) => {
                            tracing::warn!(entry = p, error = %e, "Invalid IP in trusted_proxies");
                            None
                        }
                    }
                }
            })
            .collect();
        Self::List(entries)
    }

    /// Whether headers from this peer are believed.
    pub fn is_trusted(&self, peer: IpAddr) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::List(entries) => entries.iter().any(|entry| match entry {
                TrustedEntry::Ip(trusted) => *trusted == peer,
                TrustedEntry::Cidr(network) => network.contains(&peer),
            }),
        }
    }

    /// Resolve the client address for a request from `peer`.
    pub fn client_ip(&self, peer: IpAddr, headers: &HeaderMap) -> IpAddr {
        let peer = peer.to_canonical();
        if !self.is_trusted(peer) {
            return peer;
        }
        forwarded_ip(headers).unwrap_or(peer)
    }
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header_ip = |name: &str, first_hop: bool| {
        let value = headers.get(name)?.to_str().ok()?;
        let value = if first_hop {
            value.split(',').next()?
        } else {
            value
        };
        value.trim().parse::<IpAddr>().ok().map(|ip| ip.to_canonical())
    };

    header_ip("x-forwarded-for", true).or_else(|| header_ip("x-real-ip", false))
}

/// The resolved client address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ConnectInfo(peer) = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .copied()
            .ok_or_else(|| AppError::internal("Peer address unavailable; serve with connect info"))?;

        Ok(ClientIp(
            state.trusted_proxies.client_ip(peer.ip(), &parts.headers),
        ))
    }
}
