//! Restriction evaluation for access links.
//!
//! [`evaluate`] is a pure function of the record, its file and the request.
//! Checks run in a fixed order and the first failure is the reported reason:
//!
//! 1. visibility (anonymous callers need both the file and the link public)
//! 2. expiry
//! 3. one-time use
//! 4. subnet allow-list
//! 5. IP allow-list
//! 6. TTL budget
//!
//! An admitted request carries the [`Mutations`] the committer must persist
//! before anything is served.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use ipnet::IpNet;
use serde::Serialize;
use uuid::Uuid;

use defdrive_entity::access::AccessRecord;
use defdrive_entity::file::File;

/// Who is making a link request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// No valid bearer token was presented.
    Anonymous,
    /// A signed-in user.
    User(Uuid),
}

impl Caller {
    /// Whether the caller presented valid credentials.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

/// Everything about the inbound request the evaluator looks at.
#[derive(Debug, Clone)]
pub struct LinkRequest {
    /// Client IP as seen by the server.
    pub client_ip: String,
    /// Caller identity.
    pub caller: Caller,
    /// Evaluation instant.
    pub now: DateTime<Utc>,
}

/// State changes owed by an admitted request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mutations {
    /// Set `used = true`.
    pub mark_used: bool,
    /// Decrement `ttl` by one.
    pub decrement_ttl: bool,
}

impl Mutations {
    /// Whether there is nothing to persist.
    pub fn is_empty(&self) -> bool {
        !self.mark_used && !self.decrement_ttl
    }

    /// Apply to a record in place. `ttl` saturates at zero.
    pub fn apply(&self, record: &mut AccessRecord) {
        if self.mark_used {
            record.used = true;
        }
        if self.decrement_ttl {
            record.ttl = (record.ttl - 1).max(0);
        }
    }
}

/// Why a link request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DenyReason {
    /// Unknown link, or its file is gone.
    NotFound,
    /// Anonymous caller on a link or file that is not public.
    NotPublic,
    /// The expiry instant has passed or cannot be parsed.
    Expired,
    /// One-time link already consumed.
    AlreadyUsed,
    /// Client IP outside every allowed subnet.
    SubnetNotAllowed,
    /// Client IP not in the allowed list.
    #[serde(rename = "IPNotAllowed")]
    IpNotAllowed,
    /// Hop budget spent.
    #[serde(rename = "TTLExhausted")]
    TtlExhausted,
    /// Lost too many commit races against concurrent requests.
    Conflict,
}

impl DenyReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::NotPublic => "NotPublic",
            Self::Expired => "Expired",
            Self::AlreadyUsed => "AlreadyUsed",
            Self::SubnetNotAllowed => "SubnetNotAllowed",
            Self::IpNotAllowed => "IPNotAllowed",
            Self::TtlExhausted => "TTLExhausted",
            Self::Conflict => "Conflict",
        }
    }

    /// Human-readable explanation.
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotFound => "Access link not found",
            Self::NotPublic => "This link is not publicly accessible",
            Self::Expired => "This link has expired",
            Self::AlreadyUsed => "This one-time link has already been used",
            Self::SubnetNotAllowed => "Access is not allowed from your network",
            Self::IpNotAllowed => "Access is not allowed from your IP address",
            Self::TtlExhausted => "This link has no remaining uses",
            Self::Conflict => "The link is busy, please retry",
        }
    }

    /// HTTP status the API should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            _ => 403,
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of evaluating one request against one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Serve the file after persisting these mutations.
    Admit(Mutations),
    /// Refuse with this reason.
    Deny(DenyReason),
}

/// Decide whether `request` may use `record`.
pub fn evaluate(record: &AccessRecord, file: &File, request: &LinkRequest) -> Decision {
    match first_violation(record, file, request) {
        Some(reason) => Decision::Deny(reason),
        None => Decision::Admit(Mutations {
            mark_used: record.one_time_use,
            decrement_ttl: record.enable_ttl,
        }),
    }
}

fn first_violation(record: &AccessRecord, file: &File, request: &LinkRequest) -> Option<DenyReason> {
    if !request.caller.is_authenticated() && !(file.public && record.public) {
        return Some(DenyReason::NotPublic);
    }

    match record.parsed_expiry() {
        Ok(Some(expires)) if request.now > expires => return Some(DenyReason::Expired),
        Err(_) => return Some(DenyReason::Expired),
        _ => {}
    }

    if record.one_time_use && record.used {
        return Some(DenyReason::AlreadyUsed);
    }

    let client_ip = request.client_ip.parse::<IpAddr>().ok();

    if !record.subnets.is_empty() && !in_any_subnet(client_ip, &record.subnets) {
        return Some(DenyReason::SubnetNotAllowed);
    }

    if !record.ips.is_empty() && !record.ips.iter().any(|ip| *ip == request.client_ip) {
        return Some(DenyReason::IpNotAllowed);
    }

    if record.ttl_exhausted() {
        return Some(DenyReason::TtlExhausted);
    }

    None
}

fn in_any_subnet(client_ip: Option<IpAddr>, subnets: &[String]) -> bool {
    let Some(ip) = client_ip else {
        return false;
    };
    subnets
        .iter()
        .filter_map(|cidr| cidr.trim().parse::<IpNet>().ok())
        .any(|net| net.contains(&ip))
}
