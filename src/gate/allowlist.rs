//! Target-host allowlist.
//!
//! An entry is either an exact hostname or a `*.<domain>` wildcard that
//! matches `<domain>` itself and every subdomain of it. Entries are checked in
//! the order they were configured and the first match wins.
//!
//! An empty allowlist permits every host. That is the behaviour operators get
//! when they leave the list blank, and it turns the relay into an open proxy
//! for whatever can reach it; the server logs a warning at startup when it
//! happens.

use std::fmt;

use url::{Host, Url};

use crate::{Error, Result};

/// A single allowlist entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowlistEntry {
    /// Exact hostname (stored lowercased)
    Exact(String),
    /// `*.<domain>` pattern; holds `<domain>` lowercased
    Wildcard(String),
}

impl AllowlistEntry {
    /// Parse an entry as written in configuration
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        match lowered.strip_prefix("*.") {
            Some(domain) => Self::Wildcard(domain.to_string()),
            None => Self::Exact(lowered),
        }
    }

    /// Whether `host` is covered by this entry (case-insensitive)
    #[must_use]
    pub fn matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        match self {
            Self::Exact(name) => host == *name,
            Self::Wildcard(domain) => {
                host == *domain
                    || host
                        .strip_suffix(domain.as_str())
                        .is_some_and(|rest| rest.ends_with('.'))
            }
        }
    }
}

impl fmt::Display for AllowlistEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::Wildcard(domain) => write!(f, "*.{domain}"),
        }
    }
}

/// Ordered, immutable set of permitted upstream hosts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowlist {
    entries: Vec<AllowlistEntry>,
}

impl Allowlist {
    /// Build an allowlist from configured entries, preserving their order
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|e| AllowlistEntry::parse(e.as_ref()))
                .collect(),
        }
    }

    /// An allowlist with no entries, which permits every host
    #[must_use]
    pub fn permit_all() -> Self {
        Self::default()
    }

    /// True when no entries are configured (all hosts permitted)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured entries in order
    #[must_use]
    pub fn entries(&self) -> &[AllowlistEntry] {
        &self.entries
    }

    /// First entry that matches `host`
    #[must_use]
    pub fn matching_entry(&self, host: &str) -> Option<&AllowlistEntry> {
        self.entries.iter().find(|entry| entry.matches(host))
    }

    /// Whether `host` may be contacted
    #[must_use]
    pub fn permits(&self, host: &str) -> bool {
        self.is_empty() || self.matching_entry(host).is_some()
    }

    /// Check `host` against the list
    ///
    /// # Errors
    ///
    /// Returns `Error::HostNotAllowed` naming the host when no entry matches.
    pub fn check(&self, host: &str) -> Result<()> {
        if self.permits(host) {
            Ok(())
        } else {
            Err(Error::HostNotAllowed(host.to_string()))
        }
    }

    /// Check the host component of `url`
    ///
    /// # Errors
    ///
    /// Returns `Error::HostNotAllowed` when the URL's host is not permitted.
    pub fn check_url(&self, url: &Url) -> Result<()> {
        self.check(&hostname(url).unwrap_or_default())
    }
}

/// Lowercased hostname of `url`, with IPv6 literals unbracketed
#[must_use]
pub fn hostname(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => Some(domain.to_ascii_lowercase()),
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}
