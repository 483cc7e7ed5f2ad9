//! Human-readable descriptions of client IPs and user agents.
//!
//! Conversations record both the raw values and a short description. The
//! lookups are opaque to the rest of the crate: deployments with a GeoIP
//! database or a full user-agent parser can plug in their own [`Enricher`].

use std::net::IpAddr;

pub trait Enricher: Send + Sync {
    fn describe_ip(&self, ip: &str) -> String;
    fn describe_user_agent(&self, user_agent: &str) -> String;
}

/// Offline enricher that classifies addresses and recognises common browsers.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicEnricher;

const UNKNOWN: &str = "Unknown";

// Order matters: Edge and Opera UAs also contain "Chrome", Chrome UAs contain "Safari".
const BROWSERS: &[(&str, &str)] = &[
    ("Edg/", "Edge"),
    ("OPR/", "Opera"),
    ("Firefox/", "Firefox"),
    ("Chrome/", "Chrome"),
    ("Safari/", "Safari"),
    ("curl/", "curl"),
];

const SYSTEMS: &[(&str, &str)] = &[
    ("Android", "Android"),
    ("iPhone", "iOS"),
    ("iPad", "iOS"),
    ("Windows", "Windows"),
    ("Mac OS X", "macOS"),
    ("Linux", "Linux"),
];

impl Enricher for BasicEnricher {
    fn describe_ip(&self, ip: &str) -> String {
        let Ok(addr) = ip.trim().parse::<IpAddr>() else {
            return UNKNOWN.to_string();
        };

        let desc = match addr {
            IpAddr::V4(v4) if v4.is_loopback() => "Loopback",
            IpAddr::V4(v4) if v4.is_private() => "Private network",
            IpAddr::V4(v4) if v4.is_link_local() => "Link-local",
            IpAddr::V6(v6) if v6.is_loopback() => "Loopback",
            // fc00::/7 unique local
            IpAddr::V6(v6) if (v6.segments()[0] & 0xfe00) == 0xfc00 => "Private network",
            // fe80::/10
            IpAddr::V6(v6) if (v6.segments()[0] & 0xffc0) == 0xfe80 => "Link-local",
            _ => "Public network",
        };
        desc.to_string()
    }

    fn describe_user_agent(&self, user_agent: &str) -> String {
        let browser = BROWSERS
            .iter()
            .find(|(marker, _)| user_agent.contains(marker))
            .map(|(_, name)| *name);
        let system = SYSTEMS
            .iter()
            .find(|(marker, _)| user_agent.contains(marker))
            .map(|(_, name)| *name);

        match (browser, system) {
            (Some(b), Some(s)) => format!("{b} on {s}"),
            (Some(b), None) => b.to_string(),
            (None, Some(s)) => s.to_string(),
            (None, None) => UNKNOWN.to_string(),
        }
    }
}
