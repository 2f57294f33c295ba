//! Input validation for endpoint URLs, event types, and credential scopes.
//!
//! URL checks cover protocol requirements (HTTPS unless HTTP is explicitly
//! allowed for dev/test) and SSRF protection against private and internal
//! destinations.

use std::net::IpAddr;

use crate::error::WebhookError;
use crate::models::{CommerceEventType, VALID_SCOPES};

// ---------------------------------------------------------------------------
// URL validation & SSRF protection
// ---------------------------------------------------------------------------

/// Validate a webhook destination URL.
///
/// `allow_http` is the dev/test switch: it permits plain-HTTP destinations
/// and skips the internal-host screen so local receivers can be registered.
/// Production keeps it off.
pub fn validate_endpoint_url(url: &str, allow_http: bool) -> Result<(), WebhookError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| WebhookError::InvalidUrl(format!("Invalid URL format: {e}")))?;

    match parsed.scheme() {
        "https" => {}
        "http" if allow_http => {}
        "http" => {
            return Err(WebhookError::InvalidUrl(
                "Webhook URLs must use HTTPS".to_string(),
            ));
        }
        scheme => {
            return Err(WebhookError::InvalidUrl(format!(
                "Unsupported URL scheme: {scheme}"
            )));
        }
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| WebhookError::InvalidUrl("URL must have a host".to_string()))?;

    if allow_http {
        return Ok(());
    }
    validate_host_not_internal(host)
}

/// Reject private/internal destination hosts.
///
/// Blocks loopback, RFC 1918 ranges, link-local (cloud metadata endpoints),
/// CGNAT, IPv6 loopback/unspecified, and well-known internal hostnames.
pub fn validate_host_not_internal(host: &str) -> Result<(), WebhookError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_internal_ip(&ip) {
            return Err(WebhookError::SsrfDetected(format!(
                "Destination host {host} is a private/internal address"
            )));
        }
    }

    let lower = host.to_ascii_lowercase();
    if lower == "localhost"
        || lower == "metadata.google.internal"
        || lower.ends_with(".internal")
        || lower.ends_with(".local")
    {
        return Err(WebhookError::SsrfDetected(format!(
            "Destination host {host} is a restricted internal hostname"
        )));
    }

    Ok(())
}

fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64) // 100.64.0.0/10
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

// ---------------------------------------------------------------------------
// Event type validation
// ---------------------------------------------------------------------------

/// Validate that `event_types` is non-empty and every entry is a known type.
pub fn validate_event_types(event_types: &[String]) -> Result<(), WebhookError> {
    if event_types.is_empty() {
        return Err(WebhookError::Validation(
            "At least one event type is required".to_string(),
        ));
    }
    for et in event_types {
        validate_event_type(et)?;
    }
    Ok(())
}

/// Validate a single event type string.
pub fn validate_event_type(event_type: &str) -> Result<(), WebhookError> {
    if CommerceEventType::parse(event_type).is_none() {
        return Err(WebhookError::Validation(format!(
            "Unknown event type: {event_type}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Scope validation
// ---------------------------------------------------------------------------

/// Validate that `scopes` is non-empty and every entry is a platform scope.
pub fn validate_scopes(scopes: &[String]) -> Result<(), WebhookError> {
    if scopes.is_empty() {
        return Err(WebhookError::Validation(
            "At least one scope is required".to_string(),
        ));
    }
    for scope in scopes {
        if !VALID_SCOPES.contains(&scope.as_str()) {
            return Err(WebhookError::Validation(format!(
                "Unknown scope: {scope}"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
