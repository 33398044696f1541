use std::net::{IpAddr, Ipv6Addr};

use thiserror::Error;
use url::{Host, Url};

/// Why a URL may not be fetched.
///
/// Icon URLs come from untrusted feed documents, so anything that could
/// reach internal services is refused before a request is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("Localhost not allowed")]
    Localhost,

    #[error("Private IP address not allowed: {0}")]
    PrivateIp(IpAddr),
}

/// Checks that `raw` is an http(s) URL pointing at a public host.
///
/// # Errors
///
/// Returns [`UrlValidationError`] if the URL does not parse, uses another
/// scheme, has no host, names localhost, or is a loopback, private,
/// link-local or unspecified IP literal.
///
/// # Examples
///
/// ```
/// use feedmill::util::validate_url;
///
/// assert!(validate_url("https://example.com/favicon.ico").is_ok());
/// assert!(validate_url("http://10.1.2.3/favicon.ico").is_err());
/// assert!(validate_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_url(raw: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(raw)?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlValidationError::UnsupportedScheme(url.scheme().to_owned()));
    }

    let ip = match url.host() {
        None => return Err(UrlValidationError::MissingHost),
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.');
            if domain.eq_ignore_ascii_case("localhost")
                || domain.to_ascii_lowercase().ends_with(".localhost")
            {
                return Err(UrlValidationError::Localhost);
            }
            return Ok(url);
        }
        Some(Host::Ipv4(v4)) => IpAddr::V4(v4),
        Some(Host::Ipv6(v6)) => IpAddr::V6(v6),
    };

    if ip.is_loopback() {
        return Err(UrlValidationError::Localhost);
    }
    if is_internal(ip) {
        return Err(UrlValidationError::PrivateIp(ip));
    }
    Ok(url)
}

fn is_internal(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return mapped.is_loopback() || is_internal(IpAddr::V4(mapped));
            }
            v6.is_unspecified() || is_unique_local(&v6) || is_unicast_link_local(&v6)
        }
    }
}

/// fc00::/7
fn is_unique_local(v6: &Ipv6Addr) -> bool {
    (v6.segments()[0] & 0xfe00) == 0xfc00
}

/// fe80::/10
fn is_unicast_link_local(v6: &Ipv6Addr) -> bool {
    (v6.segments()[0] & 0xffc0) == 0xfe80
}
