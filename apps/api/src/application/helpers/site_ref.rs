use url::Url;
use uuid::Uuid;

/// Normalize whatever a storefront sent to identify itself.
///
/// UUIDs are returned in canonical lowercase form. Anything else is treated as
/// a domain or URL and reduced to its lowercase host, without scheme, port,
/// path, or trailing dot. Returns `None` for blank input.
pub fn normalize_site_ref(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(id) = Uuid::parse_str(raw) {
        return Some(id.to_string());
    }

    let host = if raw.contains("://") {
        Url::parse(raw).ok()?.host_str()?.to_string()
    } else {
        let without_path = raw.split(['/', '?', '#']).next().unwrap_or(raw);
        without_path
            .rsplit_once(':')
            .map(|(host, _port)| host)
            .unwrap_or(without_path)
            .to_string()
    };

    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() { None } else { Some(host) }
}

/// Parse a normalized reference back into a site id, if it is one.
pub fn as_site_id(site_ref: &str) -> Option<Uuid> {
    Uuid::parse_str(site_ref).ok()
}
