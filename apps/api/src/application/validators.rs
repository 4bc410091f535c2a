use validator::ValidateEmail;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Validates a storefront domain.
/// Rules:
/// - At most 253 characters, at least two labels
/// - Labels are 1-63 characters of ASCII letters, digits, or hyphens
/// - Labels neither start nor end with a hyphen
/// - Last label is alphabetic
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_alphabetic()));

    labels_ok && tld_ok
}

/// Minimum length for the storefront admin password sent to provisioning.
pub const MIN_SITE_PASSWORD_LEN: usize = 8;

pub fn is_valid_site_password(password: &str) -> bool {
    password.chars().count() >= MIN_SITE_PASSWORD_LEN && !password.trim().is_empty()
}
