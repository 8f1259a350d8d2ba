//! Syntactic validation rules for account input
//!
//! Pure predicates: no I/O, no MX lookups, no failure modes beyond returning `false`.

/// Minimum password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Minimum length of a first or last name after trimming, in characters
pub const MIN_NAME_LENGTH: usize = 2;

/// Check that `email` looks like `local@domain.tld`.
///
/// Exactly one `@`, no whitespace anywhere, a non-empty local part, and a domain
/// containing a dot with at least one character on each side of it.
pub fn validate_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let last = domain.chars().count().saturating_sub(1);
    domain
        .chars()
        .enumerate()
        .any(|(i, c)| c == '.' && i > 0 && i < last)
}

/// Check that `password` has at least [`MIN_PASSWORD_LENGTH`] characters
pub fn validate_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

/// Check that `name` has at least [`MIN_NAME_LENGTH`] characters once trimmed
pub fn validate_name(name: &str) -> bool {
    name.trim().chars().count() >= MIN_NAME_LENGTH
}

/// Lowercase and trim an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
