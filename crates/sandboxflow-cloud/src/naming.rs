//! Resource naming
//!
//! Compute resource names must match `[a-z][-a-z0-9]*` and stay within 63
//! characters. Names derived from user-supplied aliases are normalized and
//! then disambiguated with a short random suffix.

/// Longest name the Compute API accepts
pub const MAX_NAME_LEN: usize = 63;

const SUFFIX_LEN: usize = 6;

/// Room left for the alias once the longest suffix (`--xxxxxx`) is appended
const MAX_ALIAS_LEN: usize = MAX_NAME_LEN - SUFFIX_LEN - 2;

/// Normalize an alias into the Compute naming grammar
///
/// Lowercases, maps every character outside `[a-z0-9]` (spaces, underscores,
/// dots, ...) to `-`, collapses runs of `-`, drops leading `-` and prefixes
/// `a` when the result starts with a digit or is empty. A trailing `-` is
/// kept unless truncation leaves it behind.
/// Applying it twice gives the same result as applying it once.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    for ch in name.to_lowercase().chars() {
        let ch = if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            ch
        } else {
            '-'
        };
        if ch == '-' && (normalized.is_empty() || normalized.ends_with('-')) {
            continue;
        }
        normalized.push(ch);
    }

    if normalized.is_empty() || normalized.starts_with(|c: char| c.is_ascii_digit()) {
        normalized.insert(0, 'a');
    }

    if normalized.len() > MAX_ALIAS_LEN {
        normalized.truncate(MAX_ALIAS_LEN);
        while normalized.ends_with('-') {
            normalized.pop();
        }
    }
    normalized
}

/// Six random hex characters
pub fn random_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..SUFFIX_LEN].to_string()
}

/// `<normalized-alias>-<6 hex>`
pub fn subnet_name(alias: &str) -> String {
    format!("{}-{}", normalize_name(alias), random_suffix())
}

/// `<normalized-app-name>--<6 hex>`
pub fn instance_name(app_name: &str) -> String {
    format!("{}--{}", normalize_name(app_name), random_suffix())
}

/// `netvpc-<reservationId>`
pub fn network_name(reservation_id: &str) -> String {
    format!("netvpc-{}", reservation_id)
}
