//! Deterministic initials fallback for subjects without an avatar.

/// Shown when a name yields no usable characters.
pub const UNKNOWN_INITIALS: &str = "?";

/// Background colours for the initials badge.
const PALETTE: &[&str] = &[
    "df74c9", "05cd8f", "52a6db", "ee733d", "f48686", "6b6f8c", "e13030", "8e30de", "b258ec",
    "f15e5e", "3159ea", "7ab0ff", "78c670", "18aeec", "8125d4", "c32ea3", "415dae", "d79b25",
    "ce811a", "2ba032",
];

/// Initials for `display_name`.
///
/// Two or more significant tokens give the first letter of the first two;
/// a single token gives its first two characters. Always uppercased.
#[must_use]
pub fn initials(display_name: &str) -> String {
    let tokens: Vec<&str> = display_name
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| !token.is_empty())
        .collect();

    let raw: String = match tokens.as_slice() {
        [] => return UNKNOWN_INITIALS.to_string(),
        [only] => only.chars().take(2).collect(),
        [first, second, ..] => first.chars().take(1).chain(second.chars().take(1)).collect(),
    };

    raw.to_uppercase()
}

/// Hex colour (`#rrggbb`) for the initials badge of `display_name`.
#[must_use]
pub fn initials_color(display_name: &str) -> String {
    let fingerprint: usize = display_name.chars().map(|c| c as usize).sum();
    format!("#{}", PALETTE[fingerprint % PALETTE.len()])
}
