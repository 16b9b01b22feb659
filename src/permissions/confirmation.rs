/// Case-insensitive substring test of `secret` within `justification`.
///
/// The secret is a shared static token with no scope or expiry. It guards
/// against accidental destructive actions, nothing more. An empty secret
/// never matches.
pub fn has_confirmation_code(justification: &str, secret: &str) -> bool {
    let secret = secret.trim();
    if secret.is_empty() {
        return false;
    }
    justification
        .to_lowercase()
        .contains(&secret.to_lowercase())
}
