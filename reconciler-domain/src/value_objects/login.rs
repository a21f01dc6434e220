// Login name rules of the identity directory

/// Case-folds a purchaser name into the directory's lookup key form.
pub fn normalize_login(raw: &str) -> String {
    raw.to_lowercase()
}

/// The directory only accepts ASCII letters, digits and underscore.
pub fn is_valid_login(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
