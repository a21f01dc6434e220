use anyhow::{anyhow, Result};

/// Bucket names double as directory names under the object store root.
pub fn validate_bucket_name(value: &str) -> Result<()> {
    if value.len() < 3 || value.len() > 63 {
        return Err(anyhow!("bucket name must be 3-63 characters"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(anyhow!("bucket name may only contain a-z, 0-9, '-' and '.'"));
    }
    if value.starts_with(['-', '.']) || value.ends_with(['-', '.']) {
        return Err(anyhow!("bucket name must start and end with a letter or digit"));
    }
    Ok(())
}

pub fn validate_key_prefix(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("report key prefix is empty"));
    }
    if value.starts_with('/') || value.split('/').any(|part| part == "..") {
        return Err(anyhow!("report key prefix must be relative"));
    }
    Ok(())
}

pub fn validate_range(name: &str, value: usize, min: usize, max: usize) -> Result<()> {
    if value < min || value > max {
        return Err(anyhow!("{} must be between {} and {}", name, min, max));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_names() {
        assert!(validate_bucket_name("ticket-reconciler-reports").is_ok());
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name("Upper").is_err());
        assert!(validate_bucket_name("-leading").is_err());
        assert!(validate_bucket_name("../escape").is_err());
    }

    #[test]
    fn key_prefixes() {
        assert!(validate_key_prefix("error-reports").is_ok());
        assert!(validate_key_prefix("/abs").is_err());
        assert!(validate_key_prefix("a/../b").is_err());
        assert!(validate_key_prefix(" ").is_err());
    }
}
