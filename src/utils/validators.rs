use anyhow::{anyhow, Result};

/// Validate a Facebook ad-account identifier (`act_<digits>`).
pub fn validate_account_id(account_id: &str) -> Result<()> {
    let digits = account_id
        .strip_prefix("act_")
        .ok_or_else(|| anyhow!("Ad account ID must start with 'act_'"))?;

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(anyhow!("Ad account ID must be 'act_' followed by digits"));
    }

    Ok(())
}

/// Validate a Graph object id (pixel or campaign): non-empty, digits only.
pub fn validate_object_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 64 {
        return Err(anyhow!("Object ID must be between 1 and 64 characters"));
    }

    if !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(anyhow!("Object ID can only contain digits"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_account_id() {
        assert!(validate_account_id("act_1234567890").is_ok());
        assert!(validate_account_id("1234567890").is_err());
        assert!(validate_account_id("act_").is_err());
        assert!(validate_account_id("act_12ab").is_err());
    }

    #[test]
    fn test_validate_object_id() {
        assert!(validate_object_id("120210123456789").is_ok());
        assert!(validate_object_id("").is_err());
        assert!(validate_object_id("pixel-123").is_err());
        assert!(validate_object_id(&"9".repeat(65)).is_err());
    }
}
