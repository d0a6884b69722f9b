//! Validation helpers for bucket paths.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ConfigError, ConfigResult};

// Leading `./`, `../` or `/`; an interior `/<dots>/`; a trailing `/<dots>`.
static INVALID_BUCKET: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"\A\.*/|/\.*/|/\.*\z"));

/// Split `bucket[/prefix]` into the bucket name and an optional prefix.
///
/// Absent or blank input yields `(None, None)` without validation. Literal
/// dots inside a segment (`my.bucket.name`) are accepted.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBucket`] when the value starts with an
/// anchored or dot-relative path, contains an empty or dot-only interior
/// segment, or ends with a separator followed only by dots.
pub fn split_bucket_prefix(value: Option<&str>) -> ConfigResult<(Option<String>, Option<String>)> {
    let Some(raw) = value.filter(|text| !text.trim().is_empty()) else {
        return Ok((None, None));
    };

    let pattern = INVALID_BUCKET
        .as_ref()
        .map_err(|source| ConfigError::BucketPattern {
            source: source.clone(),
        })?;
    if pattern.is_match(raw) {
        return Err(ConfigError::InvalidBucket {
            value: raw.to_string(),
        });
    }

    Ok(match raw.split_once('/') {
        Some((bucket, prefix)) => (Some(bucket.to_string()), Some(prefix.to_string())),
        None => (Some(raw.to_string()), None),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(value: &str) -> ConfigResult<(Option<String>, Option<String>)> {
        split_bucket_prefix(Some(value))
    }

    #[test]
    fn empty_input_skips_validation() -> anyhow::Result<()> {
        assert_eq!(split_bucket_prefix(None)?, (None, None));
        assert_eq!(split("")?, (None, None));
        assert_eq!(split("   ")?, (None, None));
        Ok(())
    }

    #[test]
    fn bucket_without_prefix() -> anyhow::Result<()> {
        assert_eq!(split("artifacts")?, (Some("artifacts".into()), None));
        Ok(())
    }

    #[test]
    fn splits_on_first_separator_only() -> anyhow::Result<()> {
        assert_eq!(
            split("bucket/nested/prefix")?,
            (Some("bucket".into()), Some("nested/prefix".into()))
        );
        Ok(())
    }

    #[test]
    fn dotted_bucket_names_are_allowed() -> anyhow::Result<()> {
        assert_eq!(
            split("my.bucket.name/prefix")?,
            (Some("my.bucket.name".into()), Some("prefix".into()))
        );
        assert_eq!(
            split("bucket/..hidden")?,
            (Some("bucket".into()), Some("..hidden".into()))
        );
        Ok(())
    }

    #[test]
    fn traversal_shapes_are_rejected() {
        for value in [
            "../evil",
            "./bucket",
            "/bucket",
            "bucket/../x",
            "bucket/./x",
            "bucket//x",
            "bucket/..",
            "bucket/.",
            "bucket/",
        ] {
            assert!(
                matches!(split(value), Err(ConfigError::InvalidBucket { .. })),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn valid_values_round_trip() -> anyhow::Result<()> {
        for value in ["bucket", "bucket/prefix", "a.b/c.d/e", "..bucket"] {
            let (bucket, prefix) = split(value)?;
            let bucket = bucket.unwrap_or_default();
            let rebuilt = prefix.map_or_else(|| bucket.clone(), |rest| format!("{bucket}/{rest}"));
            assert_eq!(rebuilt, value);
        }
        Ok(())
    }

    #[test]
    fn split_is_deterministic() {
        let first = split("bucket/prefix").ok();
        let second = split("bucket/prefix").ok();
        assert_eq!(first, second);
        assert_eq!(
            split("../evil").err().map(|err| err.to_string()),
            Some("invalid bucket".to_string())
        );
    }
}
