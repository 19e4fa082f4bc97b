//! Validation utilities for zonectl
//!
//! Everything here runs before any network call: name syntax, the
//! record-must-be-inside-zone precondition, and value-string parsing.

use crate::constants::{MAX_LABEL_LENGTH, MAX_RECORD_NAME_LENGTH};
use crate::error::Error;
use crate::record::RecordType;

/// Normalizes a DNS name for comparison: lowercase, one trailing dot
/// stripped.
pub fn normalize_name(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    lower.strip_suffix('.').unwrap_or(&lower).to_string()
}

/// Derives the record prefix relative to its zone.
///
/// Both names must already be normalized. The record must be the zone apex
/// (`None`) or a subdomain of the zone; anything else is a precondition
/// failure, not a network error.
pub fn prefix_for(zone: &str, record: &str) -> Result<Option<String>, Error> {
    if record == zone {
        return Ok(None);
    }
    match record.strip_suffix(zone).and_then(|r| r.strip_suffix('.')) {
        Some(prefix) if !prefix.is_empty() => Ok(Some(prefix.to_string())),
        _ => Err(Error::Precondition(format!(
            "record \"{record}\" is not in zone \"{zone}\""
        ))),
    }
}

/// Validates that a string is a valid DNS record name.
///
/// Enforces RFC 1035 lengths and common DNS conventions:
/// - max 253 characters total, max 63 per label
/// - labels separated by dots, no empty labels
/// - labels cannot start or end with hyphens
/// - letters, digits, `-` and `_` (TXT/ACME style) allowed; `*` only as a
///   complete label
/// - `@` stands for the zone apex; a trailing dot (FQDN notation) is
///   accepted
pub fn validate_record_name(record_name: &str) -> Result<(), Error> {
    let trimmed = record_name.trim();
    if trimmed.is_empty() {
        return Err(Error::Precondition("record name cannot be empty".to_string()));
    }
    if trimmed == "@" {
        return Ok(());
    }
    if trimmed.contains(' ') {
        return Err(Error::Precondition(
            "record name cannot contain spaces".to_string(),
        ));
    }

    let name = trimmed.strip_suffix('.').unwrap_or(trimmed);
    if name.is_empty() {
        return Err(Error::Precondition("record name cannot be empty".to_string()));
    }
    if name.len() > MAX_RECORD_NAME_LENGTH {
        return Err(Error::Precondition(format!(
            "record name too long (max {MAX_RECORD_NAME_LENGTH} characters, got {})",
            name.len()
        )));
    }
    if name.starts_with('.') {
        return Err(Error::Precondition(
            "record name cannot start with a dot".to_string(),
        ));
    }
    if name.contains("..") {
        return Err(Error::Precondition(
            "record name cannot contain consecutive dots".to_string(),
        ));
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(Error::Precondition(
                "record name contains empty label".to_string(),
            ));
        }
        if label == "*" {
            continue;
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(Error::Precondition(format!(
                "record name label too long (max {MAX_LABEL_LENGTH} characters, got {})",
                label.len()
            )));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::Precondition(
                "record name label cannot start or end with hyphen".to_string(),
            ));
        }
        for ch in label.chars() {
            if !ch.is_alphanumeric() && ch != '-' && ch != '_' {
                return Err(Error::Precondition(format!(
                    "record name contains invalid character: '{ch}'"
                )));
            }
        }
    }

    Ok(())
}

/// Parses one user-supplied value string into a `(priority, target)` pair.
///
/// Priority-bearing types (MX, PTR) use `"priority target"`; everything
/// else takes the string verbatim with no priority.
pub fn parse_value(rtype: RecordType, raw: &str) -> Result<(Option<i32>, String), Error> {
    if !rtype.has_priority() {
        return Ok((None, raw.to_string()));
    }
    let (priority, target) = raw.split_once(' ').ok_or_else(|| {
        Error::Precondition(format!(
            "{rtype} value \"{raw}\" must be \"priority target\""
        ))
    })?;
    let priority = priority.parse::<i32>().map_err(|_| {
        Error::Precondition(format!("invalid priority \"{priority}\" in \"{raw}\""))
    })?;
    Ok((Some(priority), target.to_string()))
}

/// Parses all value strings for a record type, collapsing duplicates
/// (desired values have set semantics).
pub fn parse_values(rtype: RecordType, raw: &[String]) -> Result<Vec<(Option<i32>, String)>, Error> {
    let mut values: Vec<(Option<i32>, String)> = Vec::with_capacity(raw.len());
    for value in raw {
        let pair = parse_value(rtype, value)?;
        if !values.contains(&pair) {
            values.push(pair);
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_strips_trailing_dot() {
        assert_eq!(normalize_name("Example.COM."), "example.com");
        assert_eq!(normalize_name("example.com"), "example.com");
        assert_eq!(normalize_name("  WWW.Example.com  "), "www.example.com");
    }

    #[test]
    fn prefix_for_apex_and_subdomains() {
        assert_eq!(prefix_for("example.com", "example.com").unwrap(), None);
        assert_eq!(
            prefix_for("example.com", "www.example.com").unwrap(),
            Some("www".to_string())
        );
        assert_eq!(
            prefix_for("example.com", "a.b.example.com").unwrap(),
            Some("a.b".to_string())
        );
    }

    #[test]
    fn prefix_for_rejects_names_outside_zone() {
        assert!(prefix_for("example.com", "example.org").is_err());
        assert!(prefix_for("example.com", "badexample.com").is_err());
        assert!(prefix_for("example.com", "com").is_err());
        let err = prefix_for("example.com", "www.other.net").unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[test]
    fn validate_record_name_valid_cases() {
        assert!(validate_record_name("@").is_ok());
        assert!(validate_record_name("example.com").is_ok());
        assert!(validate_record_name("sub.example.com").is_ok());
        assert!(validate_record_name("_acme-challenge.example.com").is_ok());
        assert!(validate_record_name("*.example.com").is_ok());
        assert!(validate_record_name("example.com.").is_ok());
        assert!(validate_record_name(&("a".repeat(63) + ".com")).is_ok());
    }

    #[test]
    fn validate_record_name_invalid_cases() {
        assert!(validate_record_name("").is_err());
        assert!(validate_record_name(" ").is_err());
        assert!(validate_record_name("example com").is_err());
        assert!(validate_record_name(".example.com").is_err());
        assert!(validate_record_name("example..com").is_err());
        assert!(validate_record_name("-example.com").is_err());
        assert!(validate_record_name("example-.com").is_err());
        assert!(validate_record_name("ex@mple.com").is_err());
        assert!(validate_record_name(&"a.".repeat(254)).is_err());
    }

    #[test]
    fn parse_value_priority_types() {
        assert_eq!(
            parse_value(RecordType::Mx, "10 mail.example.com").unwrap(),
            (Some(10), "mail.example.com".to_string())
        );
        assert!(parse_value(RecordType::Mx, "mail.example.com").is_err());
        assert!(parse_value(RecordType::Mx, "ten mail.example.com").is_err());
    }

    #[test]
    fn parse_value_plain_types() {
        assert_eq!(
            parse_value(RecordType::A, "1.2.3.4").unwrap(),
            (None, "1.2.3.4".to_string())
        );
        // CAA values contain spaces but carry no priority.
        assert_eq!(
            parse_value(RecordType::Caa, "128 issue letsencrypt.org").unwrap(),
            (None, "128 issue letsencrypt.org".to_string())
        );
    }

    #[test]
    fn parse_values_collapses_duplicates() {
        let values = parse_values(
            RecordType::A,
            &["1.1.1.1".to_string(), "2.2.2.2".to_string(), "1.1.1.1".to_string()],
        )
        .unwrap();
        assert_eq!(values.len(), 2);
    }
}
