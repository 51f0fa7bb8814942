//! Error code validation tests
//!
//! These tests verify that error codes in libpopcorn are the negated Linux
//! errno values the Popcorn kernel returns, and that migration statuses are
//! classified the way the runtime documents them.

use std::collections::HashMap;
use std::fs;

use libpopcorn::{Error, MigrateError};

/// Parse error codes from libpopcorn syscall.rs
fn parse_errors() -> HashMap<String, i32> {
    let content = fs::read_to_string("src/syscall.rs").expect("Failed to read src/syscall.rs");

    let mut errors = HashMap::new();
    let mut in_enum = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.contains("pub enum Error") {
            in_enum = true;
            continue;
        }

        if in_enum {
            if trimmed == "}" {
                break;
            }

            if let Some((name, value)) = parse_error_variant(trimmed) {
                errors.insert(name, value);
            }
        }
    }

    errors
}

fn parse_error_variant(line: &str) -> Option<(String, i32)> {
    // Skip comments and doc comments
    if line.starts_with("//") || line.is_empty() {
        return None;
    }

    // Find "Name = value"
    let (name, value) = line.split_once('=')?;
    let value: i32 = value.trim().trim_end_matches(',').parse().ok()?;

    Some((name.trim().to_string(), value))
}

#[test]
fn test_error_codes_are_negated_errno() {
    let errors = parse_errors();

    let expected: HashMap<&str, i32> = [
        ("Success", 0),
        ("PermissionDenied", -libc::EPERM),
        ("NoSuchProcess", -libc::ESRCH),
        ("Again", -libc::EAGAIN),
        ("OutOfMemory", -libc::ENOMEM),
        ("BadAddress", -libc::EFAULT),
        ("Busy", -libc::EBUSY),
        ("InvalidArgument", -libc::EINVAL),
        ("NotImplemented", -libc::ENOSYS),
    ]
    .into_iter()
    .collect();

    assert_eq!(errors.len(), expected.len(), "unexpected variant count");
    for (name, code) in expected {
        assert_eq!(errors.get(name), Some(&code), "{} has the wrong code", name);
    }
}

#[test]
fn test_error_codes_round_trip_through_from_raw() {
    for (_, code) in parse_errors().into_iter().filter(|(_, c)| *c != 0) {
        let err = Error::from_raw(code as i64).unwrap_err();
        assert_eq!(err.code(), code);
    }
}

#[test]
fn test_error_messages_are_distinct() {
    let all = [
        Error::Success,
        Error::PermissionDenied,
        Error::NoSuchProcess,
        Error::Again,
        Error::OutOfMemory,
        Error::BadAddress,
        Error::Busy,
        Error::InvalidArgument,
        Error::NotImplemented,
    ];

    let mut seen = std::collections::HashSet::new();
    for err in all {
        assert!(seen.insert(err.to_string()), "duplicate message for {:?}", err);
    }
}

#[test]
fn test_migration_status_uses_errno_contract() {
    assert_eq!(
        MigrateError::from_status(-libc::EINVAL),
        Err(MigrateError::InvalidDestination)
    );
    assert_eq!(
        MigrateError::from_status(-libc::EBUSY),
        Err(MigrateError::AlreadyAtDestination)
    );
    assert_eq!(
        MigrateError::from_status(-libc::EAGAIN),
        Err(MigrateError::DestinationOffline)
    );
}
