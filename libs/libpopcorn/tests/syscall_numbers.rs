//! Syscall number validation tests
//!
//! These tests verify that the Popcorn syscall numbers in libpopcorn match
//! the kernel's syscall tables for every supported architecture. Only the
//! host's table is compiled in, so the tables are read from source.

use std::collections::HashMap;

/// Expected numbers per architecture, from the Popcorn kernel's tables
fn expected() -> HashMap<&'static str, HashMap<&'static str, i64>> {
    let x86_64 = [
        ("POPCORN_MIGRATE", 330),
        ("POPCORN_PROPOSE_MIGRATION", 331),
        ("POPCORN_GET_THREAD_STATUS", 332),
        ("POPCORN_GET_NODE_INFO", 333),
    ];
    let aarch64 = [
        ("POPCORN_MIGRATE", 285),
        ("POPCORN_PROPOSE_MIGRATION", 286),
        ("POPCORN_GET_THREAD_STATUS", 287),
        ("POPCORN_GET_NODE_INFO", 288),
    ];

    [
        ("x86_64", x86_64.into_iter().collect()),
        ("aarch64", aarch64.into_iter().collect()),
    ]
    .into_iter()
    .collect()
}

/// Parse every `nr` table from libpopcorn source, keyed by target_arch
fn parse_tables() -> HashMap<String, HashMap<String, i64>> {
    let content =
        std::fs::read_to_string("src/syscall.rs").expect("Failed to read src/syscall.rs");

    let mut tables = HashMap::new();
    let mut pending_arch: Option<String> = None;
    let mut current: Option<(String, HashMap<String, i64>)> = None;

    for line in content.lines() {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("#[cfg(target_arch = \"") {
            pending_arch = rest.split('"').next().map(str::to_string);
            continue;
        }

        if trimmed == "pub mod nr {" {
            if let Some(arch) = pending_arch.take() {
                current = Some((arch, HashMap::new()));
            }
            continue;
        }

        if let Some((arch, table)) = current.as_mut() {
            if trimmed == "}" {
                tables.insert(arch.clone(), std::mem::take(table));
                current = None;
                continue;
            }

            // Parse: pub const NAME: i64 = VALUE;
            if let Some(rest) = trimmed.strip_prefix("pub const ") {
                let mut parts = rest.splitn(2, ':');
                let name = parts.next().map(str::trim);
                let value = parts
                    .next()
                    .and_then(|r| r.split('=').nth(1))
                    .and_then(|v| v.trim().trim_end_matches(';').parse::<i64>().ok());
                if let (Some(name), Some(value)) = (name, value) {
                    table.insert(name.to_string(), value);
                }
            }
        }
    }

    tables
}

#[test]
fn test_tables_exist_for_supported_architectures() {
    let tables = parse_tables();
    assert!(tables.contains_key("x86_64"), "missing x86_64 table");
    assert!(tables.contains_key("aarch64"), "missing aarch64 table");
}

#[test]
fn test_syscall_numbers_match_kernel() {
    let tables = parse_tables();

    for (arch, expected) in expected() {
        let table = &tables[arch];
        for (name, number) in expected {
            assert_eq!(
                table.get(name),
                Some(&number),
                "{} mismatch on {}",
                name,
                arch
            );
        }
    }
}

#[test]
fn test_syscall_numbers_are_contiguous() {
    for (arch, table) in parse_tables() {
        let mut numbers: Vec<i64> = table.values().copied().collect();
        numbers.sort_unstable();
        for pair in numbers.windows(2) {
            assert_eq!(pair[1], pair[0] + 1, "gap in {} table", arch);
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[test]
fn test_compiled_table_matches_source() {
    use libpopcorn::syscall::nr;

    let tables = parse_tables();
    let table = &tables["x86_64"];
    assert_eq!(table["POPCORN_MIGRATE"], nr::POPCORN_MIGRATE);
    assert_eq!(table["POPCORN_GET_NODE_INFO"], nr::POPCORN_GET_NODE_INFO);
}
