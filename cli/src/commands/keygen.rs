// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `cogged keygen`: write a fresh master secret key file.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use cogged_core::infrastructure::codec::write_key_file;

pub fn execute(out: &Path) -> Result<()> {
    write_key_file(out)?;
    println!(
        "{}",
        format!("✓ Master secret written: {}", out.display()).green()
    );
    println!("  Point secret.key_file at it, or keep it next to the config as cogged.key.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keygen_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cogged.key");
        execute(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), 32);
        assert!(execute(&path).is_err());
    }
}
