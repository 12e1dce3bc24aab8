// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Node Permission Flags
//!
//! Six independent booleans stored globally on every graph node. They are not
//! per-grantee: a flag grants the operation to every identity that can
//! reference the node. Owners and the admin role bypass them entirely.
//!
//! ## Letter Encoding
//!
//! | Letter | Flag | Operation |
//! |--------|------|-----------|
//! | `r` | `read` | see the node in query results |
//! | `w` | `write` | update node fields |
//! | `o` | `link_out` | add edges leaving the node |
//! | `i` | `link_in` | add edges pointing at the node |
//! | `d` | `delete` | delete the node |
//! | `s` | `share` | share the node with other users |
//!
//! Descriptors carry the letters of the set flags in the fixed order above;
//! unset flags are omitted, never replaced by a placeholder.

use serde::{Deserialize, Serialize};

/// Canonical letter order used when encoding flags.
pub const PERMISSION_LETTERS: [char; 6] = ['r', 'w', 'o', 'i', 'd', 's'];

/// Static per-node permission flags.
///
/// Serialized with the single-letter field names of the graph wire model and
/// omitted from JSON when false, so an absent flag and a false flag are the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionFlags {
    #[serde(rename = "r", default, skip_serializing_if = "is_false")]
    pub read: bool,
    #[serde(rename = "w", default, skip_serializing_if = "is_false")]
    pub write: bool,
    #[serde(rename = "o", default, skip_serializing_if = "is_false")]
    pub link_out: bool,
    #[serde(rename = "i", default, skip_serializing_if = "is_false")]
    pub link_in: bool,
    #[serde(rename = "d", default, skip_serializing_if = "is_false")]
    pub delete: bool,
    #[serde(rename = "s", default, skip_serializing_if = "is_false")]
    pub share: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl PermissionFlags {
    /// No permissions at all.
    pub const NONE: Self = Self {
        read: false,
        write: false,
        link_out: false,
        link_in: false,
        delete: false,
        share: false,
    };

    /// Every permission set.
    pub const ALL: Self = Self {
        read: true,
        write: true,
        link_out: true,
        link_in: true,
        delete: true,
        share: true,
    };

    /// Build flags from a letter string. Letters outside `rwoids` are ignored
    /// and repeated letters are harmless.
    pub fn from_letters(letters: &str) -> Self {
        let mut flags = Self::NONE;
        for c in letters.chars() {
            if let Some(slot) = flags.slot_mut(c) {
                *slot = true;
            }
        }
        flags
    }

    /// Encode the set flags as letters in canonical `rwoids` order.
    pub fn letters(&self) -> String {
        PERMISSION_LETTERS
            .iter()
            .filter(|c| self.get(**c).unwrap_or(false))
            .collect()
    }

    /// Look up a single flag by its letter. `None` for unknown letters.
    pub fn get(&self, letter: char) -> Option<bool> {
        match letter {
            'r' => Some(self.read),
            'w' => Some(self.write),
            'o' => Some(self.link_out),
            'i' => Some(self.link_in),
            'd' => Some(self.delete),
            's' => Some(self.share),
            _ => None,
        }
    }

    fn slot_mut(&mut self, letter: char) -> Option<&mut bool> {
        match letter {
            'r' => Some(&mut self.read),
            'w' => Some(&mut self.write),
            'o' => Some(&mut self.link_out),
            'i' => Some(&mut self.link_in),
            'd' => Some(&mut self.delete),
            's' => Some(&mut self.share),
            _ => None,
        }
    }

    /// `true` when every letter in `required` names a set flag.
    ///
    /// An empty requirement is always satisfied. A letter outside `rwoids`
    /// can never be satisfied, so a typo in a handler fails closed.
    pub fn has_permission(&self, required: &str) -> bool {
        required.chars().all(|c| self.get(c).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_use_canonical_order() {
        let flags = PermissionFlags::from_letters("sdr");
        assert_eq!(flags.letters(), "rds");
        assert_eq!(PermissionFlags::ALL.letters(), "rwoids");
        assert_eq!(PermissionFlags::NONE.letters(), "");
    }

    #[test]
    fn test_from_letters_ignores_unknown() {
        let flags = PermissionFlags::from_letters("rxz");
        assert!(flags.read);
        assert_eq!(flags.letters(), "r");
    }

    #[test]
    fn test_has_permission_is_conjunction() {
        let flags = PermissionFlags::from_letters("rs");
        assert!(flags.has_permission("r"));
        assert!(flags.has_permission("rs"));
        assert!(flags.has_permission("sr"));
        assert!(!flags.has_permission("rw"));
        assert!(!flags.has_permission("w"));
    }

    #[test]
    fn test_empty_requirement_always_satisfied() {
        assert!(PermissionFlags::NONE.has_permission(""));
    }

    #[test]
    fn test_unknown_requirement_letter_fails_closed() {
        assert!(!PermissionFlags::ALL.has_permission("x"));
        assert!(!PermissionFlags::ALL.has_permission("rx"));
    }

    #[test]
    fn test_absent_flags_deserialize_false() {
        let flags: PermissionFlags = serde_json::from_str(r#"{"r":true}"#).unwrap();
        assert!(flags.read);
        assert!(!flags.write && !flags.share);
        assert_eq!(serde_json::to_string(&flags).unwrap(), r#"{"r":true}"#);
    }
}
