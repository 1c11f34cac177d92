//! Allow and deny lists.
//!
//! ```text
//! allowed    = {}          -> everyone except `prohibited`
//! allowed    = {alice}     -> only alice, unless alice is also prohibited
//! prohibited = {mallory}   -> mallory is always refused
//! ```
//!
//! The lists are consulted on every heartbeat, not just the first one, so an
//! edit made from the operator console can revoke a session that is already
//! running.

use std::collections::BTreeSet;

use midilink_core::RemoteId;
use serde::{Deserialize, Serialize};

/// Result of [`AccessControl::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Permit,
    Deny,
}

/// The two access lists.  Doubles as the `[access]` config section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    /// Whitelist.  Empty means "everyone".
    #[serde(default)]
    pub allowed: BTreeSet<RemoteId>,
    /// Blacklist, checked regardless of the whitelist.
    #[serde(default)]
    pub prohibited: BTreeSet<RemoteId>,
}

impl AccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&self, remote: &RemoteId) -> AccessDecision {
        let not_whitelisted = !self.allowed.is_empty() && !self.allowed.contains(remote);
        if not_whitelisted || self.prohibited.contains(remote) {
            AccessDecision::Deny
        } else {
            AccessDecision::Permit
        }
    }

    /// Adds to the whitelist.  Returns `false` if already present.
    pub fn allow(&mut self, remote: RemoteId) -> bool {
        self.allowed.insert(remote)
    }

    /// Removes from the whitelist.  Returns `false` if absent.
    pub fn disallow(&mut self, remote: &RemoteId) -> bool {
        self.allowed.remove(remote)
    }

    /// Adds to the blacklist.  Returns `false` if already present.
    pub fn prohibit(&mut self, remote: RemoteId) -> bool {
        self.prohibited.insert(remote)
    }

    /// Removes from the blacklist.  Returns `false` if absent.
    pub fn unprohibit(&mut self, remote: &RemoteId) -> bool {
        self.prohibited.remove(remote)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_lists_permit_everyone() {
        let acl = AccessControl::new();
        assert_eq!(acl.evaluate(&"anyone".into()), AccessDecision::Permit);
    }

    #[test]
    fn test_whitelist_denies_unlisted_remote() {
        // Arrange
        let mut acl = AccessControl::new();
        acl.allow("alice".into());

        // Act + Assert
        assert_eq!(acl.evaluate(&"alice".into()), AccessDecision::Permit);
        assert_eq!(acl.evaluate(&"bob".into()), AccessDecision::Deny);
    }

    #[test]
    fn test_blacklist_applies_even_when_whitelisted() {
        let mut acl = AccessControl::new();
        acl.allow("alice".into());
        acl.prohibit("alice".into());
        assert_eq!(acl.evaluate(&"alice".into()), AccessDecision::Deny);
    }

    #[test]
    fn test_blacklist_without_whitelist() {
        let mut acl = AccessControl::new();
        acl.prohibit("mallory".into());
        assert_eq!(acl.evaluate(&"mallory".into()), AccessDecision::Deny);
        assert_eq!(acl.evaluate(&"alice".into()), AccessDecision::Permit);
    }

    #[test]
    fn test_list_edits_report_whether_anything_changed() {
        let mut acl = AccessControl::new();
        assert!(acl.allow("alice".into()));
        assert!(!acl.allow("alice".into()));
        assert!(acl.disallow(&"alice".into()));
        assert!(!acl.disallow(&"alice".into()));
        assert!(acl.prohibit("bob".into()));
        assert!(acl.unprohibit(&"bob".into()));
        assert!(!acl.unprohibit(&"bob".into()));
    }

    #[test]
    fn test_access_section_parses_from_toml() {
        let acl: AccessControl =
            toml::from_str("allowed = [\"alice\", \"carol\"]\nprohibited = [\"bob\"]").unwrap();
        assert_eq!(acl.allowed.len(), 2);
        assert!(acl.prohibited.contains(&RemoteId::from("bob")));
    }
}
