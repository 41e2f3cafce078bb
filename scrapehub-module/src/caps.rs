//! Capability tags advertised by modules.
//!
//! A capability names a set of operations a module implements. Capabilities
//! may extend others; a module declaring [`CAP_BANK_WEALTH`] also has
//! [`CAP_BANK`].

use std::fmt;

use serde::{Serialize, Serializer};

/// A capability tag. Module crates declare their own as `const` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability {
    pub name: &'static str,
    pub extends: &'static [Capability],
}

impl Capability {
    pub const fn new(name: &'static str) -> Self {
        Self { name, extends: &[] }
    }

    pub const fn extending(name: &'static str, extends: &'static [Capability]) -> Self {
        Self { name, extends }
    }

    /// This capability followed by its ancestors, depth first.
    pub fn lineage(&self) -> Vec<Capability> {
        let mut out = Vec::new();
        push_lineage(*self, &mut out);
        out
    }
}

fn push_lineage(cap: Capability, out: &mut Vec<Capability>) {
    if out.contains(&cap) {
        return;
    }
    out.push(cap);
    for parent in cap.extends {
        push_lineage(*parent, out);
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl Serialize for Capability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

pub const CAP_BANK: Capability = Capability::new("CapBank");
pub const CAP_BANK_WEALTH: Capability = Capability::extending("CapBankWealth", &[CAP_BANK]);
pub const CAP_BANK_TRANSFER: Capability = Capability::extending("CapBankTransfer", &[CAP_BANK]);
pub const CAP_MESSAGES: Capability = Capability::new("CapMessages");
pub const CAP_MESSAGES_POST: Capability =
    Capability::extending("CapMessagesPost", &[CAP_MESSAGES]);
pub const CAP_JOB: Capability = Capability::new("CapJob");
pub const CAP_TORRENT: Capability = Capability::new("CapTorrent");
pub const CAP_NEWS: Capability = Capability::new("CapNews");

/// Every declared capability with its ancestors, deduplicated, in
/// declaration order.
pub fn flatten_caps(declared: &[Capability]) -> Vec<Capability> {
    let mut out = Vec::new();
    for cap in declared {
        push_lineage(*cap, &mut out);
    }
    out
}

/// Something a capability set can be queried with.
pub trait CapQuery {
    fn cap_name(&self) -> &str;
}

impl CapQuery for Capability {
    fn cap_name(&self) -> &str {
        self.name
    }
}

impl CapQuery for &str {
    fn cap_name(&self) -> &str {
        self
    }
}

impl CapQuery for String {
    fn cap_name(&self) -> &str {
        self
    }
}

/// Whether the flattened `declared` set contains any of `queries`.
pub fn has_any_cap<Q: CapQuery>(declared: &[Capability], queries: &[Q]) -> bool {
    let caps = flatten_caps(declared);
    queries
        .iter()
        .any(|q| caps.iter().any(|c| c.name == q.cap_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP_CHILD: Capability = Capability::extending("CapChild", &[CAP_BANK_WEALTH, CAP_NEWS]);

    #[test]
    fn flatten_walks_ancestors() {
        let caps = flatten_caps(&[CAP_CHILD, CAP_BANK_TRANSFER]);
        let names: Vec<&str> = caps.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec!["CapChild", "CapBankWealth", "CapBank", "CapNews", "CapBankTransfer"]
        );
    }

    #[test]
    fn query_by_tag_or_name() {
        let declared = [CAP_BANK_WEALTH];
        assert!(has_any_cap(&declared, &[CAP_BANK]));
        assert!(has_any_cap(&declared, &["CapBank"]));
        assert!(has_any_cap(&declared, &["CapJob".to_string(), "CapBankWealth".to_string()]));
        assert!(!has_any_cap(&declared, &[CAP_MESSAGES]));
        assert!(!has_any_cap::<&str>(&declared, &[]));
    }

    #[test]
    fn serializes_as_name() {
        assert_eq!(serde_json::to_string(&CAP_NEWS).unwrap(), "\"CapNews\"");
    }
}
