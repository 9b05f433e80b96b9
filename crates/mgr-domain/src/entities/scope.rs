//! Scope documents: the permission model.
//!
//! Three variants share one index, discriminated by `scope_type`:
//! `server_scope` carries the FGAC rules, `group_mapping` maps identity
//! provider groups onto scope names, and `ui_scope` controls catalog
//! visibility in the UI.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One `(server, methods, tools)` permission rule.
///
/// Empty `tools` with populated `methods` means "all tools of the server".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAccessRule {
    /// Server path the rule applies to
    pub server: String,
    /// MCP protocol methods permitted
    #[serde(default)]
    pub methods: Vec<String>,
    /// Individual tool names permitted; empty means all
    #[serde(default)]
    pub tools: Vec<String>,
}

impl ServerAccessRule {
    /// Whether this rule permits `(server, method, tool)`.
    #[must_use]
    pub fn permits(&self, server: &str, method: &str, tool: Option<&str>) -> bool {
        if self.server != server {
            return false;
        }
        if !self.methods.iter().any(|m| m == method) {
            return false;
        }
        match tool {
            Some(t) => self.tools.is_empty() || self.tools.iter().any(|x| x == t),
            None => true,
        }
    }
}

/// FGAC scope: named bundle of server access rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerScope {
    /// Scope name referenced by group mappings
    pub scope_name: String,
    /// Rules granted by this scope
    #[serde(default)]
    pub server_access: Vec<ServerAccessRule>,
}

/// Identity-provider group to scope-name mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMapping {
    /// Group name as it appears in the `groups` claim
    pub group_name: String,
    /// Scope names granted to members of the group
    #[serde(default)]
    pub group_mappings: Vec<String>,
}

/// UI visibility permissions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UiPermissions {
    /// Servers the holder may list in the UI
    #[serde(default)]
    pub list_service: Vec<String>,
}

/// UI scope: catalog visibility bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiScope {
    /// Scope name
    pub scope_name: String,
    /// UI permissions granted
    #[serde(default)]
    pub ui_permissions: UiPermissions,
}

/// A stored scope document, discriminated by `scope_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope_type", rename_all = "snake_case")]
pub enum ScopeDocument {
    /// FGAC rules
    ServerScope(ServerScope),
    /// Group to scope-name mapping
    GroupMapping(GroupMapping),
    /// UI visibility bundle
    UiScope(UiScope),
}

impl ScopeDocument {
    /// Storage key of the document: scope name or group name.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::ServerScope(s) => &s.scope_name,
            Self::GroupMapping(g) => &g.group_name,
            Self::UiScope(u) => &u.scope_name,
        }
    }

    /// Discriminator string as stored.
    #[must_use]
    pub fn scope_type(&self) -> &'static str {
        match self {
            Self::ServerScope(_) => "server_scope",
            Self::GroupMapping(_) => "group_mapping",
            Self::UiScope(_) => "ui_scope",
        }
    }
}

/// On-disk scope file: scope_name → rules plus group_name → scope names.
///
/// The file form is the operator-friendly alternative to index storage; it
/// bulk-loads into the scope repository at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFile {
    /// FGAC scopes by name
    #[serde(default)]
    pub scopes: BTreeMap<String, Vec<ServerAccessRule>>,
    /// Group mappings: group name → scope names
    #[serde(default)]
    pub group_mappings: BTreeMap<String, Vec<String>>,
}

impl ScopeFile {
    /// Expand the file into individual scope documents.
    #[must_use]
    pub fn into_documents(self) -> Vec<ScopeDocument> {
        let mut docs = Vec::with_capacity(self.scopes.len() + self.group_mappings.len());
        for (scope_name, server_access) in self.scopes {
            docs.push(ScopeDocument::ServerScope(ServerScope {
                scope_name,
                server_access,
            }));
        }
        for (group_name, group_mappings) in self.group_mappings {
            docs.push(ScopeDocument::GroupMapping(GroupMapping {
                group_name,
                group_mappings,
            }));
        }
        docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finance_rule() -> ServerAccessRule {
        ServerAccessRule {
            server: "/fininfo".to_owned(),
            methods: vec!["tools/list".to_owned(), "tools/call".to_owned()],
            tools: vec!["get_stock_aggregates".to_owned()],
        }
    }

    #[test]
    fn rule_permits_listed_tool() {
        let rule = finance_rule();
        assert!(rule.permits("/fininfo", "tools/call", Some("get_stock_aggregates")));
    }

    #[test]
    fn rule_denies_unlisted_tool() {
        let rule = finance_rule();
        assert!(!rule.permits("/fininfo", "tools/call", Some("delete_portfolio")));
    }

    #[test]
    fn empty_tools_means_all_tools() {
        let mut rule = finance_rule();
        rule.tools.clear();
        assert!(rule.permits("/fininfo", "tools/call", Some("delete_portfolio")));
    }

    #[test]
    fn rule_denies_unlisted_method() {
        let rule = finance_rule();
        assert!(!rule.permits("/fininfo", "resources/read", None));
    }

    #[test]
    fn scope_file_expands_to_documents() {
        let yaml = r#"
scopes:
  finance_read:
    - server: /fininfo
      methods: [tools/list, tools/call]
      tools: [get_stock_aggregates]
group_mappings:
  finance_team: [finance_read]
"#;
        let file: ScopeFile = serde_yaml::from_str(yaml).expect("parse");
        let docs = file.into_documents();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().any(|d| d.scope_type() == "server_scope"));
        assert!(docs.iter().any(|d| d.scope_type() == "group_mapping"));
    }
}
