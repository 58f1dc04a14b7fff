//! Connection rules: which resource categories may be wired together.
//!
//! The policy is a table, not code: pairs are allowed or denied explicitly,
//! and anything not allowed is rejected. Hosts extend it through
//! [`RuleOverrides`] (loaded from settings) without touching the controller.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::Category;

const STORAGE_DATABASE: &str =
    "Storage and databases cannot be linked directly; connect both through a compute resource";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRules {
    allowed: HashSet<(Category, Category)>,
    denied: HashMap<(Category, Category), String>,
}

impl Default for ConnectionRules {
    /// Default policy:
    /// - compute links to databases, storage and networks;
    /// - networks link to networks;
    /// - pods front services, services front deployments;
    /// - storage and databases never link directly (route through compute).
    ///
    /// Serverless, load balancer and the remaining Kubernetes objects get the
    /// links a designer would reasonably draw for them.
    fn default() -> Self {
        use Category::*;
        let mut rules = Self::empty();
        rules
            .allow(Compute, Database)
            .allow(Compute, Storage)
            .allow(Compute, Network)
            .allow(Network, Network)
            .allow(OrchestrationPod, OrchestrationService)
            .allow(OrchestrationService, OrchestrationDeployment)
            .allow(Serverless, Database)
            .allow(Serverless, Storage)
            .allow(Serverless, Network)
            .allow(LoadBalancer, Compute)
            .allow(LoadBalancer, Serverless)
            .allow(LoadBalancer, Network)
            .allow(OrchestrationIngress, OrchestrationService)
            .allow(OrchestrationDeployment, OrchestrationConfigmap)
            .allow(OrchestrationDeployment, OrchestrationSecret)
            .allow(OrchestrationPod, OrchestrationConfigmap)
            .allow(OrchestrationPod, OrchestrationSecret)
            .deny(Storage, Database, STORAGE_DATABASE);
        rules
    }
}

impl ConnectionRules {
    /// A table that rejects everything.
    pub fn empty() -> Self {
        Self {
            allowed: HashSet::new(),
            denied: HashMap::new(),
        }
    }

    /// Allow both directions. Clears any denial for the pair.
    pub fn allow(&mut self, a: Category, b: Category) -> &mut Self {
        self.allow_directed(a, b).allow_directed(b, a)
    }

    pub fn allow_directed(&mut self, source: Category, target: Category) -> &mut Self {
        self.denied.remove(&(source, target));
        self.allowed.insert((source, target));
        self
    }

    /// Deny both directions with a reason shown to the user.
    pub fn deny(&mut self, a: Category, b: Category, reason: &str) -> &mut Self {
        self.deny_directed(a, b, reason).deny_directed(b, a, reason)
    }

    pub fn deny_directed(
        &mut self,
        source: Category,
        target: Category,
        reason: &str,
    ) -> &mut Self {
        self.allowed.remove(&(source, target));
        self.denied.insert((source, target), reason.to_string());
        self
    }

    pub fn is_connectable(&self, source: Category, target: Category) -> bool {
        !self.denied.contains_key(&(source, target)) && self.allowed.contains(&(source, target))
    }

    /// `None` when the pair is connectable.
    pub fn reason_if_invalid(&self, source: Category, target: Category) -> Option<String> {
        if let Some(reason) = self.denied.get(&(source, target)) {
            return Some(reason.clone());
        }
        if self.allowed.contains(&(source, target)) {
            return None;
        }
        let reason = format!("A {source} resource cannot connect to a {target} resource");
        Some(reason)
    }

    pub fn apply_overrides(&mut self, overrides: &RuleOverrides) -> &mut Self {
        for pair in &overrides.allow {
            if pair.directed {
                self.allow_directed(pair.source, pair.target);
            } else {
                self.allow(pair.source, pair.target);
            }
        }
        for pair in &overrides.deny {
            let reason = pair
                .reason
                .as_deref()
                .unwrap_or("Connection disabled by workspace policy");
            if pair.directed {
                self.deny_directed(pair.source, pair.target, reason);
            } else {
                self.deny(pair.source, pair.target, reason);
            }
        }
        self
    }
}

/// Settings-level additions to the default table.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleOverrides {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<RulePair>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<RulePair>,
}

impl RuleOverrides {
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RulePair {
    pub source: Category,
    pub target: Category,
    /// Apply only in the given direction.
    #[serde(default)]
    pub directed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
