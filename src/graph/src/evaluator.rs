//! Edge evaluation
//!
//! Resolves every subject/object edge of an [`AccessGraph`] against the
//! subject's own slice of the policy.
//!
//! # Resolution
//!
//! ```text
//! matching DENY rule  → DENY
//! matching ALLOW rule → ALLOW
//! neither             → DENY
//! ```
//!
//! Rule order never affects the outcome, only the presence of a matching
//! rule of each qualifier.

use crate::graph::AccessGraph;
use comarmor_profile::{
    CacheStats, ObjectKind, PatternCache, PatternCacheConfig, Permission, ProfileStorage,
    Qualifier, Result, Rule,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Evaluator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Compiled attachment pattern cache
    pub pattern_cache: PatternCacheConfig,
}

/// Why an edge got its qualifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// A DENY rule matched
    ExplicitDeny,
    /// No DENY rule matched and an ALLOW rule did
    ExplicitAllow,
    /// No rule matched
    NoMatch,
}

impl Resolution {
    /// Qualifier written onto the edge
    pub fn qualifier(&self) -> Qualifier {
        match self {
            Resolution::ExplicitAllow => Qualifier::Allow,
            Resolution::ExplicitDeny | Resolution::NoMatch => Qualifier::Deny,
        }
    }
}

/// Outcome counts of one evaluation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Subjects visited
    pub subjects: usize,

    /// Edges resolved
    pub edges: usize,

    /// Edges resolved to ALLOW
    pub allowed: usize,

    /// Edges resolved to DENY, including unmatched ones
    pub denied: usize,

    /// Edges denied because no rule matched
    pub unmatched: usize,
}

impl EvaluationReport {
    fn record(&mut self, resolution: Resolution) {
        self.edges += 1;
        match resolution {
            Resolution::ExplicitAllow => self.allowed += 1,
            Resolution::ExplicitDeny => self.denied += 1,
            Resolution::NoMatch => {
                self.denied += 1;
                self.unmatched += 1;
            }
        }
    }
}

/// Resolves access graph edges against profile storage
pub struct Evaluator {
    config: EvaluatorConfig,
    cache: PatternCache,
}

impl Evaluator {
    /// Create an evaluator with the given configuration
    pub fn new(config: EvaluatorConfig) -> Self {
        let cache = PatternCache::new(config.pattern_cache.clone());
        Self { config, cache }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Resolve every edge of `graph` and write the qualifier back onto it
    ///
    /// For each subject node the storage is first filtered down to the
    /// profiles attached to that subject; only those rules take part in
    /// resolving the subject's edges.
    ///
    /// # Errors
    ///
    /// Fails only when an attachment pattern does not compile.
    pub fn evaluate(
        &self,
        graph: &mut AccessGraph,
        storage: &ProfileStorage,
    ) -> Result<EvaluationReport> {
        let mut report = EvaluationReport::default();

        let subjects: Vec<_> = graph
            .subjects()
            .map(|(index, node)| (index, node.name.clone()))
            .collect();

        for (subject, subject_name) in subjects {
            report.subjects += 1;
            let policy = storage.filter_with(&self.cache, &subject_name)?;
            let mut rules_by_kind: HashMap<ObjectKind, Vec<Rule>> = HashMap::new();

            for access in graph.accesses(subject) {
                let Some(object) = graph.node(access.object) else {
                    continue;
                };
                let Some(kind) = object.kind else {
                    continue;
                };
                let object_name = object.name.clone();

                let rules = rules_by_kind
                    .entry(kind)
                    .or_insert_with(|| policy.extract_rules(kind));
                let resolution = self.resolve(rules, &object_name, access.permission)?;

                trace!(
                    subject = %subject_name,
                    object = %object_name,
                    %kind,
                    permission = %access.permission,
                    ?resolution,
                    "resolved edge"
                );
                graph.set_qualifier(access.edge, resolution.qualifier());
                report.record(resolution);
            }
        }

        debug!(
            subjects = report.subjects,
            edges = report.edges,
            allowed = report.allowed,
            denied = report.denied,
            unmatched = report.unmatched,
            "evaluated access graph"
        );
        Ok(report)
    }

    /// Resolve one verb on one object against a subject's rules of that kind
    ///
    /// Every attachment is compiled before any rule is tried, so a bad
    /// pattern fails the call wherever it sits among the rules.
    pub fn resolve(
        &self,
        rules: &[Rule],
        object: &str,
        permission: Permission,
    ) -> Result<Resolution> {
        for attachment in rules.iter().flat_map(|r| r.attachments.iter()) {
            self.cache.compile(attachment.as_str())?;
        }

        let mut allowed = false;
        for rule in rules {
            if !rule.applies_to(&self.cache, object, permission)? {
                continue;
            }
            match rule.qualifier {
                Qualifier::Deny => return Ok(Resolution::ExplicitDeny),
                Qualifier::Allow => allowed = true,
            }
        }

        Ok(if allowed {
            Resolution::ExplicitAllow
        } else {
            Resolution::NoMatch
        })
    }

    /// Returns pattern cache statistics
    pub fn get_cache_stats(&self) -> CacheStats {
        self.cache.get_stats()
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(EvaluatorConfig::default())
    }
}

/// Evaluate `graph` with a default [`Evaluator`]
pub fn evaluate(graph: &mut AccessGraph, storage: &ProfileStorage) -> Result<EvaluationReport> {
    Evaluator::default().evaluate(graph, storage)
}
