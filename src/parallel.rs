//! Parallel route groups
//!
//! Top-level routes tagged with a group are matched against that group's own
//! path, next to the primary route. A primary route may restrict what may be
//! matched alongside its subtree with a [`ParallelOptions`] whitelist:
//!
//! - `groups`: groups that may match freely
//! - `matches`: routes whose subtree may be matched by a group
//!
//! Declarations are checked when they are made. A nested declaration must be
//! a subset of its parent's, and declarations must be made outside-in: once a
//! route carries one, it is handed down to every descendant by identity.

use crate::error::RouteError;
use crate::route::{NodeId, RouteTree};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Whitelist of what may be matched alongside a primary subtree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParallelOptions {
    pub groups: BTreeSet<String>,
    pub matches: BTreeSet<NodeId>,
}

impl ParallelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow every route of `group`
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Allow `route` and its descendants
    pub fn route(mut self, route: NodeId) -> Self {
        self.matches.insert(route);
        self
    }

    /// Whether a group chain ending at `terminal` may stay matched
    pub(crate) fn admits(&self, tree: &RouteTree, group: &str, terminal: NodeId) -> bool {
        self.groups.contains(group)
            || self
                .matches
                .iter()
                .any(|&allowed| tree.is_descendant_or_self(terminal, allowed))
    }
}

impl RouteTree {
    /// Declare the parallel whitelist of a primary route.
    ///
    /// # Errors
    ///
    /// - [`RouteError::ParallelOnGroupedRoute`] when `node` belongs to a group
    /// - [`RouteError::ParallelGroupNotSubset`] / [`RouteError::ParallelMatchNotSubset`]
    ///   when the parent carries a declaration this one does not fit in
    /// - [`RouteError::ParallelNotTopDown`] when a descendant already carries a
    ///   declaration that did not come from `node`'s own lineage
    ///
    /// Nothing is changed when an error is returned.
    pub fn set_parallel(&mut self, node: NodeId, options: ParallelOptions) -> Result<(), RouteError> {
        let target = self.get(node)?;
        if target.group.is_some() {
            return Err(RouteError::ParallelOnGroupedRoute {
                route: target.route.clone(),
            });
        }

        for &id in &options.matches {
            self.get(id)?;
        }

        if let Some(parent) = target.parent.and_then(|id| self.nodes[id.0].parallel.clone()) {
            self.check_subset(node, &options, &parent)?;
        }

        let previous = target.parallel.clone();
        for descendant in self.descendants(node) {
            let current = &self.nodes[descendant.0].parallel;
            let inherited = match (current, &previous) {
                (None, _) => true,
                (Some(current), Some(previous)) => Arc::ptr_eq(current, previous),
                (Some(_), None) => false,
            };
            if !inherited {
                return Err(RouteError::ParallelNotTopDown {
                    route: self.nodes[descendant.0].route.clone(),
                });
            }
        }

        let options = Arc::new(options);
        self.nodes[node.0].parallel = Some(Arc::clone(&options));
        for descendant in self.descendants(node) {
            self.nodes[descendant.0].parallel = Some(Arc::clone(&options));
        }

        Ok(())
    }

    fn check_subset(
        &self,
        node: NodeId,
        options: &ParallelOptions,
        parent: &ParallelOptions,
    ) -> Result<(), RouteError> {
        let route = &self.nodes[node.0].route;

        if let Some(group) = options.groups.difference(&parent.groups).next() {
            return Err(RouteError::ParallelGroupNotSubset {
                route: route.clone(),
                group: group.clone(),
            });
        }

        for &candidate in &options.matches {
            let in_parent_group = self.nodes[candidate.0]
                .group
                .as_ref()
                .is_some_and(|group| parent.groups.contains(group));

            let owned = std::iter::once(candidate)
                .chain(self.ancestors(candidate))
                .any(|id| parent.matches.contains(&id));

            if !in_parent_group && !owned {
                return Err(RouteError::ParallelMatchNotSubset {
                    route: route.clone(),
                    target: self.nodes[candidate.0].route.clone(),
                });
            }
        }

        Ok(())
    }

    /// Strict descendants of `node`, depth-first
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[node.0].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            found.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        found
    }
}
