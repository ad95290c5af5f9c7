//! Reconciliation of a location against the route tree
//!
//! [`RouteTree::reconcile`] walks the tree once per navigation and produces a
//! [`TransitionPlan`]: the pending match state of every route and the routes
//! that enter, update or leave. Nothing is written until
//! [`RouteTree::commit`].
//!
//! Siblings are tried in declaration order and the first one whose subtree
//! yields a match wins. A route with children that consumed the whole path is
//! only kept when it allows being exact or a child still matches the empty
//! remainder; otherwise the next sibling is tried.

use crate::error::RouteError;
use crate::lifecycle::{NextRouteMatch, UpdateContext};
use crate::location::{Location, GROUP_KEY_PREFIX};
use crate::matcher::match_path;
use crate::params::{QueryParams, RouteParams};
use crate::route::{MatchState, NodeId, RouteTree};
use crate::{debug_log, trace_log, warn_log};
use std::collections::BTreeMap;

/// One matched route of a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEntry {
    pub node: NodeId,
    pub exact: bool,
    /// Consumed segment, `None` for zero-width routes
    pub segment: Option<String>,
    /// Path left for the route's descendants
    pub rest: String,
}

/// Raw input of one reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct RouteSource {
    /// Matched chain per branch, `None` being the primary branch
    pub entries: BTreeMap<Option<String>, Vec<MatchEntry>>,
    pub query: QueryParams,
    /// Path each branch was matched against
    pub paths: BTreeMap<Option<String>, String>,
}

impl RouteSource {
    /// The entry of `node` in its branch, if it matched
    pub fn entry(&self, group: Option<&str>, node: NodeId) -> Option<&MatchEntry> {
        self.entries
            .get(&group.map(str::to_string))?
            .iter()
            .find(|entry| entry.node == node)
    }
}

/// How a route's match changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Enter,
    Update { descendants: bool },
    Leave,
    None,
}

impl TransitionKind {
    fn classify(previous: &MatchState, next: &MatchState) -> Self {
        match (previous.matched, next.matched) {
            (false, true) => TransitionKind::Enter,
            (true, false) => TransitionKind::Leave,
            (true, true) if previous != next => TransitionKind::Update { descendants: false },
            _ => TransitionKind::None,
        }
    }

    /// Context handed to update hooks
    pub fn update_context(self) -> Option<UpdateContext> {
        match self {
            TransitionKind::Update { descendants } => Some(UpdateContext { descendants }),
            _ => None,
        }
    }
}

/// A route whose match changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTransition {
    pub node: NodeId,
    pub kind: TransitionKind,
    pub previous: MatchState,
    pub next: MatchState,
}

/// Outcome of a reconciliation pass
#[derive(Debug, Clone)]
pub struct TransitionPlan {
    source: RouteSource,
    location: Location,
    states: Vec<MatchState>,
    transitions: Vec<NodeTransition>,
}

impl TransitionPlan {
    pub fn source(&self) -> &RouteSource {
        &self.source
    }

    /// The location being navigated to
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Routes that change, in declaration order
    pub fn transitions(&self) -> &[NodeTransition] {
        &self.transitions
    }

    /// No route changes
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn kind_of(&self, node: NodeId) -> TransitionKind {
        self.transitions
            .iter()
            .find(|transition| transition.node == node)
            .map_or(TransitionKind::None, |transition| transition.kind)
    }

    /// Pending state of `node`
    pub fn next_state(&self, node: NodeId) -> Option<&MatchState> {
        self.states.get(node.0)
    }

    /// Pending view of `node` as handed to before-hooks
    pub fn next_match(&self, tree: &RouteTree, node: NodeId) -> Option<NextRouteMatch> {
        let state = self.next_state(node)?;
        Some(NextRouteMatch {
            id: node,
            route: tree.node(node)?.route().to_string(),
            matched: state.matched,
            exact: state.exact,
            params: state.params.clone(),
        })
    }

    pub fn entered(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.of_kind(|kind| kind == TransitionKind::Enter)
    }

    pub fn left(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.of_kind(|kind| kind == TransitionKind::Leave)
    }

    pub fn updated(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.of_kind(|kind| matches!(kind, TransitionKind::Update { .. }))
    }

    fn of_kind<'a>(
        &'a self,
        filter: impl Fn(TransitionKind) -> bool + 'a,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.transitions
            .iter()
            .filter(move |transition| filter(transition.kind))
            .map(|transition| transition.node)
    }
}

impl RouteTree {
    /// Match `location` and compute the pending state of every route.
    ///
    /// Fails only on malformed paths.
    pub fn reconcile(&self, location: &Location) -> Result<TransitionPlan, RouteError> {
        let mut source = RouteSource {
            query: location.query.clone(),
            ..RouteSource::default()
        };

        let primary = self.match_branch(None, &location.path)?;
        let whitelist = primary
            .as_ref()
            .and_then(|chain| chain.last())
            .map_or(NodeId::ROOT, |entry| entry.node);
        let whitelist = self.nodes[whitelist.0].parallel.clone();

        source.paths.insert(None, location.path.clone());
        if let Some(chain) = primary {
            source.entries.insert(None, chain);
        }

        let mut location = location.clone();
        let mut dropped = Vec::new();
        let mut unknown = Vec::new();

        for (group, path) in &location.groups {
            let known = self.nodes[NodeId::ROOT.0]
                .children
                .iter()
                .any(|child| self.nodes[child.0].group.as_deref() == Some(group.as_str()));
            if !known {
                warn_log!("unknown route group \"{}\" in location, kept as a query parameter", group);
                unknown.push(group.clone());
                continue;
            }

            source.paths.insert(Some(group.clone()), path.clone());

            let Some(chain) = self.match_branch(Some(group.as_str()), path)? else {
                continue;
            };

            let terminal = chain.last().map_or(NodeId::ROOT, |entry| entry.node);
            if let Some(options) = &whitelist {
                if !options.admits(self, group, terminal) {
                    debug_log!("group \"{}\" is not allowed alongside the primary route", group);
                    dropped.push(group.clone());
                    continue;
                }
            }

            source.entries.insert(Some(group.clone()), chain);
        }

        for group in dropped {
            location.groups.remove(&group);
            source.paths.remove(&Some(group));
        }
        for group in unknown {
            if let Some(value) = location.groups.remove(&group) {
                let key = format!("{}{}", GROUP_KEY_PREFIX, group);
                source.query.set(key.clone(), value.clone());
                location.query.set(key, value);
            }
        }

        let states = self.pending_states(&source);
        let transitions = self.classify(&states);

        Ok(TransitionPlan {
            source,
            location,
            states,
            transitions,
        })
    }

    /// Write the plan's pending state into the tree.
    ///
    /// Returns the routes whose state changed.
    pub fn commit(&mut self, plan: &TransitionPlan) -> Vec<NodeId> {
        for (node, state) in self.nodes.iter_mut().zip(&plan.states) {
            node.state = state.clone();
        }
        self.location = plan.location.clone();

        plan.transitions
            .iter()
            .map(|transition| transition.node)
            .collect()
    }

    fn match_branch(
        &self,
        group: Option<&str>,
        path: &str,
    ) -> Result<Option<Vec<MatchEntry>>, RouteError> {
        let candidates: Vec<NodeId> = self.nodes[NodeId::ROOT.0]
            .children
            .iter()
            .copied()
            .filter(|child| self.nodes[child.0].group.as_deref() == group)
            .collect();

        self.match_first(&candidates, path)
    }

    fn match_first(
        &self,
        candidates: &[NodeId],
        remainder: &str,
    ) -> Result<Option<Vec<MatchEntry>>, RouteError> {
        for &candidate in candidates {
            if let Some(chain) = self.match_node(candidate, remainder)? {
                return Ok(Some(chain));
            }
        }
        Ok(None)
    }

    fn match_node(&self, id: NodeId, remainder: &str) -> Result<Option<Vec<MatchEntry>>, RouteError> {
        let node = &self.nodes[id.0];
        let outcome = match_path(remainder, &node.pattern)?;

        trace_log!(
            "matching {:?} against \"{}\": matched={} rest={:?}",
            remainder,
            node.route,
            outcome.matched,
            outcome.rest
        );

        if !outcome.matched {
            return Ok(None);
        }

        let exact = outcome.rest.is_empty();
        let mut entry = MatchEntry {
            node: id,
            exact,
            segment: outcome.segment,
            rest: outcome.rest,
        };

        if node.children.is_empty() {
            return Ok(Some(vec![entry]));
        }

        if let Some(chain) = self.match_first(&node.children, &entry.rest)? {
            // Exact only when a zero-width child left the rest empty and exact is allowed
            if !node.allow_exact {
                entry.exact = false;
            }
            let mut entries = Vec::with_capacity(chain.len() + 1);
            entries.push(entry);
            entries.extend(chain);
            return Ok(Some(entries));
        }

        if exact && !node.allow_exact {
            trace_log!("\"{}\" may not be matched exactly", node.route);
            return Ok(None);
        }

        Ok(Some(vec![entry]))
    }

    fn pending_states(&self, source: &RouteSource) -> Vec<MatchState> {
        let mut states = vec![MatchState::default(); self.nodes.len()];
        states[NodeId::ROOT.0] = MatchState::root();

        for chain in source.entries.values() {
            let mut captured = RouteParams::new();

            for entry in chain {
                let node = &self.nodes[entry.node.0];

                if node.pattern.captures_param() {
                    if let Some(segment) = &entry.segment {
                        captured.insert(node.name.clone(), segment.clone());
                    }
                }

                let mut params = captured.clone();
                for key in &node.query_keys {
                    if let Some(value) = source.query.get(key) {
                        params.insert(key.clone(), value);
                    }
                }

                states[entry.node.0] = MatchState {
                    matched: true,
                    exact: entry.exact,
                    segment: entry.segment.clone(),
                    params,
                };
            }
        }

        states
    }

    fn classify(&self, states: &[MatchState]) -> Vec<NodeTransition> {
        let mut kinds: Vec<TransitionKind> = self
            .nodes
            .iter()
            .zip(states)
            .map(|(node, next)| TransitionKind::classify(&node.state, next))
            .collect();
        kinds[NodeId::ROOT.0] = TransitionKind::None;

        let changed: Vec<NodeId> = self
            .ids()
            .filter(|id| kinds[id.0] != TransitionKind::None)
            .collect();

        for id in changed {
            for ancestor in self.ancestors(id) {
                if ancestor == NodeId::ROOT {
                    break;
                }
                let both_matched = self.nodes[ancestor.0].state.matched && states[ancestor.0].matched;
                if both_matched && kinds[ancestor.0] == TransitionKind::None {
                    kinds[ancestor.0] = TransitionKind::Update { descendants: true };
                }
            }
        }

        self.ids()
            .filter(|id| kinds[id.0] != TransitionKind::None)
            .map(|id| NodeTransition {
                node: id,
                kind: kinds[id.0],
                previous: self.nodes[id.0].state.clone(),
                next: states[id.0].clone(),
            })
            .collect()
    }
}
