//! Route schema and the compiled route tree
//!
//! A [`Schema`] is the nested declaration of named routes. Compiling it with
//! [`RouteTree::build`] produces an arena of [`RouteNode`]s addressed by
//! [`NodeId`]: children are owned by the arena, the parent link is a plain
//! index.
//!
//! # Example
//!
//! ```
//! use route_tree::{RouteSpec, RouteTree, Schema};
//!
//! let tree = RouteTree::build(
//!     Schema::new()
//!         .route("default", RouteSpec::literal(""))
//!         .route("account", RouteSpec::new().child("id", RouteSpec::segment())),
//! )
//! .unwrap();
//!
//! let id = tree.find("account.id").unwrap();
//! assert_eq!(tree.node(id).unwrap().name(), "id");
//! ```

use crate::error::RouteError;
use crate::lifecycle::{
    AfterEnterFn, AfterUpdateFn, BeforeEnterFn, BeforeUpdateFn, HookHandle, HookId,
    HookRegistry, HookResult, LifecycleResult, NextRouteMatch, UpdateContext, UpdateOptions,
};
use crate::location::Location;
use crate::matcher::MatchPattern;
use crate::params::{QueryParams, RouteParams};
use crate::parallel::ParallelOptions;
use crate::service::{FieldValue, RouteInfo, ServiceFactory, ServiceSlot};
use futures::FutureExt;
use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Separator of dotted route names, e.g. `account.id`
pub const NAME_SEPARATOR: char = '.';

// ============================================================================
// Schema input
// ============================================================================

/// Declaration of one route.
///
/// Without an explicit pattern a route matches the literal segment equal to
/// its own name.
#[derive(Debug, Clone, Default)]
pub struct RouteSpec {
    pattern: Option<MatchPattern>,
    query: BTreeSet<String>,
    children: Vec<(String, RouteSpec)>,
    group: Option<String>,
    allow_exact: bool,
    extensions: Vec<(String, FieldValue)>,
}

impl RouteSpec {
    /// Route matching its own name
    pub fn new() -> Self {
        Self::default()
    }

    /// Route matching exactly `text` as one segment
    pub fn literal(text: impl Into<String>) -> Self {
        Self::new().pattern(MatchPattern::literal(text))
    }

    /// Route capturing any single segment as a parameter named after it
    pub fn segment() -> Self {
        Self::new().pattern(MatchPattern::Segment)
    }

    /// Route capturing the rest of the path
    pub fn rest() -> Self {
        Self::new().pattern(MatchPattern::Rest)
    }

    /// Route that consumes nothing and only hosts children
    pub fn compatible() -> Self {
        Self::new().pattern(MatchPattern::Compatible)
    }

    /// Route capturing what `pattern` matches at the start of the remainder
    pub fn regex(pattern: &str) -> Result<Self, RouteError> {
        Ok(Self::new().pattern(MatchPattern::regex(pattern)?))
    }

    /// Set the match pattern
    pub fn pattern(mut self, pattern: MatchPattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Query keys exposed in the route's params while it is matched
    pub fn query<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.query.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Add a child route
    pub fn child(mut self, name: impl Into<String>, spec: RouteSpec) -> Self {
        self.children.push((name.into(), spec));
        self
    }

    /// Put the route in a parallel group
    pub fn group(mut self, tag: impl Into<String>) -> Self {
        self.group = Some(tag.into());
        self
    }

    /// Allow the route to be the exact terminus even though it has children
    pub fn exact(mut self, allow: bool) -> Self {
        self.allow_exact = allow;
        self
    }

    /// Declare an extension field and its default value
    pub fn extension<T>(mut self, key: impl Into<String>, default: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.extensions.push((key.into(), Arc::new(default)));
        self
    }
}

/// Top-level route declarations, in matching order
#[derive(Debug, Clone, Default)]
pub struct Schema {
    routes: Vec<(String, RouteSpec)>,
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level route
    pub fn route(mut self, name: impl Into<String>, spec: RouteSpec) -> Self {
        self.routes.push((name.into(), spec));
        self
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Index of a node in its [`RouteTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The implicit root every top-level route hangs from
    pub const ROOT: NodeId = NodeId(0);

    /// Arena index
    pub fn index(self) -> usize {
        self.0
    }
}

/// Committed match state of a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchState {
    pub matched: bool,
    /// Implies `matched`
    pub exact: bool,
    /// Consumed segment, `None` when unmatched or zero-width
    pub segment: Option<String>,
    /// Captured segments of the lineage plus recognized query values
    pub params: RouteParams,
}

impl MatchState {
    pub(crate) fn root() -> Self {
        Self {
            matched: true,
            ..Self::default()
        }
    }
}

/// One compiled route
pub struct RouteNode {
    pub(crate) name: String,
    pub(crate) route: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) pattern: MatchPattern,
    pub(crate) allow_exact: bool,
    pub(crate) query_keys: BTreeSet<String>,
    pub(crate) group: Option<String>,
    pub(crate) parallel: Option<Arc<ParallelOptions>>,
    pub(crate) state: MatchState,
    pub(crate) hooks: HookRegistry,
    pub(crate) service: ServiceSlot,
    pub(crate) extensions: HashMap<String, FieldValue>,
}

impl RouteNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted name from the top, e.g. `account.id`; empty for the root
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn pattern(&self) -> &MatchPattern {
        &self.pattern
    }

    pub fn allows_exact(&self) -> bool {
        self.allow_exact
    }

    pub fn query_keys(&self) -> impl Iterator<Item = &str> {
        self.query_keys.iter().map(String::as_str)
    }

    /// Parallel group tag, `None` for primary routes
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Parallel whitelist in effect, declared here or inherited
    pub fn parallel(&self) -> Option<&ParallelOptions> {
        self.parallel.as_deref()
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn matched(&self) -> bool {
        self.state.matched
    }

    pub fn exact(&self) -> bool {
        self.state.exact
    }

    pub fn params(&self) -> &RouteParams {
        &self.state.params
    }

    pub fn has_service(&self) -> bool {
        self.service.has_factory()
    }

    /// Number of registered hook entries
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

impl fmt::Debug for RouteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteNode")
            .field("route", &self.route)
            .field("pattern", &self.pattern)
            .field("group", &self.group)
            .field("children", &self.children.len())
            .field("state", &self.state)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

// ============================================================================
// Tree
// ============================================================================

/// Compiled schema plus the committed match state of every route
pub struct RouteTree {
    pub(crate) nodes: Vec<RouteNode>,
    pub(crate) location: Location,
    next_hook: u64,
}

impl RouteTree {
    /// Compile a schema
    pub fn build(schema: Schema) -> Result<Self, RouteError> {
        let root = RouteNode {
            name: String::new(),
            route: String::new(),
            parent: None,
            children: Vec::new(),
            pattern: MatchPattern::Compatible,
            allow_exact: false,
            query_keys: BTreeSet::new(),
            group: None,
            parallel: None,
            state: MatchState::root(),
            hooks: HookRegistry::default(),
            service: ServiceSlot::default(),
            extensions: HashMap::new(),
        };

        let mut tree = Self {
            nodes: vec![root],
            location: Location::default(),
            next_hook: 0,
        };

        for (name, spec) in schema.routes {
            tree.insert(NodeId::ROOT, name, spec, None)?;
        }

        Ok(tree)
    }

    fn insert(
        &mut self,
        parent: NodeId,
        name: String,
        spec: RouteSpec,
        inherited_group: Option<&str>,
    ) -> Result<NodeId, RouteError> {
        if name.is_empty() || name.contains(NAME_SEPARATOR) {
            return Err(RouteError::InvalidName { name });
        }

        let parent_route = self.nodes[parent.0].route.clone();
        if self.child(parent, &name).is_some() {
            return Err(RouteError::DuplicateRoute {
                parent: parent_route,
                name,
            });
        }

        let route = if parent_route.is_empty() {
            name.clone()
        } else {
            format!("{}{}{}", parent_route, NAME_SEPARATOR, name)
        };

        let group = match (spec.group, inherited_group) {
            (Some(tag), _) if tag.is_empty() => {
                return Err(RouteError::InvalidGroup { route, group: tag });
            }
            (Some(tag), None) if parent == NodeId::ROOT => Some(tag),
            (Some(tag), Some(inherited)) if tag == inherited => Some(tag),
            (Some(tag), _) => return Err(RouteError::InvalidGroup { route, group: tag }),
            (None, inherited) => inherited.map(str::to_string),
        };

        let id = NodeId(self.nodes.len());
        let pattern = spec
            .pattern
            .unwrap_or_else(|| MatchPattern::literal(name.clone()));

        self.nodes.push(RouteNode {
            name,
            route,
            parent: Some(parent),
            children: Vec::new(),
            pattern,
            allow_exact: spec.allow_exact,
            query_keys: spec.query,
            group: group.clone(),
            parallel: self.nodes[parent.0].parallel.clone(),
            state: MatchState::default(),
            hooks: HookRegistry::default(),
            service: ServiceSlot::default(),
            extensions: spec.extensions.into_iter().collect(),
        });
        self.nodes[parent.0].children.push(id);

        for (child_name, child_spec) in spec.children {
            self.insert(id, child_name, child_spec, group.as_deref())?;
        }

        Ok(id)
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub fn root(&self) -> &RouteNode {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn node(&self, id: NodeId) -> Option<&RouteNode> {
        self.nodes.get(id.0)
    }

    /// Like [`node`](Self::node), but an unknown id is an error
    pub fn get(&self, id: NodeId) -> Result<&RouteNode, RouteError> {
        self.nodes
            .get(id.0)
            .ok_or(RouteError::UnknownNode { index: id.0 })
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut RouteNode, RouteError> {
        self.nodes
            .get_mut(id.0)
            .ok_or(RouteError::UnknownNode { index: id.0 })
    }

    /// Resolve a dotted name such as `account.id`; the empty name is the root
    pub fn find(&self, route: &str) -> Option<NodeId> {
        if route.is_empty() {
            return Some(NodeId::ROOT);
        }

        route
            .split(NAME_SEPARATOR)
            .try_fold(NodeId::ROOT, |current, name| self.child(current, name))
    }

    /// Direct child of `parent` called `name`
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node(parent)?
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[child.0].name == name)
    }

    /// Strict ancestors of `id`, nearest first, root included
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).and_then(|node| node.parent), |current| {
            self.nodes[current.0].parent
        })
    }

    /// `node` is `ancestor` or lies below it
    pub fn is_descendant_or_self(&self, node: NodeId, ancestor: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|id| id == ancestor)
    }

    /// `id` and its ancestors from the top-level route down, root excluded
    pub(crate) fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut lineage: Vec<NodeId> = std::iter::once(id)
            .chain(self.ancestors(id))
            .filter(|&node| node != NodeId::ROOT)
            .collect();
        lineage.reverse();
        lineage
    }

    /// All node ids in declaration order, root first
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Location of the last committed navigation
    pub fn location(&self) -> &Location {
        &self.location
    }

    pub(crate) fn info(&self, id: NodeId) -> RouteInfo {
        let node = &self.nodes[id.0];
        RouteInfo {
            id,
            name: node.name.clone(),
            route: node.route.clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------------

    fn allocate_hook(&mut self, node: NodeId) -> Result<HookHandle, RouteError> {
        self.get(node)?;
        self.next_hook += 1;
        Ok(HookHandle {
            node,
            id: HookId(self.next_hook),
        })
    }

    /// Run before the route becomes matched; may veto
    pub fn before_enter<F, Fut, R>(&mut self, node: NodeId, hook: F) -> Result<HookHandle, RouteError>
    where
        F: Fn(&NextRouteMatch) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Into<LifecycleResult> + 'static,
    {
        let handle = self.allocate_hook(node)?;
        self.nodes[node.0]
            .hooks
            .before_enter
            .insert(handle.id, before_enter_fn(hook));
        Ok(handle)
    }

    /// Run before a matched route changes; may veto
    pub fn before_update<F, Fut, R>(
        &mut self,
        node: NodeId,
        hook: F,
        options: UpdateOptions,
    ) -> Result<HookHandle, RouteError>
    where
        F: Fn(&NextRouteMatch, UpdateContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Into<LifecycleResult> + 'static,
    {
        let handle = self.allocate_hook(node)?;
        let hook: BeforeUpdateFn = Arc::new(move |next: &NextRouteMatch, context| {
            hook(next, context).map(lift).boxed()
        });
        self.nodes[node.0]
            .hooks
            .before_update
            .insert(handle.id, (hook, options));
        Ok(handle)
    }

    /// Run before the route stops matching; may veto
    pub fn before_leave<F, Fut, R>(&mut self, node: NodeId, hook: F) -> Result<HookHandle, RouteError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Into<LifecycleResult> + 'static,
    {
        let handle = self.allocate_hook(node)?;
        self.nodes[node.0].hooks.before_leave.insert(
            handle.id,
            Arc::new(move || hook().map(lift).boxed()),
        );
        Ok(handle)
    }

    /// Run once the route became matched
    pub fn after_enter<F, Fut>(&mut self, node: NodeId, hook: F) -> Result<HookHandle, RouteError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handle = self.allocate_hook(node)?;
        self.nodes[node.0]
            .hooks
            .after_enter
            .insert(handle.id, after_fn(hook));
        Ok(handle)
    }

    /// Run once a matched route changed
    pub fn after_update<F, Fut>(
        &mut self,
        node: NodeId,
        hook: F,
        options: UpdateOptions,
    ) -> Result<HookHandle, RouteError>
    where
        F: Fn(UpdateContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handle = self.allocate_hook(node)?;
        let hook: AfterUpdateFn = Arc::new(move |context| hook(context).boxed());
        self.nodes[node.0]
            .hooks
            .after_update
            .insert(handle.id, (hook, options));
        Ok(handle)
    }

    /// Run once the route stopped matching
    pub fn after_leave<F, Fut>(&mut self, node: NodeId, hook: F) -> Result<HookHandle, RouteError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handle = self.allocate_hook(node)?;
        self.nodes[node.0]
            .hooks
            .after_leave
            .insert(handle.id, after_fn(hook));
        Ok(handle)
    }

    /// Register `hook` as both before-enter and before-update
    pub fn intercept<F, Fut, R>(
        &mut self,
        node: NodeId,
        hook: F,
        options: UpdateOptions,
    ) -> Result<HookHandle, RouteError>
    where
        F: Fn(&NextRouteMatch) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Into<LifecycleResult> + 'static,
    {
        let handle = self.allocate_hook(node)?;
        let enter = before_enter_fn(hook);
        let update: BeforeUpdateFn = {
            let enter = Arc::clone(&enter);
            Arc::new(move |next: &NextRouteMatch, _context: UpdateContext| enter(next))
        };

        let hooks = &mut self.nodes[node.0].hooks;
        hooks.before_enter.insert(handle.id, enter);
        hooks.before_update.insert(handle.id, (update, options));
        Ok(handle)
    }

    /// Register `hook` as both after-enter and after-update
    pub fn react<F, Fut>(
        &mut self,
        node: NodeId,
        hook: F,
        options: UpdateOptions,
    ) -> Result<HookHandle, RouteError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handle = self.allocate_hook(node)?;
        let enter = after_fn(hook);
        let update: AfterUpdateFn = {
            let enter = Arc::clone(&enter);
            Arc::new(move |_context: UpdateContext| enter())
        };

        let hooks = &mut self.nodes[node.0].hooks;
        hooks.after_enter.insert(handle.id, enter);
        hooks.after_update.insert(handle.id, (update, options));
        Ok(handle)
    }

    /// Remove every entry registered under `handle`.
    ///
    /// Returns `false` when nothing was registered under it anymore.
    pub fn remove_hook(&mut self, handle: HookHandle) -> bool {
        self.nodes
            .get_mut(handle.node.0)
            .is_some_and(|node| node.hooks.remove(handle.id))
    }

    // ------------------------------------------------------------------------
    // Services and extension fields
    // ------------------------------------------------------------------------

    /// Register the route's service factory; only one is allowed
    pub fn service(&mut self, node: NodeId, factory: ServiceFactory) -> Result<(), RouteError> {
        let node = self.get_mut(node)?;
        if node.service.set_factory(factory) {
            Ok(())
        } else {
            Err(RouteError::DuplicateService {
                route: node.route.clone(),
            })
        }
    }

    /// Read an extension field.
    ///
    /// While the route is matched and its service has resolved, the service's
    /// value wins; otherwise the declared default is returned. `None` when the
    /// key is unknown or the value is not a `T`.
    pub fn field<T>(&self, node: NodeId, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let node = self.node(node)?;

        let from_service = node
            .state
            .matched
            .then(|| node.service.resolved())
            .flatten()
            .and_then(|service| service.field(key));

        from_service
            .or_else(|| node.extensions.get(key).cloned())?
            .downcast::<T>()
            .ok()
    }

    // ------------------------------------------------------------------------
    // References
    // ------------------------------------------------------------------------

    /// Build an href that would match `node`.
    ///
    /// Capturing routes along the lineage take their segment from `params`
    /// (keyed by route name), falling back to the currently matched segment;
    /// params not consumed as segments go to the query.
    /// With `preserve_query`, current values of the query keys recognized
    /// along the lineage are kept. Referencing a grouped route keeps the
    /// current primary path and replaces only that group's path; referencing a
    /// primary route keeps the current group paths.
    ///
    /// ```
    /// use route_tree::{RouteParams, RouteSpec, RouteTree, Schema};
    ///
    /// let tree = RouteTree::build(
    ///     Schema::new().route("account", RouteSpec::new().child("id", RouteSpec::segment())),
    /// )
    /// .unwrap();
    /// let id = tree.find("account.id").unwrap();
    ///
    /// let href = tree.ref_for(id, &RouteParams::new().with("id", "42"), false).unwrap();
    /// assert_eq!(href, "/account/42");
    /// assert!(tree.ref_for(id, &RouteParams::new(), false).is_err());
    /// ```
    pub fn ref_for(
        &self,
        node: NodeId,
        params: &RouteParams,
        preserve_query: bool,
    ) -> Result<String, RouteError> {
        let target = self.get(node)?;
        let lineage = self.lineage(node);

        let mut consumed = BTreeSet::new();
        let mut fragments = Vec::new();

        for id in &lineage {
            let node = &self.nodes[id.0];
            let fragment = match &node.pattern {
                MatchPattern::Compatible => continue,
                MatchPattern::Literal(text) => text.clone(),
                _ => match params.get(&node.name) {
                    Some(value) => {
                        consumed.insert(node.name.as_str());
                        value.to_string()
                    }
                    None => match &node.state.segment {
                        Some(segment) => segment.clone(),
                        None => {
                            return Err(RouteError::MissingParam {
                                key: node.name.clone(),
                            })
                        }
                    },
                },
            };
            if !fragment.is_empty() {
                fragments.push(fragment);
            }
        }

        let path = format!("/{}", fragments.join("/"));

        let mut query = QueryParams::new();
        if preserve_query {
            let recognized: BTreeSet<&String> = lineage
                .iter()
                .flat_map(|id| self.nodes[id.0].query_keys.iter())
                .collect();
            for (key, values) in self.location.query.iter() {
                if recognized.contains(key) {
                    for value in values {
                        query.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        for (key, value) in params.iter() {
            if !consumed.contains(key.as_str()) {
                query.set(key.clone(), value.clone());
            }
        }

        let mut location = Location {
            path,
            query,
            groups: self.location.groups.clone(),
        };

        if let Some(group) = &target.group {
            let group_path = std::mem::replace(&mut location.path, self.location.path.clone());
            location.groups.insert(group.clone(), group_path);
        }

        Ok(location.to_href())
    }
}

impl fmt::Debug for RouteTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTree")
            .field("nodes", &self.nodes)
            .field("location", &self.location)
            .finish()
    }
}

fn before_enter_fn<F, Fut, R>(hook: F) -> BeforeEnterFn
where
    F: Fn(&NextRouteMatch) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    R: Into<LifecycleResult> + 'static,
{
    Arc::new(move |next: &NextRouteMatch| hook(next).map(lift).boxed())
}

fn lift<R: Into<LifecycleResult>>(result: anyhow::Result<R>) -> HookResult {
    result.map(Into::into)
}

fn after_fn<F, Fut>(hook: F) -> AfterEnterFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move || hook().boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{service_fn, RouteService};

    fn schema() -> Schema {
        Schema::new()
            .route("default", RouteSpec::literal(""))
            .route(
                "account",
                RouteSpec::new()
                    .query(["tab"])
                    .child("id", RouteSpec::segment().child("edit", RouteSpec::new())),
            )
            .route(
                "contacts",
                RouteSpec::new()
                    .group("sidebar")
                    .child("id", RouteSpec::segment()),
            )
    }

    #[test]
    fn test_build_assigns_dotted_names_and_groups() {
        let tree = RouteTree::build(schema()).unwrap();

        let edit = tree.find("account.id.edit").unwrap();
        let node = tree.node(edit).unwrap();
        assert_eq!(node.route(), "account.id.edit");
        assert_eq!(node.pattern(), &MatchPattern::literal("edit"));
        assert_eq!(node.group(), None);

        let contact = tree.find("contacts.id").unwrap();
        assert_eq!(tree.node(contact).unwrap().group(), Some("sidebar"));
        assert_eq!(tree.find(""), Some(NodeId::ROOT));
        assert_eq!(tree.find("account.missing"), None);
    }

    #[test]
    fn test_root_is_always_matched() {
        let tree = RouteTree::build(Schema::new()).unwrap();
        assert!(tree.root().matched());
        assert!(!tree.root().exact());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_duplicate_and_invalid_names() {
        let duplicate = RouteTree::build(
            Schema::new()
                .route("a", RouteSpec::new())
                .route("a", RouteSpec::new()),
        );
        assert!(matches!(duplicate, Err(RouteError::DuplicateRoute { .. })));

        let dotted = RouteTree::build(Schema::new().route("a.b", RouteSpec::new()));
        assert!(matches!(dotted, Err(RouteError::InvalidName { .. })));
    }

    #[test]
    fn test_groups_only_on_top_level_routes() {
        let nested = RouteTree::build(
            Schema::new().route("a", RouteSpec::new().child("b", RouteSpec::new().group("g"))),
        );
        assert_eq!(
            nested.unwrap_err(),
            RouteError::InvalidGroup {
                route: "a.b".to_string(),
                group: "g".to_string()
            }
        );

        let restated = RouteTree::build(
            Schema::new().route(
                "a",
                RouteSpec::new()
                    .group("g")
                    .child("b", RouteSpec::new().group("g")),
            ),
        );
        assert!(restated.is_ok());
    }

    #[test]
    fn test_ancestors_and_lineage() {
        let tree = RouteTree::build(schema()).unwrap();
        let account = tree.find("account").unwrap();
        let edit = tree.find("account.id.edit").unwrap();

        let ancestors: Vec<_> = tree.ancestors(edit).collect();
        assert_eq!(ancestors.len(), 3);
        assert_eq!(*ancestors.last().unwrap(), NodeId::ROOT);
        assert!(tree.is_descendant_or_self(edit, account));
        assert!(!tree.is_descendant_or_self(account, edit));
        assert_eq!(tree.lineage(edit).first(), Some(&account));
    }

    #[test]
    fn test_ref_for_segments_and_query() {
        let tree = RouteTree::build(schema()).unwrap();
        let edit = tree.find("account.id.edit").unwrap();

        let href = tree
            .ref_for(edit, &RouteParams::new().with("id", "7").with("tab", "x"), false)
            .unwrap();
        assert_eq!(href, "/account/7/edit?tab=x");

        let err = tree.ref_for(edit, &RouteParams::new(), false).unwrap_err();
        assert_eq!(err, RouteError::MissingParam { key: "id".to_string() });

        let default = tree.find("default").unwrap();
        assert_eq!(tree.ref_for(default, &RouteParams::new(), false).unwrap(), "/");
    }

    #[test]
    fn test_ref_for_falls_back_to_matched_segments() {
        let mut tree = RouteTree::build(schema()).unwrap();
        let plan = tree.reconcile(&Location::parse("/account/7/edit")).unwrap();
        tree.commit(&plan);

        let edit = tree.find("account.id.edit").unwrap();
        assert_eq!(
            tree.ref_for(edit, &RouteParams::new(), false).unwrap(),
            "/account/7/edit"
        );
        assert_eq!(
            tree.ref_for(edit, &RouteParams::new().with("id", "8"), false).unwrap(),
            "/account/8/edit"
        );

        // Unmatched capturing routes still need the param
        let contact = tree.find("contacts.id").unwrap();
        let err = tree.ref_for(contact, &RouteParams::new(), false).unwrap_err();
        assert_eq!(err, RouteError::MissingParam { key: "id".to_string() });
    }

    #[test]
    fn test_ref_for_preserves_recognized_query_and_groups() {
        let mut tree = RouteTree::build(schema()).unwrap();
        tree.location = Location::parse("/account/1?tab=a&other=b&_sidebar=%2Fcontacts%2F3");

        let account = tree.find("account").unwrap();
        let href = tree.ref_for(account, &RouteParams::new(), true).unwrap();
        assert_eq!(href, "/account?_sidebar=%2Fcontacts%2F3&tab=a");

        let contact = tree.find("contacts.id").unwrap();
        let href = tree
            .ref_for(contact, &RouteParams::new().with("id", "9"), false)
            .unwrap();
        assert_eq!(href, "/account/1?_sidebar=%2Fcontacts%2F9");
    }

    #[test]
    fn test_hook_registration_and_removal() {
        let mut tree = RouteTree::build(schema()).unwrap();
        let account = tree.find("account").unwrap();

        let intercept = tree
            .intercept(account, |_next| async { Ok(true) }, UpdateOptions::default())
            .unwrap();
        let leave = tree.after_leave(account, || async { Ok(()) }).unwrap();
        assert_eq!(tree.node(account).unwrap().hook_count(), 3);

        assert!(tree.remove_hook(intercept));
        assert_eq!(tree.node(account).unwrap().hook_count(), 1);
        assert!(!tree.remove_hook(intercept));
        assert!(tree.remove_hook(leave));

        let unknown = tree.after_enter(NodeId(999), || async { Ok(()) });
        assert_eq!(unknown.unwrap_err(), RouteError::UnknownNode { index: 999 });
    }

    struct Titled;

    impl RouteService for Titled {
        fn field(&self, key: &str) -> Option<FieldValue> {
            (key == "title").then(|| Arc::new(String::from("From service")) as FieldValue)
        }
    }

    #[test]
    fn test_service_is_unique_and_fields_fall_back() {
        let mut tree = RouteTree::build(
            Schema::new().route(
                "account",
                RouteSpec::new().extension("title", String::from("Default")),
            ),
        )
        .unwrap();
        let account = tree.find("account").unwrap();

        tree.service(account, service_fn(|_| async { Ok(Titled) }))
            .unwrap();
        let again = tree.service(account, service_fn(|_| async { Ok(Titled) }));
        assert_eq!(
            again.unwrap_err(),
            RouteError::DuplicateService {
                route: "account".to_string()
            }
        );

        let title = tree.field::<String>(account, "title").unwrap();
        assert_eq!(title.as_str(), "Default");
        assert!(tree.field::<u32>(account, "title").is_none());
        assert!(tree.field::<String>(account, "missing").is_none());
    }
}
