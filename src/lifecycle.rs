//! Route lifecycle hooks
//!
//! Each route node keeps six hook lists:
//!
//! - before-enter / before-update / before-leave run against the *pending*
//!   state and may veto the navigation
//! - after-enter / after-update / after-leave run once the new state is
//!   committed; their result is ignored
//!
//! Update hooks carry [`UpdateOptions`]. An entry registered without
//! `trace_descendants` only fires when the node's own match changed, not when
//! the update was triggered by a descendant.

use crate::params::RouteParams;
use crate::route::NodeId;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Result of a before-hook
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LifecycleResult {
    /// No objection
    #[default]
    Continue,

    /// Veto the navigation
    Abort { reason: String },

    /// Veto the navigation and navigate to `to` instead
    Redirect { to: String },
}

impl LifecycleResult {
    /// Create a continue result
    pub fn cont() -> Self {
        Self::Continue
    }

    /// Create an abort result
    pub fn abort(reason: impl Into<String>) -> Self {
        Self::Abort {
            reason: reason.into(),
        }
    }

    /// Create a redirect result
    pub fn redirect(to: impl Into<String>) -> Self {
        Self::Redirect { to: to.into() }
    }

    /// Check if lifecycle allows continuation
    pub fn allows_continue(&self) -> bool {
        matches!(self, LifecycleResult::Continue)
    }

    /// Check if lifecycle aborts
    pub fn is_abort(&self) -> bool {
        matches!(self, LifecycleResult::Abort { .. })
    }

    /// Check if lifecycle redirects
    pub fn is_redirect(&self) -> bool {
        matches!(self, LifecycleResult::Redirect { .. })
    }
}

/// `true` proceeds, `false` vetoes.
impl From<bool> for LifecycleResult {
    fn from(proceed: bool) -> Self {
        if proceed {
            LifecycleResult::Continue
        } else {
            LifecycleResult::abort("vetoed")
        }
    }
}

impl From<()> for LifecycleResult {
    fn from((): ()) -> Self {
        LifecycleResult::Continue
    }
}

/// Output of a before-hook; `Err` is tolerated as "no objection"
pub type HookResult = anyhow::Result<LifecycleResult>;

/// Future returned by before-hooks
pub type BeforeHookFuture = BoxFuture<'static, HookResult>;

/// Future returned by after-hooks
pub type AfterHookFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Passed to update hooks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateContext {
    /// The update was reported because a descendant changed
    pub descendants: bool,
}

/// Registration options for update hooks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Also fire for descendant-triggered updates
    pub trace_descendants: bool,
}

impl UpdateOptions {
    /// Options that also fire for descendant-triggered updates
    pub fn trace_descendants() -> Self {
        Self {
            trace_descendants: true,
        }
    }

    /// Whether an entry with these options fires for `context`
    pub fn accepts(&self, context: UpdateContext) -> bool {
        !context.descendants || self.trace_descendants
    }
}

/// Pending state of a node, handed to before-hooks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextRouteMatch {
    pub id: NodeId,
    /// Dotted path of the node, e.g. `account.id`
    pub route: String,
    pub matched: bool,
    pub exact: bool,
    pub params: RouteParams,
}

pub type BeforeEnterFn = Arc<dyn Fn(&NextRouteMatch) -> BeforeHookFuture + Send + Sync>;
pub type BeforeUpdateFn =
    Arc<dyn Fn(&NextRouteMatch, UpdateContext) -> BeforeHookFuture + Send + Sync>;
pub type BeforeLeaveFn = Arc<dyn Fn() -> BeforeHookFuture + Send + Sync>;
pub type AfterEnterFn = Arc<dyn Fn() -> AfterHookFuture + Send + Sync>;
pub type AfterUpdateFn = Arc<dyn Fn(UpdateContext) -> AfterHookFuture + Send + Sync>;
pub type AfterLeaveFn = Arc<dyn Fn() -> AfterHookFuture + Send + Sync>;

/// Identifies one registration; shortcut registrations share one id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(pub(crate) u64);

/// Returned by every registration, pass to `RouteTree::remove_hook`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle {
    pub node: NodeId,
    pub id: HookId,
}

/// Insertion-ordered list of callbacks
pub(crate) struct HookList<T> {
    entries: Vec<(HookId, T)>,
}

impl<T: Clone> HookList<T> {
    pub(crate) fn insert(&mut self, id: HookId, hook: T) {
        self.entries.push((id, hook));
    }

    pub(crate) fn remove(&mut self, id: HookId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Materialize the current entries so callbacks can run while the list
    /// is changed
    pub(crate) fn snapshot(&self) -> Vec<T> {
        self.entries.iter().map(|(_, hook)| hook.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<T> Default for HookList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

/// All hook lists of one node
#[derive(Default)]
pub(crate) struct HookRegistry {
    pub(crate) before_enter: HookList<BeforeEnterFn>,
    pub(crate) before_update: HookList<(BeforeUpdateFn, UpdateOptions)>,
    pub(crate) before_leave: HookList<BeforeLeaveFn>,
    pub(crate) after_enter: HookList<AfterEnterFn>,
    pub(crate) after_update: HookList<(AfterUpdateFn, UpdateOptions)>,
    pub(crate) after_leave: HookList<AfterLeaveFn>,
}

impl HookRegistry {
    /// Drop every entry registered under `id`
    pub(crate) fn remove(&mut self, id: HookId) -> bool {
        let removed = [
            self.before_enter.remove(id),
            self.before_update.remove(id),
            self.before_leave.remove(id),
            self.after_enter.remove(id),
            self.after_update.remove(id),
            self.after_leave.remove(id),
        ];
        removed.contains(&true)
    }

    pub(crate) fn len(&self) -> usize {
        self.before_enter.len()
            + self.before_update.len()
            + self.before_leave.len()
            + self.after_enter.len()
            + self.after_update.len()
            + self.after_leave.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn test_lifecycle_result_continue() {
        let result = LifecycleResult::cont();
        assert!(result.allows_continue());
        assert!(!result.is_abort());
        assert!(!result.is_redirect());
    }

    #[test]
    fn test_lifecycle_result_abort() {
        let result = LifecycleResult::abort("Test");
        assert!(!result.allows_continue());
        assert!(result.is_abort());
    }

    #[test]
    fn test_lifecycle_result_redirect() {
        let result = LifecycleResult::redirect("/test");
        assert!(!result.allows_continue());
        assert!(result.is_redirect());
    }

    #[test]
    fn test_lifecycle_result_from_bool_and_unit() {
        assert!(LifecycleResult::from(true).allows_continue());
        assert!(LifecycleResult::from(false).is_abort());
        assert!(LifecycleResult::from(()).allows_continue());
    }

    #[test]
    fn test_update_options_filter() {
        let direct = UpdateContext { descendants: false };
        let deep = UpdateContext { descendants: true };

        assert!(UpdateOptions::default().accepts(direct));
        assert!(!UpdateOptions::default().accepts(deep));
        assert!(UpdateOptions::trace_descendants().accepts(deep));
    }

    #[test]
    fn test_registry_removes_every_entry_of_an_id() {
        let mut registry = HookRegistry::default();
        let shared = HookId(1);
        let other = HookId(2);

        let enter: AfterEnterFn = Arc::new(|| async { Ok::<(), anyhow::Error>(()) }.boxed());
        let update: AfterUpdateFn =
            Arc::new(|_| async { Ok::<(), anyhow::Error>(()) }.boxed());

        registry.after_enter.insert(shared, enter.clone());
        registry.after_update.insert(shared, (update, UpdateOptions::default()));
        registry.after_enter.insert(other, enter);
        assert_eq!(registry.len(), 3);

        assert!(registry.remove(shared));
        assert_eq!(registry.len(), 1);
        assert!(!registry.remove(shared));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut list: HookList<u32> = HookList::default();
        list.insert(HookId(1), 10);
        list.insert(HookId(2), 20);

        let snapshot = list.snapshot();
        list.remove(HookId(1));

        assert_eq!(snapshot, vec![10, 20]);
        assert_eq!(list.snapshot(), vec![20]);
    }
}
