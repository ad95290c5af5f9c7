//! Router: history, reconciliation and hooks tied together
//!
//! Every navigation goes through the same steps:
//!
//! 1. parse the href and reconcile it against the tree
//! 2. run before-hooks against the pending state
//! 3. on a veto, stop (and put the history back if it already moved); on a
//!    redirect, start over with the new target
//! 4. record the entry in the history, commit, notify subscribers and match
//!    actions
//! 5. run after-hooks against the committed state

use crate::coordinator::HookCoordinator;
use crate::error::{Diagnostics, HookFailure, NavigationResult, RouteError};
use crate::history::{History, MemoryHistory};
use crate::lifecycle::LifecycleResult;
use crate::location::Location;
use crate::params::RouteParams;
use crate::reconcile::TransitionPlan;
use crate::route::{NodeId, RouteTree};
use crate::{debug_log, info_log, warn_log};
use crate::{NavigationDirection, RouteChangeEvent};

/// Default bound on chained redirects
pub const DEFAULT_MAX_REDIRECTS: usize = 8;

type Listener = Box<dyn Fn(&RouteChangeEvent) + Send + Sync>;
type ActionFn = Box<dyn Fn(&RouteParams) + Send + Sync>;

struct MatchAction {
    node: NodeId,
    exact: bool,
    callback: ActionFn,
}

impl MatchAction {
    fn satisfied(&self, tree: &RouteTree) -> bool {
        tree.node(self.node).is_some_and(|node| {
            if self.exact {
                node.exact()
            } else {
                node.matched()
            }
        })
    }
}

/// Where a navigation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Push,
    Replace,
    Back,
    Forward,
    /// The history moved on its own
    Sync,
}

impl Origin {
    fn direction(self) -> NavigationDirection {
        match self {
            Origin::Push | Origin::Forward => NavigationDirection::Forward,
            Origin::Back => NavigationDirection::Back,
            Origin::Replace | Origin::Sync => NavigationDirection::Replace,
        }
    }
}

/// Router over a route tree and a history backend
///
/// # Example
///
/// ```
/// use route_tree::{MemoryHistory, RouteSpec, RouteTree, Router, Schema};
///
/// # pollster::block_on(async {
/// let tree = RouteTree::build(
///     Schema::new().route("account", RouteSpec::new().child("id", RouteSpec::segment())),
/// )
/// .unwrap();
///
/// let mut router = Router::new(tree, MemoryHistory::default());
/// let result = router.push("/account/42").await.unwrap();
///
/// assert!(result.is_success());
/// let id = router.tree().find("account.id").unwrap();
/// assert_eq!(router.tree().node(id).unwrap().params().get("id"), Some("42"));
/// # });
/// ```
pub struct Router<H: History = MemoryHistory> {
    tree: RouteTree,
    history: H,
    coordinator: HookCoordinator,
    listeners: Vec<Listener>,
    actions: Vec<MatchAction>,
    max_redirects: usize,
    committed: Option<String>,
}

impl<H: History> Router<H> {
    /// Create a router; nothing is matched until [`start`](Self::start)
    pub fn new(tree: RouteTree, history: H) -> Self {
        Self {
            tree,
            history,
            coordinator: HookCoordinator::default(),
            listeners: Vec::new(),
            actions: Vec::new(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            committed: None,
        }
    }

    /// Receive every tolerated hook failure
    pub fn on_hook_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&HookFailure) + Send + Sync + 'static,
    {
        self.coordinator
            .set_diagnostics(Diagnostics::new().on_failure(handler));
        self
    }

    /// Bound on chained redirects before a navigation is given up
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    pub fn tree(&self) -> &RouteTree {
        &self.tree
    }

    /// For registering hooks, services and parallel options
    pub fn tree_mut(&mut self) -> &mut RouteTree {
        &mut self.tree
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Location of the last committed navigation
    pub fn location(&self) -> &Location {
        self.tree.location()
    }

    /// Match the history's current entry
    pub async fn start(&mut self) -> Result<NavigationResult, RouteError> {
        info_log!("starting at {}", self.history.current());
        self.sync().await
    }

    /// Navigate to `href` with a new history entry
    pub async fn push(&mut self, href: &str) -> Result<NavigationResult, RouteError> {
        self.navigate(href.to_string(), Origin::Push).await
    }

    /// Navigate to `href`, overwriting the current history entry
    pub async fn replace(&mut self, href: &str) -> Result<NavigationResult, RouteError> {
        self.navigate(href.to_string(), Origin::Replace).await
    }

    /// Re-match after the history changed on its own.
    ///
    /// A veto restores the last committed href in the history.
    pub async fn sync(&mut self) -> Result<NavigationResult, RouteError> {
        let href = self.history.current().to_string();
        self.navigate(href, Origin::Sync).await
    }

    /// Step back; `None` when there is nothing to go back to
    pub async fn back(&mut self) -> Result<Option<NavigationResult>, RouteError> {
        match self.history.back() {
            Some(href) => self.navigate(href, Origin::Back).await.map(Some),
            None => Ok(None),
        }
    }

    /// Step forward; `None` when there is nothing to go forward to
    pub async fn forward(&mut self) -> Result<Option<NavigationResult>, RouteError> {
        match self.history.forward() {
            Some(href) => self.navigate(href, Origin::Forward).await.map(Some),
            None => Ok(None),
        }
    }

    /// Push the reference of `node`, see [`RouteTree::ref_for`]
    pub async fn push_route(
        &mut self,
        node: NodeId,
        params: &RouteParams,
        preserve_query: bool,
    ) -> Result<NavigationResult, RouteError> {
        let href = self.tree.ref_for(node, params, preserve_query)?;
        self.push(&href).await
    }

    /// Replace with the reference of `node`, see [`RouteTree::ref_for`]
    pub async fn replace_route(
        &mut self,
        node: NodeId,
        params: &RouteParams,
        preserve_query: bool,
    ) -> Result<NavigationResult, RouteError> {
        let href = self.tree.ref_for(node, params, preserve_query)?;
        self.replace(&href).await
    }

    /// Be notified after every committed navigation
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&RouteChangeEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Run `callback` whenever `node` becomes matched (exactly matched with
    /// `exact`), and right away if it already is
    pub fn action<F>(&mut self, node: NodeId, exact: bool, callback: F) -> Result<(), RouteError>
    where
        F: Fn(&RouteParams) + Send + Sync + 'static,
    {
        self.tree.get(node)?;

        let action = MatchAction {
            node,
            exact,
            callback: Box::new(callback),
        };
        if action.satisfied(&self.tree) {
            (action.callback)(self.tree.nodes[node.0].params());
        }
        self.actions.push(action);
        Ok(())
    }

    async fn navigate(&mut self, href: String, origin: Origin) -> Result<NavigationResult, RouteError> {
        let mut target = href;
        let mut redirects = 0;

        let plan = loop {
            let plan = match self.tree.reconcile(&Location::parse(&target)) {
                Ok(plan) => plan,
                Err(err) => {
                    self.revert(origin);
                    return Err(err);
                }
            };

            match self.coordinator.before(&self.tree, &plan).await {
                LifecycleResult::Continue => break plan,
                LifecycleResult::Abort { reason } => {
                    self.revert(origin);
                    return Ok(NavigationResult::Blocked {
                        reason: Some(reason),
                        redirect: None,
                    });
                }
                LifecycleResult::Redirect { to } => {
                    if redirects >= self.max_redirects {
                        warn_log!("giving up on {} after {} redirects", to, redirects);
                        self.revert(origin);
                        return Ok(NavigationResult::Blocked {
                            reason: Some("too many redirects".to_string()),
                            redirect: Some(to),
                        });
                    }
                    debug_log!("redirecting {} to {}", target, to);
                    redirects += 1;
                    target = to;
                }
            }
        };

        let href = plan.location().to_href();
        match origin {
            Origin::Push => self.history.push(href.clone()),
            Origin::Replace => self.history.replace(href.clone()),
            Origin::Back | Origin::Forward | Origin::Sync if redirects > 0 => {
                self.history.replace(href.clone());
            }
            Origin::Back | Origin::Forward | Origin::Sync => {}
        }

        let actions_before: Vec<bool> = self
            .actions
            .iter()
            .map(|action| action.satisfied(&self.tree))
            .collect();

        let changed = self.tree.commit(&plan);
        debug_log!("navigated to {}, {} routes changed", href, changed.len());

        let event = RouteChangeEvent {
            from: self.committed.replace(href.clone()),
            to: href.clone(),
            direction: origin.direction(),
            changed,
        };
        self.notify(&event, &actions_before);
        self.coordinator.after(&self.tree, &plan).await;

        Ok(NavigationResult::Success { href })
    }

    fn notify(&self, event: &RouteChangeEvent, actions_before: &[bool]) {
        for listener in &self.listeners {
            listener(event);
        }

        for (action, was) in self.actions.iter().zip(actions_before) {
            if !was && action.satisfied(&self.tree) {
                (action.callback)(self.tree.nodes[action.node.0].params());
            }
        }
    }

    /// Undo a history move the vetoed navigation did not cause
    fn revert(&mut self, origin: Origin) {
        match origin {
            Origin::Push | Origin::Replace => {}
            Origin::Back => {
                self.history.forward();
            }
            Origin::Forward => {
                self.history.back();
            }
            Origin::Sync => {
                if let Some(href) = &self.committed {
                    self.history.replace(href.clone());
                }
            }
        }
    }

    /// Plan a navigation without running hooks or committing
    pub fn preview(&self, href: &str) -> Result<TransitionPlan, RouteError> {
        self.tree.reconcile(&Location::parse(href))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{RouteSpec, Schema};
    use std::sync::{Arc, Mutex};

    fn router() -> Router {
        let tree = RouteTree::build(
            Schema::new()
                .route("home", RouteSpec::literal(""))
                .route("about", RouteSpec::new())
                .route(
                    "account",
                    RouteSpec::new().child("id", RouteSpec::segment()),
                ),
        )
        .unwrap();
        Router::new(tree, MemoryHistory::default())
    }

    fn matched(router: &Router, route: &str) -> bool {
        let id = router.tree().find(route).unwrap();
        router.tree().node(id).unwrap().matched()
    }

    #[test]
    fn test_push_records_history_and_commits() {
        let mut router = router();
        pollster::block_on(router.start()).unwrap();
        assert!(matched(&router, "home"));

        let result = pollster::block_on(router.push("/about")).unwrap();
        assert_eq!(
            result,
            NavigationResult::Success {
                href: "/about".to_string()
            }
        );
        assert!(matched(&router, "about"));
        assert!(!matched(&router, "home"));
        assert_eq!(router.history().entries(), ["/", "/about"]);
    }

    #[test]
    fn test_vetoed_back_restores_history() {
        let mut router = router();
        pollster::block_on(router.start()).unwrap();
        pollster::block_on(router.push("/about")).unwrap();

        let about = router.tree().find("about").unwrap();
        router
            .tree_mut()
            .before_leave(about, || async { Ok(false) })
            .unwrap();

        let result = pollster::block_on(router.back()).unwrap().unwrap();
        assert!(result.is_blocked());
        assert_eq!(router.history().current(), "/about");
        assert!(matched(&router, "about"));
    }

    #[test]
    fn test_failed_back_restores_history() {
        let tree = RouteTree::build(
            Schema::new()
                .route("home", RouteSpec::literal(""))
                .route("about", RouteSpec::new())
                .route("contacts", RouteSpec::new().group("sidebar")),
        )
        .unwrap();
        let mut router = Router::new(tree, MemoryHistory::new("/?_sidebar=contacts"));

        // The group path lacks its leading separator
        assert!(pollster::block_on(router.start()).is_err());
        pollster::block_on(router.push("/about")).unwrap();

        let err = pollster::block_on(router.back()).unwrap_err();
        assert!(matches!(err, RouteError::MalformedPath { .. }));
        assert_eq!(router.history().current(), "/about");
        assert_eq!(router.location().to_href(), "/about");
        assert!(matched(&router, "about"));
    }

    #[test]
    fn test_back_and_forward() {
        let mut router = router();
        pollster::block_on(router.start()).unwrap();
        pollster::block_on(router.push("/about")).unwrap();

        assert!(pollster::block_on(router.back()).unwrap().unwrap().is_success());
        assert!(matched(&router, "home"));
        assert!(pollster::block_on(router.back()).unwrap().is_none());

        assert!(pollster::block_on(router.forward()).unwrap().unwrap().is_success());
        assert!(matched(&router, "about"));
    }

    #[test]
    fn test_redirect_loop_is_bounded() {
        let mut router = router().max_redirects(3);
        let about = router.tree().find("about").unwrap();
        router
            .tree_mut()
            .before_enter(about, |_| async { Ok(LifecycleResult::redirect("/about")) })
            .unwrap();

        let result = pollster::block_on(router.push("/about")).unwrap();
        assert_eq!(result.redirect_path(), Some("/about"));
        assert!(!matched(&router, "about"));
        assert_eq!(router.history().len(), 1);
    }

    #[test]
    fn test_actions_fire_on_becoming_matched() {
        let mut router = router();
        let id = router.tree().find("account.id").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        {
            let seen = Arc::clone(&seen);
            router
                .action(id, true, move |params| {
                    seen.lock()
                        .unwrap()
                        .push(params.get("id").unwrap_or_default().to_string());
                })
                .unwrap();
        }

        pollster::block_on(router.push("/account/1")).unwrap();
        // Still matched, so no second call
        pollster::block_on(router.push("/account/2")).unwrap();
        pollster::block_on(router.push("/about")).unwrap();
        pollster::block_on(router.push("/account/3")).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["1", "3"]);
    }

    #[test]
    fn test_preview_does_not_commit() {
        let router = router();
        let plan = router.preview("/account/1").unwrap();
        assert_eq!(plan.entered().count(), 2);
        assert!(!matched(&router, "account"));
    }
}
