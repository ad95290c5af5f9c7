//! Lifecycle hook execution
//!
//! The [`HookCoordinator`] runs the hooks of every route in a
//! [`TransitionPlan`] in two phases:
//!
//! - before: against the pending state, every hook of the whole plan runs
//!   concurrently and all of them are awaited; any abort or redirect vetoes
//! - after: against the committed state, results are ignored
//!
//! Every hook runs inside [`tolerate`]: errors and panics are reported to
//! [`Diagnostics`] and count as "no objection".

use crate::error::{Diagnostics, HookFailure, HookPhase};
use crate::lifecycle::{LifecycleResult, UpdateContext};
use crate::reconcile::{TransitionKind, TransitionPlan};
use crate::route::{NodeId, RouteTree};
use crate::service::SharedService;
use crate::{debug_log, trace_log};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Error boundary around one hook.
///
/// Resolves to `None` after reporting when the hook fails or panics.
pub(crate) fn tolerate<F, T>(
    future: F,
    route: &str,
    phase: HookPhase,
    diagnostics: &Diagnostics,
) -> impl Future<Output = Option<T>> + Send + 'static
where
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let route = route.to_string();
    let diagnostics = diagnostics.clone();

    async move {
        let message = match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(err)) => format!("{:#}", err),
            Err(payload) => panic_message(payload.as_ref()),
        };

        diagnostics.report(&HookFailure {
            route,
            phase,
            message,
        });
        None
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

type BeforeFuture = BoxFuture<'static, Option<LifecycleResult>>;
type AfterFuture = BoxFuture<'static, Option<()>>;

/// Runs before- and after-phase hooks for a plan
#[derive(Debug, Clone, Default)]
pub struct HookCoordinator {
    diagnostics: Diagnostics,
}

impl HookCoordinator {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn set_diagnostics(&mut self, diagnostics: Diagnostics) {
        self.diagnostics = diagnostics;
    }

    fn service(&self, tree: &RouteTree, node: NodeId) -> Option<SharedService> {
        tree.nodes[node.0]
            .service
            .resolve(&tree.info(node), &self.diagnostics)
    }

    /// Run the before phase and aggregate the verdict.
    ///
    /// A redirect wins over an abort; the first of each kind is kept.
    pub async fn before(&self, tree: &RouteTree, plan: &TransitionPlan) -> LifecycleResult {
        let futures = self.before_futures(tree, plan);
        trace_log!("running {} before hooks", futures.len());

        let mut verdict = LifecycleResult::Continue;
        for result in join_all(futures).await.into_iter().flatten() {
            let stronger = match (&verdict, &result) {
                (_, LifecycleResult::Continue) => false,
                (LifecycleResult::Redirect { .. }, _) => false,
                (LifecycleResult::Abort { .. }, LifecycleResult::Abort { .. }) => false,
                _ => true,
            };
            if stronger {
                verdict = result;
            }
        }

        if !verdict.allows_continue() {
            debug_log!("navigation to {} vetoed: {:?}", plan.location().to_href(), verdict);
        }
        verdict
    }

    /// Run the after phase; failures are reported and otherwise ignored
    pub async fn after(&self, tree: &RouteTree, plan: &TransitionPlan) {
        let futures = self.after_futures(tree, plan);
        trace_log!("running {} after hooks", futures.len());
        join_all(futures).await;
    }

    fn guard<F, T>(&self, future: F, route: &str, phase: HookPhase) -> BoxFuture<'static, Option<T>>
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        tolerate(future, route, phase, &self.diagnostics).boxed()
    }

    fn before_futures(&self, tree: &RouteTree, plan: &TransitionPlan) -> Vec<BeforeFuture> {
        let mut futures: Vec<BeforeFuture> = Vec::new();

        for transition in plan.transitions() {
            let id = transition.node;
            let node = &tree.nodes[id.0];
            let route = node.route.as_str();
            let service = self.service(tree, id);

            match transition.kind {
                TransitionKind::Enter => {
                    let Some(next) = plan.next_match(tree, id) else {
                        continue;
                    };
                    for hook in node.hooks.before_enter.snapshot() {
                        let next = next.clone();
                        futures.push(self.guard(
                            async move { hook(&next).await },
                            route,
                            HookPhase::BeforeEnter,
                        ));
                    }
                    if let Some(service) = service {
                        futures.push(self.guard(
                            async move {
                                match service.await {
                                    Some(service) => service.before_enter(&next).await,
                                    None => Ok(LifecycleResult::Continue),
                                }
                            },
                            route,
                            HookPhase::BeforeEnter,
                        ));
                    }
                }
                TransitionKind::Update { descendants } => {
                    let Some(next) = plan.next_match(tree, id) else {
                        continue;
                    };
                    let context = UpdateContext { descendants };
                    for (hook, options) in node.hooks.before_update.snapshot() {
                        if !options.accepts(context) {
                            continue;
                        }
                        let next = next.clone();
                        futures.push(self.guard(
                            async move { hook(&next, context).await },
                            route,
                            HookPhase::BeforeUpdate,
                        ));
                    }
                    if let Some(service) = service {
                        futures.push(self.guard(
                            async move {
                                match service.await {
                                    Some(service) => service.before_update(&next, context).await,
                                    None => Ok(LifecycleResult::Continue),
                                }
                            },
                            route,
                            HookPhase::BeforeUpdate,
                        ));
                    }
                }
                TransitionKind::Leave => {
                    for hook in node.hooks.before_leave.snapshot() {
                        futures.push(self.guard(
                            async move { hook().await },
                            route,
                            HookPhase::BeforeLeave,
                        ));
                    }
                    if let Some(service) = service {
                        futures.push(self.guard(
                            async move {
                                match service.await {
                                    Some(service) => service.before_leave().await,
                                    None => Ok(LifecycleResult::Continue),
                                }
                            },
                            route,
                            HookPhase::BeforeLeave,
                        ));
                    }
                }
                TransitionKind::None => {}
            }
        }

        futures
    }

    fn after_futures(&self, tree: &RouteTree, plan: &TransitionPlan) -> Vec<AfterFuture> {
        let mut futures: Vec<AfterFuture> = Vec::new();

        for transition in plan.transitions() {
            let id = transition.node;
            let node = &tree.nodes[id.0];
            let route = node.route.as_str();
            let service = self.service(tree, id);

            match transition.kind {
                TransitionKind::Enter => {
                    for hook in node.hooks.after_enter.snapshot() {
                        futures.push(self.guard(
                            async move { hook().await },
                            route,
                            HookPhase::AfterEnter,
                        ));
                    }
                    if let Some(service) = service {
                        futures.push(self.guard(
                            async move {
                                match service.await {
                                    Some(service) => service.after_enter().await,
                                    None => Ok(()),
                                }
                            },
                            route,
                            HookPhase::AfterEnter,
                        ));
                    }
                }
                TransitionKind::Update { descendants } => {
                    let context = UpdateContext { descendants };
                    for (hook, options) in node.hooks.after_update.snapshot() {
                        if !options.accepts(context) {
                            continue;
                        }
                        futures.push(self.guard(
                            async move { hook(context).await },
                            route,
                            HookPhase::AfterUpdate,
                        ));
                    }
                    if let Some(service) = service {
                        futures.push(self.guard(
                            async move {
                                match service.await {
                                    Some(service) => service.after_update(context).await,
                                    None => Ok(()),
                                }
                            },
                            route,
                            HookPhase::AfterUpdate,
                        ));
                    }
                }
                TransitionKind::Leave => {
                    for hook in node.hooks.after_leave.snapshot() {
                        futures.push(self.guard(
                            async move { hook().await },
                            route,
                            HookPhase::AfterLeave,
                        ));
                    }
                    if let Some(service) = service {
                        futures.push(self.guard(
                            async move {
                                match service.await {
                                    Some(service) => service.after_leave().await,
                                    None => Ok(()),
                                }
                            },
                            route,
                            HookPhase::AfterLeave,
                        ));
                    }
                }
                TransitionKind::None => {}
            }
        }

        futures
    }
}
