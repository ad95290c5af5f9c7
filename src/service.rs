//! Route services
//!
//! A route may register one service factory. The factory runs lazily, the
//! first time a hook of that route needs the service, and never again: its
//! (possibly pending) result is memoized and shared by every later caller.
//!
//! A service can take part in the lifecycle by overriding any of the
//! [`RouteService`] hook methods, and exposes extension fields through
//! [`RouteService::field`]. When the route is not matched, readers fall back to
//! the defaults declared in the schema.

use crate::coordinator::tolerate;
use crate::error::{Diagnostics, HookPhase};
use crate::lifecycle::{
    AfterHookFuture, BeforeHookFuture, LifecycleResult, NextRouteMatch, UpdateContext,
};
use crate::route::NodeId;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::future::Future;
use std::sync::{Arc, OnceLock};

/// Type-erased extension field value
pub type FieldValue = Arc<dyn Any + Send + Sync>;

/// Hooks and fields provided by a lazily created route service.
///
/// Every hook defaults to a no-op that raises no objection.
///
/// # Example
///
/// ```
/// use route_tree::{BeforeHookFuture, FieldValue, LifecycleResult, NextRouteMatch, RouteService};
/// use futures::FutureExt;
/// use std::sync::Arc;
///
/// struct AccountService {
///     title: String,
/// }
///
/// impl RouteService for AccountService {
///     fn before_enter(&self, next: &NextRouteMatch) -> BeforeHookFuture {
///         let allowed = next.params.get("id") != Some("0");
///         async move { Ok(LifecycleResult::from(allowed)) }.boxed()
///     }
///
///     fn field(&self, key: &str) -> Option<FieldValue> {
///         match key {
///             "title" => Some(Arc::new(self.title.clone())),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait RouteService: Send + Sync + 'static {
    fn before_enter(&self, _next: &NextRouteMatch) -> BeforeHookFuture {
        proceed()
    }

    fn before_update(&self, _next: &NextRouteMatch, _context: UpdateContext) -> BeforeHookFuture {
        proceed()
    }

    fn before_leave(&self) -> BeforeHookFuture {
        proceed()
    }

    fn after_enter(&self) -> AfterHookFuture {
        done()
    }

    fn after_update(&self, _context: UpdateContext) -> AfterHookFuture {
        done()
    }

    fn after_leave(&self) -> AfterHookFuture {
        done()
    }

    /// Extension field exposed while the route is matched
    fn field(&self, _key: &str) -> Option<FieldValue> {
        None
    }
}

/// A before-hook future that raises no objection
pub fn proceed() -> BeforeHookFuture {
    future::ready(Ok(LifecycleResult::Continue)).boxed()
}

/// An after-hook future that does nothing
pub fn done() -> AfterHookFuture {
    future::ready(Ok(())).boxed()
}

/// Shared service handle
pub type BoxedService = Arc<dyn RouteService>;

/// Future produced by a service factory
pub type ServiceFuture = BoxFuture<'static, anyhow::Result<BoxedService>>;

/// Registered factory
pub type ServiceFactory = Arc<dyn Fn(&RouteInfo) -> ServiceFuture + Send + Sync>;

/// Memoized resolution shared by every waiter; `None` when the factory failed
pub type SharedService = Shared<BoxFuture<'static, Option<BoxedService>>>;

/// Identity of the route a factory is building a service for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub id: NodeId,
    pub name: String,
    /// Dotted path, e.g. `account.id`
    pub route: String,
}

/// Wrap an async closure as a [`ServiceFactory`]
pub fn service_fn<F, Fut, S>(factory: F) -> ServiceFactory
where
    F: Fn(&RouteInfo) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<S>> + Send + 'static,
    S: RouteService,
{
    Arc::new(move |info: &RouteInfo| {
        factory(info)
            .map(|service| service.map(|service| Arc::new(service) as BoxedService))
            .boxed()
    })
}

/// Per-node service storage
#[derive(Default)]
pub(crate) struct ServiceSlot {
    factory: Option<ServiceFactory>,
    resolution: OnceLock<SharedService>,
}

impl ServiceSlot {
    /// Returns `false` when a factory is already registered
    pub(crate) fn set_factory(&mut self, factory: ServiceFactory) -> bool {
        if self.factory.is_some() {
            return false;
        }
        self.factory = Some(factory);
        true
    }

    pub(crate) fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// The shared resolution, starting it on first call.
    ///
    /// `None` when no factory was registered.
    pub(crate) fn resolve(
        &self,
        info: &RouteInfo,
        diagnostics: &Diagnostics,
    ) -> Option<SharedService> {
        let factory = self.factory.as_ref()?;

        let shared = self.resolution.get_or_init(|| {
            let factory = Arc::clone(factory);
            let info = info.clone();
            let diagnostics = diagnostics.clone();
            let route = info.route.clone();

            async move {
                tolerate(
                    async move { factory(&info).await },
                    &route,
                    HookPhase::ServiceFactory,
                    &diagnostics,
                )
                .await
            }
            .boxed()
            .shared()
        });

        Some(shared.clone())
    }

    /// The service, if its resolution already completed successfully
    pub(crate) fn resolved(&self) -> Option<BoxedService> {
        self.resolution.get()?.peek()?.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookFailure;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Titled(&'static str);

    impl RouteService for Titled {
        fn field(&self, key: &str) -> Option<FieldValue> {
            (key == "title").then(|| Arc::new(self.0) as FieldValue)
        }
    }

    fn info() -> RouteInfo {
        RouteInfo {
            id: NodeId::ROOT,
            name: "account".to_string(),
            route: "account".to_string(),
        }
    }

    fn counting_slot(calls: &Arc<AtomicUsize>) -> ServiceSlot {
        let calls = Arc::clone(calls);
        let mut slot = ServiceSlot::default();
        assert!(slot.set_factory(service_fn(move |_info| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Titled("Account")) }
        })));
        slot
    }

    #[test]
    fn test_second_factory_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut slot = counting_slot(&calls);
        assert!(!slot.set_factory(service_fn(|_| async { Ok(Titled("x")) })));
    }

    #[test]
    fn test_no_factory_resolves_to_nothing() {
        let slot = ServiceSlot::default();
        assert!(!slot.has_factory());
        assert!(slot.resolve(&info(), &Diagnostics::new()).is_none());
        assert!(slot.resolved().is_none());
    }

    #[test]
    fn test_concurrent_waiters_share_one_resolution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let slot = counting_slot(&calls);
        let diagnostics = Diagnostics::new();

        let first = slot.resolve(&info(), &diagnostics).unwrap();
        let second = slot.resolve(&info(), &diagnostics).unwrap();
        assert!(slot.resolved().is_none());

        let (a, b) = pollster::block_on(future::join(first, second));
        assert!(a.is_some() && b.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let third = pollster::block_on(slot.resolve(&info(), &diagnostics).unwrap());
        assert!(third.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let title = slot.resolved().unwrap().field("title").unwrap();
        assert_eq!(title.downcast_ref::<&str>(), Some(&"Account"));
    }

    #[test]
    fn test_failing_factory_is_tolerated_and_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(Mutex::new(Vec::<HookFailure>::new()));
        let diagnostics = {
            let failures = Arc::clone(&failures);
            Diagnostics::new().on_failure(move |f| failures.lock().unwrap().push(f.clone()))
        };

        let mut slot = ServiceSlot::default();
        {
            let calls = Arc::clone(&calls);
            slot.set_factory(service_fn(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<Titled, _>(anyhow::anyhow!("backend down")) }
            }));
        }

        assert!(pollster::block_on(slot.resolve(&info(), &diagnostics).unwrap()).is_none());
        assert!(pollster::block_on(slot.resolve(&info(), &diagnostics).unwrap()).is_none());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let failures = failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].phase, HookPhase::ServiceFactory);
        assert!(failures[0].message.contains("backend down"));
    }

    #[test]
    fn test_default_hooks_raise_no_objection() {
        let service = Titled("x");
        let next = NextRouteMatch {
            id: NodeId::ROOT,
            route: String::new(),
            matched: true,
            exact: true,
            params: Default::default(),
        };
        let result = pollster::block_on(service.before_enter(&next)).unwrap();
        assert!(result.allows_continue());
        assert!(pollster::block_on(service.after_leave()).is_ok());
    }
}
