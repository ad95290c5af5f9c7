//! # Route Tree
//!
//! Hierarchical route matching driven by a browser-style history, with:
//!
//! - **Nested Routes** - A declared tree of named routes, each consuming one
//!   path segment (literal, captured segment, rest of path or custom pattern)
//! - **Match State** - Per-route `matched` / `exact` / `params`, committed
//!   once per navigation
//! - **Lifecycle Hooks** - Before-enter/update/leave hooks that may veto or
//!   redirect, after-enter/update/leave hooks run once committed
//! - **Route Services** - A lazily created per-route service taking part in
//!   the lifecycle and exposing extension fields
//! - **Parallel Groups** - Extra branches matched next to the primary route,
//!   restricted by declared whitelists
//! - **References** - Generate hrefs for a route from parameters
//!
//! # Quick Start
//!
//! ```
//! use route_tree::*;
//!
//! # pollster::block_on(async {
//! let mut tree = RouteTree::build(
//!     Schema::new()
//!         .route("default", RouteSpec::literal(""))
//!         .route("account", RouteSpec::new().child("id", RouteSpec::segment())),
//! )
//! .unwrap();
//!
//! let id = tree.find("account.id").unwrap();
//! tree.intercept(
//!     id,
//!     |next| {
//!         let allowed = next.params.get("id") != Some("0");
//!         async move { Ok(allowed) }
//!     },
//!     UpdateOptions::default(),
//! )
//! .unwrap();
//!
//! let mut router = Router::new(tree, MemoryHistory::default());
//! router.start().await.unwrap();
//!
//! assert!(router.push("/account/123").await.unwrap().is_success());
//! assert!(router.push("/account/0").await.unwrap().is_blocked());
//!
//! assert_eq!(router.tree().node(id).unwrap().params().get("id"), Some("123"));
//! # });
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Uses the standard `log` crate for logging
//! - `tracing` - Uses the `tracing` crate for structured logging (mutually exclusive with `log`)

#![doc(html_root_url = "https://docs.rs/route-tree/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Core routing modules
pub mod history;
pub mod location;
pub mod matcher;
pub mod parallel;
pub mod reconcile;
pub mod route;
pub mod state;

// Error handling
pub mod error;

// Route lifecycle
pub mod coordinator;
pub mod lifecycle;
pub mod service;

// Other modules
pub mod params;

// Re-export main types for convenient access
pub use coordinator::HookCoordinator;
pub use error::{
    Diagnostics, HookErrorHandler, HookFailure, HookPhase, NavigationResult, RouteError,
};
pub use history::{History, MemoryHistory};
pub use lifecycle::{
    AfterHookFuture, BeforeHookFuture, HookHandle, HookId, HookResult, LifecycleResult,
    NextRouteMatch, UpdateContext, UpdateOptions,
};
pub use location::Location;
pub use matcher::{is_path_prefix, match_path, MatchOutcome, MatchPattern};
pub use parallel::ParallelOptions;
pub use params::{QueryParams, RouteParams};
pub use reconcile::{MatchEntry, NodeTransition, RouteSource, TransitionKind, TransitionPlan};
pub use route::{MatchState, NodeId, RouteNode, RouteSpec, RouteTree, Schema};
pub use service::{
    done, proceed, service_fn, BoxedService, FieldValue, RouteInfo, RouteService,
    ServiceFactory,
};
pub use state::Router;

/// Navigation direction indicator.
///
/// Used to tell listeners how the history moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDirection {
    /// Navigating forward to a new route
    Forward,
    /// Navigating back in history
    Back,
    /// Replacing the current route without affecting history direction
    Replace,
}

/// Event emitted when the route changes.
///
/// Contains information about the navigation that occurred, including
/// the source and destination hrefs and the direction of navigation.
#[derive(Debug, Clone)]
pub struct RouteChangeEvent {
    /// The previous href (None if this is the first navigation)
    pub from: Option<String>,
    /// The new href
    pub to: String,
    /// The direction of navigation
    pub direction: NavigationDirection,
    /// Routes whose match state changed
    pub changed: Vec<NodeId>,
}
