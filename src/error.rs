//! Error handling for the router
//!
//! Two tiers:
//!
//! - [`RouteError`] covers configuration mistakes (schema declaration,
//!   parallel group rules, duplicate services, malformed paths, missing
//!   reference parameters). These are returned as `Err` at the point of misuse.
//! - [`HookFailure`] covers errors and panics raised by user hooks while a
//!   navigation runs. Those are tolerated: reported through [`Diagnostics`]
//!   and otherwise ignored.

use crate::error_log;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Configuration errors
// ============================================================================

/// Configuration error raised synchronously by schema and navigation APIs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// A non-empty path remainder did not start with a separator
    #[error("expecting rest of path to be started with \"/\", but got {rest:?} instead")]
    MalformedPath { rest: String },

    /// Two siblings share a name
    #[error("duplicate route \"{name}\" under \"{parent}\"")]
    DuplicateRoute { parent: String, name: String },

    /// A route name is empty or contains the `.` lookup separator
    #[error("invalid route name {name:?}")]
    InvalidName { name: String },

    /// A nested route tried to join a group other than its ancestors'
    #[error("route \"{route}\" cannot join group \"{group}\", groups are declared on top-level routes")]
    InvalidGroup { route: String, group: String },

    /// A custom match pattern failed to compile
    #[error("invalid match pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A second service factory was registered on the same route
    #[error("service has already been defined for \"{route}\"")]
    DuplicateService { route: String },

    /// A parallel whitelist was declared on a grouped route
    #[error("parallel whitelist can only be set on primary routes, \"{route}\" belongs to a group")]
    ParallelOnGroupedRoute { route: String },

    /// A declared group is missing from the parent's declaration
    #[error("parallel group \"{group}\" of \"{route}\" is not a subset of its parent's groups")]
    ParallelGroupNotSubset { route: String, group: String },

    /// A declared match is outside the parent's matches and groups
    #[error("parallel match \"{target}\" of \"{route}\" is not a subset of its parent's matches")]
    ParallelMatchNotSubset { route: String, target: String },

    /// A descendant already carries a declaration from another ancestor
    #[error("parallel options of \"{route}\" can only be specified in a top-down fashion")]
    ParallelNotTopDown { route: String },

    /// A reference was generated without a required segment parameter
    #[error("parameter \"{key}\" is required")]
    MissingParam { key: String },

    /// A node id that does not belong to the tree
    #[error("unknown route node #{index}")]
    UnknownNode { index: usize },
}

// ============================================================================
// Navigation Result Types
// ============================================================================

/// Result of a navigation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationResult {
    /// Navigation committed
    Success { href: String },
    /// Navigation vetoed by a before-hook
    Blocked {
        reason: Option<String>,
        redirect: Option<String>,
    },
}

impl NavigationResult {
    /// Check if navigation was successful
    pub fn is_success(&self) -> bool {
        matches!(self, NavigationResult::Success { .. })
    }

    /// Check if navigation was blocked
    pub fn is_blocked(&self) -> bool {
        matches!(self, NavigationResult::Blocked { .. })
    }

    /// Get redirect path if blocked with redirect
    pub fn redirect_path(&self) -> Option<&str> {
        match self {
            NavigationResult::Blocked {
                redirect: Some(path),
                ..
            } => Some(path),
            _ => None,
        }
    }
}

// ============================================================================
// Hook failures
// ============================================================================

/// The hook slot a tolerated failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    BeforeEnter,
    BeforeUpdate,
    BeforeLeave,
    AfterEnter,
    AfterUpdate,
    AfterLeave,
    /// The service factory itself failed
    ServiceFactory,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookPhase::BeforeEnter => "before-enter",
            HookPhase::BeforeUpdate => "before-update",
            HookPhase::BeforeLeave => "before-leave",
            HookPhase::AfterEnter => "after-enter",
            HookPhase::AfterUpdate => "after-update",
            HookPhase::AfterLeave => "after-leave",
            HookPhase::ServiceFactory => "service factory",
        };
        f.write_str(name)
    }
}

/// A hook error or panic that was caught and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    /// Dotted path of the route owning the hook
    pub route: String,
    pub phase: HookPhase,
    pub message: String,
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hook of \"{}\" failed: {}",
            self.phase, self.route, self.message
        )
    }
}

/// Handler invoked for every tolerated hook failure
pub type HookErrorHandler = Arc<dyn Fn(&HookFailure) + Send + Sync>;

/// Diagnostic sink for tolerated hook failures.
///
/// Always logs at error level; forwards to the user handler when one is set.
#[derive(Clone, Default)]
pub struct Diagnostics {
    handler: Option<HookErrorHandler>,
}

impl Diagnostics {
    /// Create a sink that only logs
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handler that receives every failure
    pub fn on_failure<F>(mut self, handler: F) -> Self
    where
        F: Fn(&HookFailure) + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Report a tolerated failure
    pub fn report(&self, failure: &HookFailure) {
        error_log!("{}", failure);
        if let Some(handler) = &self.handler {
            handler(failure);
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_navigation_result_success() {
        let result = NavigationResult::Success {
            href: "/home".to_string(),
        };
        assert!(result.is_success());
        assert!(!result.is_blocked());
        assert_eq!(result.redirect_path(), None);
    }

    #[test]
    fn test_navigation_result_blocked_with_redirect() {
        let result = NavigationResult::Blocked {
            reason: None,
            redirect: Some("/login".to_string()),
        };
        assert!(result.is_blocked());
        assert_eq!(result.redirect_path(), Some("/login"));
    }

    #[test]
    fn test_route_error_display() {
        let error = RouteError::MissingParam {
            key: "id".to_string(),
        };
        assert_eq!(error.to_string(), "parameter \"id\" is required");

        let error = RouteError::MalformedPath {
            rest: "account".to_string(),
        };
        assert!(error.to_string().contains("\"account\""));
    }

    #[test]
    fn test_hook_failure_display() {
        let failure = HookFailure {
            route: "account.id".to_string(),
            phase: HookPhase::BeforeEnter,
            message: "boom".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "before-enter hook of \"account.id\" failed: boom"
        );
    }

    #[test]
    fn test_diagnostics_forwards_to_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            Diagnostics::new().on_failure(move |failure| {
                seen.lock().unwrap().push(failure.phase);
            })
        };

        sink.report(&HookFailure {
            route: "about".to_string(),
            phase: HookPhase::AfterLeave,
            message: "oops".to_string(),
        });

        assert_eq!(*seen.lock().unwrap(), vec![HookPhase::AfterLeave]);
    }
}
