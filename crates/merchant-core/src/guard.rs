//! Navigation guard: gates every route transition on session evidence.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    route::{HOME_PATH, LOGIN_PATH, Resolution, RouteDescriptor, RouteMatch, RouteTable},
    session::SessionStore,
};

/// Upper bound on redirects followed by one navigation.
pub const MAX_REDIRECT_HOPS: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    RedirectToLogin,
    RedirectToHome,
}

impl NavigationDecision {
    pub fn redirect_target(self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::RedirectToLogin => Some(LOGIN_PATH),
            Self::RedirectToHome => Some(HOME_PATH),
        }
    }
}

/// Decide a single transition. First matching rule wins.
pub fn decide(requires_auth: bool, authenticated: bool, target_path: &str) -> NavigationDecision {
    if requires_auth && !authenticated {
        NavigationDecision::RedirectToLogin
    } else if authenticated && target_path == LOGIN_PATH {
        NavigationDecision::RedirectToHome
    } else {
        NavigationDecision::Allow
    }
}

/// One guard evaluation, as reported to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub authenticated: bool,
    pub requires_auth: bool,
    pub decision: NavigationDecision,
}

/// Receives every guard decision.
pub trait NavigationObserver: Send + Sync {
    fn on_decision(&self, event: &NavigationEvent<'_>);
}

/// Default observer writing one debug event per decision.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl NavigationObserver for TracingObserver {
    fn on_decision(&self, event: &NavigationEvent<'_>) {
        tracing::debug!(
            from = event.from,
            to = event.to,
            authenticated = event.authenticated,
            requires_auth = event.requires_auth,
            decision = ?event.decision,
            "route guard"
        );
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("navigation to '{0}' exceeded {MAX_REDIRECT_HOPS} redirects")]
    TooManyRedirects(String),
}

/// A completed navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub route: RouteDescriptor,
    pub path: String,
    pub params: std::collections::BTreeMap<String, String>,
    /// Paths that were redirected away from, in order.
    pub redirected_from: Vec<String>,
}

impl Navigation {
    pub fn was_redirected(&self) -> bool {
        !self.redirected_from.is_empty()
    }
}

pub struct NavigationGuard<S, O = TracingObserver> {
    routes: RouteTable,
    session: S,
    observer: O,
}

impl<S: SessionStore> NavigationGuard<S, TracingObserver> {
    pub fn new(routes: RouteTable, session: S) -> Self {
        Self::with_observer(routes, session, TracingObserver)
    }
}

impl<S: SessionStore, O: NavigationObserver> NavigationGuard<S, O> {
    pub fn with_observer(routes: RouteTable, session: S, observer: O) -> Self {
        Self {
            routes,
            session,
            observer,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Evaluate the guard for an already matched target.
    pub fn check(&self, from: &str, target: &RouteMatch<'_>) -> NavigationDecision {
        let authenticated = self.session.has_session();
        let requires_auth = target.route.requires_auth;
        let decision = decide(requires_auth, authenticated, &target.path);
        self.observer.on_decision(&NavigationEvent {
            from,
            to: &target.path,
            authenticated,
            requires_auth,
            decision,
        });
        decision
    }

    /// Resolve `to` and follow static and guard redirects until a page is
    /// allowed. Every redirect target is guarded again on its own.
    pub fn navigate(&self, from: &str, to: &str) -> Result<Navigation, NavigationError> {
        let mut current = to.to_owned();
        let mut redirected_from = Vec::new();

        for _ in 0..=MAX_REDIRECT_HOPS {
            let next = match self.routes.resolve(&current) {
                Resolution::Redirect(target) => target,
                Resolution::Page(target) => match self.check(from, &target).redirect_target() {
                    Some(redirect) => redirect.to_owned(),
                    None => {
                        return Ok(Navigation {
                            route: target.route.clone(),
                            path: target.path,
                            params: target.params,
                            redirected_from,
                        });
                    }
                },
            };
            redirected_from.push(std::mem::replace(&mut current, next));
        }

        Err(NavigationError::TooManyRedirects(to.to_owned()))
    }
}
