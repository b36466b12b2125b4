//! Hierarchical route registration
//!
//! Routers form a tree at registration time: nested groups with their own
//! base paths and middleware. Registering a route walks to the root twice,
//! once to accumulate inherited middleware parent-to-child and once to join
//! base paths into the absolute path, then inserts the combined chain into
//! the flat per-method route tree. The two trees stay separate structures:
//! the group hierarchy exists only while routes are being registered.
//!
//! Registration mistakes are configuration defects, so they panic at
//! startup instead of surfacing at request time.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use trellis_router::{RouteTree, SUPPORTED_METHODS};

use crate::chain::{HandlerChain, IntoHandlerChain};

/// Shared, lock-guarded route tree. One per server, written during
/// registration and read on every request.
pub(crate) type SharedRouteTree = Arc<RwLock<RouteTree<HandlerChain>>>;

struct RouterInner {
    base_path: String,
    /// This node's own middleware, grown by `use_middleware`.
    handlers: RwLock<HandlerChain>,
    parent: Option<Arc<RouterInner>>,
    children: RwLock<HashMap<String, Arc<RouterInner>>>,
    routes: SharedRouteTree,
}

/// Route-registration facade over the route tree.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    pub(crate) fn new(routes: SharedRouteTree) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                base_path: "/".to_string(),
                handlers: RwLock::new(HandlerChain::new()),
                parent: None,
                children: RwLock::new(HashMap::new()),
                routes,
            }),
        }
    }

    /// Create a child router under `relative_path` with its own middleware.
    pub fn group(&self, relative_path: &str, middleware: impl IntoHandlerChain) -> Router {
        let child = Arc::new(RouterInner {
            base_path: relative_path.to_string(),
            handlers: RwLock::new(middleware.into_chain()),
            parent: Some(self.inner.clone()),
            children: RwLock::new(HashMap::new()),
            routes: self.inner.routes.clone(),
        });
        self.inner
            .children
            .write()
            .insert(relative_path.to_string(), child.clone());
        Router { inner: child }
    }

    /// Append middleware to this router. Applies to routes registered on
    /// this node and its groups afterwards.
    pub fn use_middleware(&self, middleware: impl IntoHandlerChain) -> &Self {
        let middleware = middleware.into_chain();
        let mut handlers = self.inner.handlers.write();
        *handlers = handlers.combine(&middleware);
        self
    }

    pub fn get(&self, relative_path: &str, handlers: impl IntoHandlerChain) -> &Self {
        self.handle("GET", relative_path, handlers)
    }

    pub fn post(&self, relative_path: &str, handlers: impl IntoHandlerChain) -> &Self {
        self.handle("POST", relative_path, handlers)
    }

    pub fn put(&self, relative_path: &str, handlers: impl IntoHandlerChain) -> &Self {
        self.handle("PUT", relative_path, handlers)
    }

    pub fn patch(&self, relative_path: &str, handlers: impl IntoHandlerChain) -> &Self {
        self.handle("PATCH", relative_path, handlers)
    }

    pub fn delete(&self, relative_path: &str, handlers: impl IntoHandlerChain) -> &Self {
        self.handle("DELETE", relative_path, handlers)
    }

    pub fn options(&self, relative_path: &str, handlers: impl IntoHandlerChain) -> &Self {
        self.handle("OPTIONS", relative_path, handlers)
    }

    pub fn head(&self, relative_path: &str, handlers: impl IntoHandlerChain) -> &Self {
        self.handle("HEAD", relative_path, handlers)
    }

    /// Register the route for every supported HTTP method.
    pub fn any(&self, relative_path: &str, handlers: impl IntoHandlerChain) -> &Self {
        let chain = handlers.into_chain();
        for method in SUPPORTED_METHODS {
            self.add(method, relative_path, chain.clone());
        }
        self
    }

    /// Register a route for one HTTP method.
    pub fn handle(
        &self,
        method: &str,
        relative_path: &str,
        handlers: impl IntoHandlerChain,
    ) -> &Self {
        self.add(method, relative_path, handlers.into_chain());
        self
    }

    fn add(&self, method: &str, relative_path: &str, route_handlers: HandlerChain) {
        let absolute_path = self.absolute_path(relative_path);
        // combine panics past the handler cap
        let combined = self.inherited_chain().combine(&route_handlers);
        if combined.is_empty() {
            panic!("invalid route {method} {absolute_path}: there must be at least one handler");
        }
        if let Err(err) = self
            .inner
            .routes
            .write()
            .insert(method, &absolute_path, combined)
        {
            panic!("invalid route {method} {absolute_path}: {err}");
        }
    }

    /// Middleware inherited from the root down to this node, in
    /// parent-to-child order.
    fn inherited_chain(&self) -> HandlerChain {
        let mut lineage = Vec::new();
        let mut current = Some(self.inner.clone());
        while let Some(node) = current {
            current = node.parent.clone();
            lineage.push(node);
        }
        let mut chain = HandlerChain::new();
        for node in lineage.iter().rev() {
            chain = chain.combine(&node.handlers.read());
        }
        chain
    }

    /// Absolute path for `relative_path`, joining base paths root-to-leaf.
    fn absolute_path(&self, relative_path: &str) -> String {
        let mut path = relative_path.to_string();
        let mut current = Some(self.inner.clone());
        while let Some(node) = current {
            path = join_paths(&node.base_path, &path);
            current = node.parent.clone();
        }
        path
    }
}

/// Join two path fragments with a single separator, preserving a trailing
/// separator on the relative part.
pub(crate) fn join_paths(absolute: &str, relative: &str) -> String {
    if relative.is_empty() {
        return absolute.to_string();
    }
    let mut joined = format!(
        "{}/{}",
        absolute.trim_end_matches('/'),
        relative.trim_start_matches('/')
    );
    if relative.ends_with('/') && !joined.ends_with('/') {
        joined.push('/');
    }
    joined
}
