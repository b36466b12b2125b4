//! Per-request execution context
//!
//! The context threads state through handler execution: the parsed request
//! view, the captured parameters, the resolved handler chain, the execution
//! cursor and the staged response. Contexts are pooled; checkout fully
//! resets them so no parameter, chain or response state leaks between
//! requests.

use std::net::{IpAddr, SocketAddr};

use parking_lot::Mutex;
use serde::Serialize;

use crate::chain::HandlerChain;
use crate::error::Error;
use crate::params::ParamMap;
use crate::render::{Json, Render, Text};
use crate::response::{Response, StatusCode};

/// Execution cursor over the handler chain.
///
/// A tagged state instead of an out-of-range sentinel index: aborting is a
/// distinct state, not a magic number, so it does not lean on the
/// handler-count cap for safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Next handler to invoke.
    Running(usize),
    /// Remaining handlers are skipped.
    Aborted,
}

/// Per-request view handed in by the transport at context initialization.
#[derive(Debug, Clone, Default)]
pub struct ContextSeed {
    pub method: String,
    /// Decoded URL path.
    pub path: String,
    /// Undecoded path, when it differs from the decoded one.
    pub raw_path: Option<String>,
    /// Query string without the leading `?`.
    pub raw_query: Option<String>,
    pub remote_addr: Option<SocketAddr>,
    /// Prefer the undecoded path for route matching.
    pub use_raw_path: bool,
    /// Percent-decode captured parameter values. Only effective together
    /// with `use_raw_path`; the decoded path is implicitly unescaped.
    pub unescape_path_values: bool,
}

/// Per-request mutable record threading state through the handler chain.
pub struct Context {
    // bound at init
    method: String,
    request_path: String,
    raw_path: Option<String>,
    raw_query: Option<String>,
    remote_addr: Option<SocketAddr>,
    // effective path for route matching, derived from the raw-path flags
    url_path: String,
    unescape: bool,

    // updated during processing
    params: ParamMap,
    handlers: HandlerChain,
    cursor: Cursor,
    response: Response,
    errors: Vec<Error>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            method: String::new(),
            request_path: String::new(),
            raw_path: None,
            raw_query: None,
            remote_addr: None,
            url_path: String::new(),
            unescape: false,
            params: ParamMap::new(),
            handlers: HandlerChain::new(),
            cursor: Cursor::Running(0),
            response: Response::new(),
            errors: Vec::new(),
        }
    }

    /// Clear all per-request state.
    fn reset(&mut self) {
        self.method.clear();
        self.request_path.clear();
        self.raw_path = None;
        self.raw_query = None;
        self.remote_addr = None;
        self.url_path.clear();
        self.unescape = false;
        self.params.clear();
        self.handlers = HandlerChain::new();
        self.cursor = Cursor::Running(0);
        self.response.reset();
        self.errors.clear();
    }

    /// Bind a request to this context, resetting all prior state.
    pub fn init(&mut self, seed: ContextSeed) {
        self.reset();
        self.url_path = seed.path.clone();
        if seed.use_raw_path {
            if let Some(raw) = &seed.raw_path {
                if !raw.is_empty() {
                    self.url_path = raw.clone();
                    self.unescape = seed.unescape_path_values;
                }
            }
        }
        self.method = seed.method;
        self.request_path = seed.path;
        self.raw_path = seed.raw_path;
        self.raw_query = seed.raw_query;
        self.remote_addr = seed.remote_addr;
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// The decoded request path, as received from the transport.
    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    pub fn raw_request_path(&self) -> Option<&str> {
        self.raw_path.as_deref()
    }

    /// The effective path used for route matching.
    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    /// Whether captured parameter values still need percent-decoding.
    pub fn unescape_values(&self) -> bool {
        self.unescape
    }

    pub fn raw_query(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParamMap {
        &mut self.params
    }

    /// Captured path parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn handlers(&self) -> &HandlerChain {
        &self.handlers
    }

    pub fn set_handlers(&mut self, handlers: HandlerChain) {
        self.handlers = handlers;
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// The peer address' IP, without the port.
    pub fn remote_ip(&self) -> Option<IpAddr> {
        self.remote_addr.map(|addr| addr.ip())
    }

    /// Client IP as seen by this server.
    // TODO: honour forwarded-for headers once trusted-proxy support lands
    pub fn client_ip(&self) -> Option<IpAddr> {
        self.remote_ip()
    }

    /// Execute the pending handlers in the chain, in order.
    ///
    /// Called by the server driver to start the chain and by middleware to
    /// run the remainder inline. The cursor advances past the current
    /// handler before it is invoked, so a re-entrant `next()` resumes after
    /// it and never re-runs a handler.
    pub fn next(&mut self) {
        while let Cursor::Running(index) = self.cursor {
            if index >= self.handlers.len() {
                break;
            }
            self.cursor = Cursor::Running(index + 1);
            let Some(handler) = self.handlers.get(index).cloned() else {
                break;
            };
            (*handler)(self);
        }
    }

    /// Prevent the pending handlers from running. Does not stop the current
    /// handler; re-entrant `next()` calls become no-ops.
    pub fn abort(&mut self) {
        self.cursor = Cursor::Aborted;
    }

    /// [`Context::abort`] plus writing the given status.
    pub fn abort_with_status(&mut self, status: StatusCode) {
        self.status(status);
        self.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.cursor == Cursor::Aborted
    }

    /// Write the response status. First write wins.
    pub fn status(&mut self, status: StatusCode) {
        self.response.write_status(status);
    }

    /// Write a plain-text body with the given status.
    pub fn string(&mut self, status: StatusCode, body: impl Into<String>) {
        self.render(status, &Text(body.into()));
    }

    /// Serialize `value` as the JSON response body with the given status.
    pub fn json<T: Serialize>(&mut self, status: StatusCode, value: &T) {
        self.render(status, &Json(value));
    }

    /// Write the status and delegate body rendering to `renderer`.
    ///
    /// A render failure is recorded on the context and aborts the remaining
    /// handlers; bytes already sent are not rolled back.
    pub fn render(&mut self, status: StatusCode, renderer: &dyn Render) {
        self.status(status);
        if let Err(err) = renderer.render(&mut self.response) {
            self.errors.push(err);
            self.abort();
        }
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Move the staged response out, leaving a pristine one behind.
    pub fn take_response(&mut self) -> Response {
        std::mem::take(&mut self.response)
    }

    /// Errors recorded while rendering this request.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Explicit free-list of reusable contexts.
///
/// Checkout resets the context before handing it out; release just returns
/// it to the list. Reclamation never relies on drop glue.
#[derive(Default)]
pub struct ContextPool {
    free: Mutex<Vec<Context>>,
}

impl ContextPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop a context from the pool, or allocate one. The returned context is
    /// fully reset; callers bind a request with [`Context::init`].
    pub fn acquire(&self) -> Context {
        match self.free.lock().pop() {
            Some(mut ctx) => {
                ctx.reset();
                ctx
            }
            None => Context::new(),
        }
    }

    /// Return a context to the pool.
    pub fn release(&self, ctx: Context) {
        self.free.lock().push(ctx);
    }

    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}
