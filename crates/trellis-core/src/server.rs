//! Server driver
//!
//! Owns the shared route tree, the root router and the context pool, and
//! turns each inbound hyper request into a populated context: acquire from
//! the pool, resolve against the tree, run the handler chain, translate the
//! staged response onto the transport, release the context.
//!
//! Request-time outcomes (route miss, unknown method, malformed path,
//! render failure) never abort the process; they become a status/body pair
//! on the same request's response.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::RwLock;
use percent_encoding::percent_decode_str;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;
use trellis_router::{Resolution, RouteTree};

use crate::context::{Context, ContextPool, ContextSeed};
use crate::error::{Error, Result};
use crate::response::{Response, StatusCode};
use crate::router::{Router, SharedRouteTree};

/// Fixed body for unresolved routes and unresolved HTTP methods.
const NOT_FOUND_BODY: &str = "404 page not found";
/// Fixed body for request paths that fail segmentation.
const BAD_REQUEST_BODY: &str = "400 bad request";

/// HTTP server around one route tree, one router and a context pool.
///
/// The tree sits behind a single reader/writer lock at the root: every
/// request takes a read lock for resolution, registration takes the write
/// lock. Registration is expected to finish before serving begins; when the
/// two race, a lookup may observe a partially built subtree.
pub struct Server {
    routes: SharedRouteTree,
    router: Router,
    pool: ContextPool,

    /// Prefer the undecoded request path for route matching.
    pub use_raw_path: bool,
    /// Percent-decode captured parameter values. Effective only together
    /// with `use_raw_path`; the decoded path is already unescaped.
    pub unescape_path_values: bool,
}

impl Server {
    pub fn new() -> Self {
        let routes: SharedRouteTree = Arc::new(RwLock::new(RouteTree::new()));
        let router = Router::new(routes.clone());
        Self {
            routes,
            router,
            pool: ContextPool::new(),
            use_raw_path: false,
            unescape_path_values: false,
        }
    }

    /// The root router for route registration.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Append middleware to the root router.
    pub fn use_middleware(&self, middleware: impl crate::chain::IntoHandlerChain) -> &Router {
        self.router.use_middleware(middleware)
    }

    /// Resolve the context's request against the route tree and execute the
    /// handler chain.
    ///
    /// A match installs the chain and the captured parameters on the
    /// context, then runs the chain to completion or abort. A miss stages
    /// the fixed 404 response, a malformed path the fixed 400 response.
    pub fn handle(&self, ctx: &mut Context) {
        let resolution = self.routes.read().resolve(ctx.method(), ctx.url_path());
        match resolution {
            Resolution::Found { value: chain, params } => {
                // an empty chain is indistinguishable from a missing route
                if chain.is_empty() {
                    serve_error(ctx, StatusCode::NOT_FOUND, NOT_FOUND_BODY);
                    return;
                }
                for (name, captured) in params {
                    let captured = if ctx.unescape_values() {
                        percent_decode_str(&captured)
                            .decode_utf8()
                            .map(|cow| cow.into_owned())
                            .unwrap_or_else(|_| captured.clone())
                    } else {
                        captured
                    };
                    ctx.params_mut().insert(name, captured);
                }
                ctx.set_handlers(chain);
                ctx.next();
            }
            Resolution::NotFound => serve_error(ctx, StatusCode::NOT_FOUND, NOT_FOUND_BODY),
            Resolution::MalformedPath => {
                serve_error(ctx, StatusCode::BAD_REQUEST, BAD_REQUEST_BODY)
            }
        }
    }

    /// Serve one hyper request through a pooled context.
    fn serve_request(
        &self,
        req: hyper::Request<Incoming>,
        peer: SocketAddr,
    ) -> hyper::Response<Full<Bytes>> {
        let raw_path = req.uri().path();
        let decoded_path = percent_decode_str(raw_path)
            .decode_utf8()
            .map(|cow| cow.into_owned())
            .unwrap_or_else(|_| raw_path.to_string());
        let undecoded = (decoded_path != raw_path).then(|| raw_path.to_string());

        let mut ctx = self.pool.acquire();
        ctx.init(ContextSeed {
            method: req.method().as_str().to_string(),
            path: decoded_path,
            raw_path: undecoded,
            raw_query: req.uri().query().map(str::to_string),
            remote_addr: Some(peer),
            use_raw_path: self.use_raw_path,
            unescape_path_values: self.unescape_path_values,
        });

        self.handle(&mut ctx);

        let response = ctx.take_response();
        self.pool.release(ctx);
        to_hyper_response(response)
    }

    /// Bind `address` and serve HTTP/1.1 connections until the task is
    /// dropped. One spawned task per connection.
    pub async fn run(self, address: &str) -> Result<()> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|err| Error::InvalidAddress(format!("{address}: {err}")))?;

        let socket = create_listener_socket(&addr)?;
        let std_listener: std::net::TcpListener = socket.into();
        std_listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(std_listener)?;
        tracing::info!(address = %addr, "listening");

        let server = Arc::new(self);
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(err) => {
                    tracing::debug!(error = %err, "accept error");
                    continue;
                }
            };

            let server = server.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { Ok::<_, Infallible>(server.serve_request(req, peer)) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    // normal connection closes are not worth reporting
                    if !err.to_string().contains("connection closed") {
                        tracing::debug!(error = %err, "connection error");
                    }
                }
            });
        }
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

fn serve_error(ctx: &mut Context, status: StatusCode, body: &str) {
    ctx.string(status, body);
}

/// Create a TCP listener socket with the usual serving options.
fn create_listener_socket(addr: &SocketAddr) -> std::io::Result<Socket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // allow binding to an address in TIME_WAIT
    socket.set_reuse_address(true)?;

    // disable Nagle's algorithm for lower latency
    socket.set_nodelay(true)?;

    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;

    Ok(socket)
}

/// Translate the staged response onto the transport.
fn to_hyper_response(res: Response) -> hyper::Response<Full<Bytes>> {
    let mut builder = hyper::Response::builder().status(res.status.as_u16());
    for (name, value) in res.headers() {
        builder = builder.header(name, value);
    }
    builder.body(Full::new(res.body)).unwrap_or_else(|_| {
        let mut fallback =
            hyper::Response::new(Full::new(Bytes::from_static(b"internal server error")));
        *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::StatusCode;
    use parking_lot::Mutex;

    fn request_ctx(server: &Server, method: &str, path: &str) -> Context {
        let mut ctx = Context::new();
        ctx.init(ContextSeed {
            method: method.to_string(),
            path: path.to_string(),
            use_raw_path: server.use_raw_path,
            unescape_path_values: server.unescape_path_values,
            ..ContextSeed::default()
        });
        ctx
    }

    #[test]
    fn test_not_found() {
        let server = Server::new();
        let mut ctx = request_ctx(&server, "GET", "/nope");
        server.handle(&mut ctx);
        assert_eq!(ctx.response().status, StatusCode::NOT_FOUND);
        assert_eq!(&ctx.response().body[..], NOT_FOUND_BODY.as_bytes());
    }

    #[test]
    fn test_unknown_method_is_not_found() {
        let server = Server::new();
        server.router().get("/ping", |c: &mut Context| {
            c.string(StatusCode::OK, "pong");
        });
        let mut ctx = request_ctx(&server, "FETCH", "/ping");
        server.handle(&mut ctx);
        assert_eq!(ctx.response().status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_malformed_path_is_bad_request() {
        let server = Server::new();
        let mut ctx = request_ctx(&server, "GET", "/a/:x:y");
        server.handle(&mut ctx);
        assert_eq!(ctx.response().status, StatusCode::BAD_REQUEST);
        assert_eq!(&ctx.response().body[..], BAD_REQUEST_BODY.as_bytes());
    }

    #[test]
    fn test_param_route_dispatch() {
        let server = Server::new();
        server.router().get("/user/:name", |c: &mut Context| {
            let name = c.param("name").unwrap_or_default().to_string();
            c.json(StatusCode::OK, &serde_json::json!({ "user": name }));
        });

        let mut ctx = request_ctx(&server, "GET", "/user/alice");
        server.handle(&mut ctx);
        assert_eq!(ctx.response().status, StatusCode::OK);
        assert_eq!(&ctx.response().body[..], br#"{"user":"alice"}"#);

        // no deeper route registered
        let mut ctx = request_ctx(&server, "GET", "/user/alice/x");
        server.handle(&mut ctx);
        assert_eq!(ctx.response().status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_root_route_dispatch() {
        let server = Server::new();
        server.router().get("/", |c: &mut Context| {
            c.string(StatusCode::OK, "home");
        });
        let mut ctx = request_ctx(&server, "GET", "/");
        server.handle(&mut ctx);
        assert_eq!(&ctx.response().body[..], b"home");
    }

    #[test]
    fn test_unescape_path_values() {
        let mut server = Server::new();
        server.use_raw_path = true;
        server.unescape_path_values = true;
        server.router().get("/user/:name", |c: &mut Context| {
            let name = c.param("name").unwrap_or_default().to_string();
            c.string(StatusCode::OK, name);
        });

        let mut ctx = Context::new();
        ctx.init(ContextSeed {
            method: "GET".to_string(),
            path: "/user/a b".to_string(),
            raw_path: Some("/user/a%20b".to_string()),
            use_raw_path: true,
            unescape_path_values: true,
            ..ContextSeed::default()
        });
        server.handle(&mut ctx);
        assert_eq!(&ctx.response().body[..], b"a b");
    }

    #[test]
    fn test_middleware_abort_short_circuits_dispatch() {
        let server = Server::new();
        let reached = Arc::new(Mutex::new(false));
        let r = reached.clone();
        server.router().get(
            "/secret",
            (
                |c: &mut Context| c.abort_with_status(StatusCode::UNAUTHORIZED),
                move |_: &mut Context| *r.lock() = true,
            ),
        );

        let mut ctx = request_ctx(&server, "GET", "/secret");
        server.handle(&mut ctx);
        assert_eq!(ctx.response().status, StatusCode::UNAUTHORIZED);
        assert!(!*reached.lock());
    }

    #[test]
    fn test_concurrent_lookups_match_sequential() {
        let server = Arc::new(Server::new());
        server.router().get("/user/:name", |c: &mut Context| {
            let name = c.param("name").unwrap_or_default().to_string();
            c.string(StatusCode::OK, name);
        });
        server.router().get("/ping", |c: &mut Context| {
            c.string(StatusCode::OK, "pong");
        });

        let mut threads = Vec::new();
        for t in 0..8 {
            let server = server.clone();
            threads.push(std::thread::spawn(move || {
                for i in 0..200 {
                    let name = format!("u{t}-{i}");
                    let mut ctx = Context::new();
                    ctx.init(ContextSeed {
                        method: "GET".to_string(),
                        path: format!("/user/{name}"),
                        ..ContextSeed::default()
                    });
                    server.handle(&mut ctx);
                    assert_eq!(ctx.response().status, StatusCode::OK);
                    assert_eq!(&ctx.response().body[..], name.as_bytes());
                    assert_eq!(ctx.params().len(), 1);

                    let mut ctx = Context::new();
                    ctx.init(ContextSeed {
                        method: "GET".to_string(),
                        path: "/ping".to_string(),
                        ..ContextSeed::default()
                    });
                    server.handle(&mut ctx);
                    assert_eq!(&ctx.response().body[..], b"pong");
                    assert!(ctx.params().is_empty());
                }
            }));
        }
        for thread in threads {
            thread.join().unwrap();
        }
    }
}
