//! # trellis-core
//!
//! HTTP serving toolkit around the `trellis-router` matcher: handler chains,
//! a pooled per-request context with cooperative abort, hierarchical route
//! registration with middleware inheritance, and a hyper-backed server
//! driver.
//!
//! ## Example
//!
//! ```no_run
//! use trellis_core::{middleware, Context, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> trellis_core::Result<()> {
//!     trellis_core::logging::init();
//!
//!     let server = Server::new();
//!     server.use_middleware(middleware::logger());
//!     server.router().get("/user/:name", |c: &mut Context| {
//!         let name = c.param("name").unwrap_or_default().to_string();
//!         c.string(StatusCode::OK, name);
//!     });
//!
//!     server.run("127.0.0.1:3000").await
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod chain;
pub mod context;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod params;
pub mod render;
pub mod response;
pub mod router;
pub mod server;

pub use chain::{handler, Handler, HandlerChain, IntoHandlerChain, MAX_HANDLERS};
pub use context::{Context, ContextPool, ContextSeed, Cursor};
pub use error::{Error, Result};
pub use params::ParamMap;
pub use render::{Data, Json, MsgPack, Render, Text};
pub use response::{Response, StatusCode};
pub use router::Router;
pub use server::Server;

pub use trellis_router::{InsertError, Resolution, RouteTree, SUPPORTED_METHODS};
