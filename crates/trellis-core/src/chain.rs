//! Handler chain composition
//!
//! A chain is an immutable-append ordered sequence of handlers. Chains only
//! grow, and only by pure combination: combining two chains produces a third
//! and never mutates either input. The combined size is capped so the
//! context's execution cursor always stays in a known range.

use std::sync::Arc;

use crate::context::Context;

/// A unit of work in a handler chain.
///
/// Handlers run synchronously on the request's task and may mutate the
/// context, including aborting the remaining chain.
pub type Handler = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// Maximum number of handlers in one resolved chain.
///
/// Exceeding it is a configuration defect and panics at registration time
/// rather than silently truncating handlers.
pub const MAX_HANDLERS: usize = 127;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Ordered, append-only sequence of handlers.
#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<Handler>,
}

impl HandlerChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a chain from handlers, preserving order.
    pub fn of<I>(handlers: I) -> Self
    where
        I: IntoIterator<Item = Handler>,
    {
        let handlers: Vec<Handler> = handlers.into_iter().collect();
        assert!(
            handlers.len() <= MAX_HANDLERS,
            "too many handlers: {} exceeds the maximum of {MAX_HANDLERS}",
            handlers.len(),
        );
        Self { handlers }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Handler> {
        self.handlers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Handler> {
        self.handlers.iter()
    }

    /// Combine `self` followed by `other` into a new chain.
    ///
    /// Pure and order-preserving; neither input is mutated. Panics when the
    /// combined size exceeds [`MAX_HANDLERS`].
    pub fn combine(&self, other: &HandlerChain) -> HandlerChain {
        let total = self.len() + other.len();
        assert!(
            total <= MAX_HANDLERS,
            "too many handlers: {total} exceeds the maximum of {MAX_HANDLERS}",
        );
        let mut handlers = Vec::with_capacity(total);
        handlers.extend(self.handlers.iter().cloned());
        handlers.extend(other.handlers.iter().cloned());
        Self { handlers }
    }
}

impl std::fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerChain")
            .field("len", &self.len())
            .finish()
    }
}

/// Conversion into a [`HandlerChain`] at registration call sites.
///
/// Lets registration accept a bare closure, an existing chain, a handler, a
/// vector of handlers, or a tuple of closures (middleware followed by the
/// terminal handler).
pub trait IntoHandlerChain {
    fn into_chain(self) -> HandlerChain;
}

impl IntoHandlerChain for HandlerChain {
    fn into_chain(self) -> HandlerChain {
        self
    }
}

impl IntoHandlerChain for Handler {
    fn into_chain(self) -> HandlerChain {
        HandlerChain::of([self])
    }
}

impl IntoHandlerChain for Vec<Handler> {
    fn into_chain(self) -> HandlerChain {
        HandlerChain::of(self)
    }
}

impl<F> IntoHandlerChain for F
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    fn into_chain(self) -> HandlerChain {
        HandlerChain::of([handler(self)])
    }
}

macro_rules! impl_into_handler_chain_for_tuple {
    ($($f:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($f),+> IntoHandlerChain for ($($f,)+)
        where
            $($f: Fn(&mut Context) + Send + Sync + 'static,)+
        {
            fn into_chain(self) -> HandlerChain {
                let ($($f,)+) = self;
                HandlerChain::of([$(handler($f)),+])
            }
        }
    };
}

impl_into_handler_chain_for_tuple!(F1);
impl_into_handler_chain_for_tuple!(F1, F2);
impl_into_handler_chain_for_tuple!(F1, F2, F3);
impl_into_handler_chain_for_tuple!(F1, F2, F3, F4);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn tagged(log: Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Handler {
        handler(move |_ctx| log.lock().push(tag))
    }

    fn run_all(chain: &HandlerChain, ctx: &mut Context) {
        for h in chain.iter() {
            (**h)(ctx);
        }
    }

    #[test]
    fn test_combine_order_and_size() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = HandlerChain::of([tagged(log.clone(), "h1"), tagged(log.clone(), "h2")]);
        let b = HandlerChain::of([tagged(log.clone(), "h3")]);

        let combined = a.combine(&b);
        assert_eq!(combined.len(), 3);
        // inputs are untouched
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);

        let mut ctx = Context::new();
        run_all(&combined, &mut ctx);
        assert_eq!(*log.lock(), vec!["h1", "h2", "h3"]);
    }

    #[test]
    fn test_combine_with_empty() {
        let a = HandlerChain::new();
        let b = HandlerChain::of([handler(|_| {})]);
        assert_eq!(a.combine(&b).len(), 1);
        assert_eq!(b.combine(&a).len(), 1);
    }

    #[test]
    #[should_panic(expected = "too many handlers")]
    fn test_combine_past_cap_panics() {
        let a = HandlerChain::of((0..MAX_HANDLERS).map(|_| handler(|_| {})));
        let b = HandlerChain::of([handler(|_| {})]);
        let _ = a.combine(&b);
    }

    #[test]
    fn test_into_handler_chain() {
        assert_eq!((|_: &mut Context| {}).into_chain().len(), 1);
        assert_eq!(handler(|_| {}).into_chain().len(), 1);
        assert_eq!(vec![handler(|_| {}), handler(|_| {})].into_chain().len(), 2);
        assert_eq!(
            (|_: &mut Context| {}, |_: &mut Context| {}, |_: &mut Context| {})
                .into_chain()
                .len(),
            3
        );
    }
}
