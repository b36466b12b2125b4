//! Per-method route trie
//!
//! One trie per HTTP method. Each node keys literal children by segment
//! value and holds at most one wildcard child in a dedicated slot.
//! Build-time insertion walks/creates nodes segment by segment; per-request
//! resolution walks the same way, capturing wildcard parameters as it goes.

use std::collections::HashMap;

use thiserror::Error;

use crate::segment::{segment, PathSegment, PathSegments, SegmentKind};

/// The statically supported HTTP method set.
pub const SUPPORTED_METHODS: [&str; 9] = [
    "GET", "POST", "PUT", "PATCH", "HEAD", "OPTIONS", "DELETE", "CONNECT", "TRACE",
];

/// Registration-time configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InsertError {
    #[error("path must begin with '/': {0:?}")]
    PathNotAbsolute(String),

    #[error("HTTP method can not be empty")]
    EmptyMethod,

    #[error("method {0} not matching supported methods {SUPPORTED_METHODS:?}")]
    UnsupportedMethod(String),

    #[error("multiple wildcard markers found in path segment: {0}")]
    AmbiguousWildcard(String),

    #[error("got wildcard {new}, but another wildcard was already in place: {existing}")]
    WildcardConflict { existing: String, new: String },
}

/// Outcome of resolving a concrete request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// A terminal node with a value was reached. `params` holds the captured
    /// wildcard parameters as (name, literal request text) pairs, in walk
    /// order.
    Found {
        value: T,
        params: Vec<(String, String)>,
    },
    /// No route registered for this method and path.
    NotFound,
    /// The request path failed segmentation (ambiguous wildcard markers).
    MalformedPath,
}

#[derive(Debug)]
struct Node<T> {
    segment: PathSegment,
    /// Literal children, keyed by segment value.
    children: HashMap<String, Node<T>>,
    /// At most one wildcard (`:name` or `*name`) child per node. A dedicated
    /// slot rather than a reserved map key: request segments can carry any
    /// literal text, including `*` and `:`, without reaching this node
    /// through the literal lookup.
    wildcard: Option<Box<Node<T>>>,
    value: Option<T>,
}

impl<T> Node<T> {
    fn new(segment: PathSegment) -> Self {
        Self {
            segment,
            children: HashMap::new(),
            wildcard: None,
            value: None,
        }
    }
}

/// Per-method route trie.
///
/// Pure data structure: `insert` takes `&mut self`, `resolve` takes `&self`.
/// The serving layer wraps the whole tree in a single reader/writer lock,
/// trading node-level concurrency for simplicity (registration is expected
/// to finish before serving begins).
#[derive(Debug)]
pub struct RouteTree<T> {
    trees: HashMap<&'static str, Node<T>>,
}

impl<T: Clone> RouteTree<T> {
    /// Create a tree with an empty root node per supported method.
    ///
    /// A root with no value means the method's `/` route is not active.
    pub fn new() -> Self {
        let mut trees = HashMap::with_capacity(SUPPORTED_METHODS.len());
        for method in SUPPORTED_METHODS {
            trees.insert(
                method,
                Node::new(PathSegment::new("/", SegmentKind::Root)),
            );
        }
        Self { trees }
    }

    pub fn supported_methods(&self) -> &'static [&'static str] {
        &SUPPORTED_METHODS
    }

    /// Register `value` under `method` and `absolute_path`.
    ///
    /// Re-registering a path overwrites the previous value (last
    /// registration wins). Registering a wildcard where a differently-named
    /// wildcard already exists at the same depth is an error.
    pub fn insert(&mut self, method: &str, absolute_path: &str, value: T) -> Result<(), InsertError> {
        if !absolute_path.starts_with('/') {
            return Err(InsertError::PathNotAbsolute(absolute_path.to_string()));
        }
        if method.is_empty() {
            return Err(InsertError::EmptyMethod);
        }
        let root = self
            .trees
            .get_mut(method)
            .ok_or_else(|| InsertError::UnsupportedMethod(method.to_string()))?;

        let (segments, valid) = segment(absolute_path);
        if !valid {
            return Err(InsertError::AmbiguousWildcard(absolute_path.to_string()));
        }
        // a bare "/" attaches directly to the method root
        if segments.len() == 1 {
            root.value = Some(value);
            return Ok(());
        }
        Self::insert_at(root, 1, &segments, value)
    }

    fn insert_at(
        node: &mut Node<T>,
        idx: usize,
        segments: &PathSegments,
        value: T,
    ) -> Result<(), InsertError> {
        let seg = &segments[idx];
        let wildcard = matches!(seg.kind, SegmentKind::Param | SegmentKind::CatchAll);

        let child = if wildcard {
            if let Some(existing) = &node.wildcard {
                if existing.segment.value != seg.value {
                    return Err(InsertError::WildcardConflict {
                        existing: existing.segment.value.clone(),
                        new: seg.value.clone(),
                    });
                }
            }
            &mut **node
                .wildcard
                .get_or_insert_with(|| Box::new(Node::new(seg.clone())))
        } else {
            node.children
                .entry(seg.value.clone())
                .or_insert_with(|| Node::new(seg.clone()))
        };

        if idx == segments.len() - 1 {
            child.value = Some(value);
            return Ok(());
        }
        Self::insert_at(child, idx + 1, segments, value)
    }

    /// Resolve a concrete request path.
    ///
    /// At each depth the literal child is tried first, then the wildcard
    /// slot; using the wildcard records the parameter under the wildcard's
    /// name with the request's literal segment text as value. A catch-all
    /// consumes exactly one segment, like a parameter.
    pub fn resolve(&self, method: &str, path: &str) -> Resolution<T> {
        if !path.starts_with('/') {
            return Resolution::MalformedPath;
        }
        let (segments, valid) = segment(path);
        if !valid {
            return Resolution::MalformedPath;
        }
        let Some(root) = self.trees.get(method) else {
            return Resolution::NotFound;
        };
        if segments.len() == 1 {
            return match &root.value {
                Some(value) => Resolution::Found {
                    value: value.clone(),
                    params: Vec::new(),
                },
                None => Resolution::NotFound,
            };
        }
        let mut params = Vec::new();
        Self::resolve_at(root, 1, &segments, &mut params)
    }

    fn resolve_at(
        node: &Node<T>,
        idx: usize,
        segments: &PathSegments,
        params: &mut Vec<(String, String)>,
    ) -> Resolution<T> {
        let seg = &segments[idx];
        let child = match node.children.get(seg.value.as_str()) {
            Some(child) => child,
            None => match &node.wildcard {
                Some(child) => {
                    params.push((
                        child.segment.wildcard_name().to_string(),
                        seg.value.clone(),
                    ));
                    &**child
                }
                None => return Resolution::NotFound,
            },
        };

        if idx == segments.len() - 1 {
            return match &child.value {
                Some(value) => Resolution::Found {
                    value: value.clone(),
                    params: std::mem::take(params),
                },
                None => Resolution::NotFound,
            };
        }
        Self::resolve_at(child, idx + 1, segments, params)
    }
}

impl<T: Clone> Default for RouteTree<T> {
    fn default() -> Self {
        Self::new()
    }
}
