//! Exact-match URI routing.
//!
//! Request URIs are lower-cased before dispatch, so routes should be registered in
//! lower case. There are no wildcards and no path parameters, one handler per URI.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use av_http::protocol::Request;
use thiserror::Error;
use tracing::{error, info};

use crate::connection::ConnectionHandle;
use crate::registry::ConnectionRegistry;

/// Answers requests routed to it by writing a response on the connection.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: &Request, connection: &ConnectionHandle, registry: &ConnectionRegistry);
}

impl<F> RequestHandler for F
where
    F: Fn(&Request, &ConnectionHandle, &ConnectionRegistry) + Send + Sync,
{
    fn handle(&self, request: &Request, connection: &ConnectionHandle, registry: &ConnectionRegistry) {
        (self)(request, connection, registry);
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("route '{0}' is already registered")]
    Duplicate(String),

    #[error("no route matches '{0}'")]
    NotFound(String),
}

/// URI to handler mapping, read concurrently and written rarely.
#[derive(Default)]
pub struct RoutingTable {
    routes: RwLock<HashMap<String, Arc<dyn RequestHandler>>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `uri`. A URI can only be registered once.
    pub fn add(&self, uri: impl Into<String>, handler: impl RequestHandler + 'static) -> Result<(), RouteError> {
        let uri = uri.into();
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        if routes.contains_key(&uri) {
            error!(uri = %uri, "route already registered");
            return Err(RouteError::Duplicate(uri));
        }

        info!(uri = %uri, "route registered");
        routes.insert(uri, Arc::new(handler));
        Ok(())
    }

    /// Looks the request URI up and invokes its handler.
    ///
    /// The handler runs outside the lock, so it may register routes itself.
    pub fn dispatch(
        &self,
        request: &Request,
        connection: &ConnectionHandle,
        registry: &ConnectionRegistry,
    ) -> Result<(), RouteError> {
        let handler = self.routes.read().unwrap_or_else(PoisonError::into_inner).get(request.uri()).cloned();
        let Some(handler) = handler else {
            return Err(RouteError::NotFound(request.uri().to_owned()));
        };

        handler.handle(request, connection, registry);
        Ok(())
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("RoutingTable").field("routes", &routes.keys().collect::<Vec<_>>()).finish()
    }
}
