//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router needs to hold handlers of *different* types in a single
//! `HashMap<Method, Tree>`. Rust collections can only hold one concrete type,
//! so we use **trait objects** (`dyn ErasedHandler`) to hide the concrete
//! handler type behind a common interface and store everything uniformly.
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn find(req: Request) -> Result<Response, RouteError> { … }
//!        ↓ router.on(Method::GET, "/find", find)
//! find.into_boxed_handler()                        ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(find))                        ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  at request time               ← one vtable dispatch
//!        ↓
//! Box::pin(async { find(req).await.into_route_result() })  ← BoxFuture
//! ```
//!
//! Handlers are fallible: whatever they return is converted to
//! `Result<Response, RouteError>` via [`IntoResponse`], and the pipeline's
//! terminal stage normalizes the `Err` arm. The only runtime cost per
//! request is **one Arc clone** (atomic inc) + **one virtual call** —
//! negligible compared to network I/O.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::RouteError;
use crate::request::Request;
use crate::response::Response;

// ── Internal types ────────────────────────────────────────────────────────────

/// What route dispatch ultimately produces: a response, or an error for
/// the normalizer.
pub type RouteResult = Result<Response, RouteError>;

/// A heap-allocated, type-erased future that resolves to a [`RouteResult`].
///
/// `Pin<Box<…>>` is required because the async runtime must be able to poll
/// the future in-place — it cannot move it in memory after the first poll.
/// `Send + 'static` let tokio move the future across threads safely.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = RouteResult> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
/// External crates cannot usefully interact with this trait.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
///
/// `#[doc(hidden)] pub` for the same reason as `ErasedHandler`.
/// `Arc` gives us cheap, thread-safe shared ownership (one atomic reference
/// count increment per request) without copying the handler.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion of a handler's return value into a [`RouteResult`].
///
/// Infallible handlers return [`Response`] directly; fallible ones return
/// `Result<Response, RouteError>` and use `?` freely.
pub trait IntoResponse {
    fn into_route_result(self) -> RouteResult;
}

impl IntoResponse for Response {
    fn into_route_result(self) -> RouteResult {
        Ok(self)
    }
}

impl IntoResponse for RouteResult {
    fn into_route_result(self) -> RouteResult {
        self
    }
}

/// Return a bare status code from a handler: `return 204`.
impl IntoResponse for u16 {
    fn into_route_result(self) -> RouteResult {
        Ok(Response::status(self))
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it. This prevents accidental misuse and
/// keeps the API surface stable across versions.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// The sealing module. Because `Sealed` is private, external crates cannot
/// name it and therefore cannot implement `Handler` on their own types.
mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

/// Implement the sealing trait for any function with the right signature.
///
/// `Fn(Request) -> Fut` covers:
///   - named `async fn` items
///   - `async` closures
///   - any struct that implements `Fn`
impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

/// Implement `Handler` for any function with the right signature.
impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        // Call the wrapped function — this returns the concrete `Fut`.
        // We then map it to `RouteResult` via `IntoResponse` and box the
        // whole thing so the return type matches the trait signature.
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_route_result() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Body, RequestContext};
    use http::{HeaderMap, Method};
    use std::collections::HashMap;

    fn test_request() -> Request {
        Request::new(
            Method::GET,
            "/test".to_owned(),
            HeaderMap::new(),
            Body::Empty,
            HashMap::new(),
            RequestContext::new("test-id".to_owned()),
        )
    }

    async fn infallible(_req: Request) -> Response {
        Response::text("ok")
    }

    async fn fallible(_req: Request) -> RouteResult {
        Err(RouteError::not_found("Resource not found"))
    }

    #[tokio::test]
    async fn infallible_handler_yields_ok() {
        let handler = infallible.into_boxed_handler();
        let result = handler.call(test_request()).await;
        assert_eq!(result.unwrap().body(), b"ok");
    }

    #[tokio::test]
    async fn fallible_handler_yields_its_error() {
        let handler = fallible.into_boxed_handler();
        let err = handler.call(test_request()).await.unwrap_err();
        assert_eq!(err.kind().status_code(), 404);
        assert_eq!(err.message(), "Resource not found");
    }

    #[tokio::test]
    async fn bare_status_code_converts_to_empty_response() {
        async fn no_content(_req: Request) -> u16 {
            204
        }
        let handler = no_content.into_boxed_handler();
        let resp = handler.call(test_request()).await.unwrap();
        assert_eq!(resp.status_code(), 204);
        assert!(resp.body().is_empty());
    }
}
