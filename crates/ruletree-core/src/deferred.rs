//! Ready-or-pending values.
//!
//! Leaf rules may answer immediately or hand back a future. `Deferred` turns
//! that distinction into a pattern match, so the engine only pays for async
//! when a leaf actually needed it.

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use std::fmt;
use std::future::Future;

/// A value that is either available now or will be produced by a future.
pub enum Deferred<T> {
    /// The value is available immediately.
    Ready(T),
    /// The value must be awaited.
    Pending(BoxFuture<'static, T>),
}

impl<T: Send + 'static> Deferred<T> {
    /// Wrap an immediately available value.
    pub fn ready(value: T) -> Self {
        Self::Ready(value)
    }

    /// Wrap a future whose output is the value.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self::Pending(future.boxed())
    }

    /// True when no await is needed to obtain the value.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Transform the value, staying synchronous when it is already ready.
    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        match self {
            Self::Ready(value) => Deferred::Ready(f(value)),
            Self::Pending(fut) => Deferred::Pending(fut.map(f).boxed()),
        }
    }

    /// Chain a step that may itself be deferred.
    ///
    /// When `self` is ready the step runs immediately and its own readiness
    /// decides the result; otherwise the step runs after `self` settles.
    pub fn and_then<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Deferred<U> + Send + 'static,
    {
        match self {
            Self::Ready(value) => f(value),
            Self::Pending(fut) => Deferred::pending(async move { f(fut.await).resolve().await }),
        }
    }

    /// Take the value if it is ready, otherwise hand back the future.
    pub fn now(self) -> Result<T, BoxFuture<'static, T>> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Pending(fut) => Err(fut),
        }
    }

    /// Await the value.
    pub async fn resolve(self) -> T {
        match self {
            Self::Ready(value) => value,
            Self::Pending(fut) => fut.await,
        }
    }

    /// Convert into a boxed future regardless of readiness.
    pub fn into_future(self) -> BoxFuture<'static, T> {
        match self {
            Self::Ready(value) => future::ready(value).boxed(),
            Self::Pending(fut) => fut,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}
