//! Internal implementation details.

pub(crate) mod chain;

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub(crate) use chain::ResolutionChain;

/// Type-erased Arc for storage.
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// Boxed future used at the async factory boundary.
pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
