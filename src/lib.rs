//! # weld-di
//!
//! A lifetime-aware dependency injection engine with synchronous and
//! asynchronous activation paths.
//!
//! Services are registered against a [`ContainerBuilder`] under one of four
//! [`Lifetime`]s, then resolved from the built [`Container`] or from an
//! [`ActivationScope`] representing one unit of work. Resolution is
//! recursive: a factory receives the scope and pulls its own dependencies
//! from it, and the engine guards the whole walk against cycles and
//! unbounded depth with typed errors rather than panics.
//!
//! ## Quick start
//!
//! ```rust
//! use weld_di::ContainerBuilder;
//!
//! #[derive(Clone)]
//! struct Config { url: String }
//! struct Database { config: std::sync::Arc<Config> }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.add_instance(Config { url: "postgres://localhost".into() })?;
//! builder.add_singleton_factory::<Database, _>(|scope| {
//!     Ok(Database { config: scope.get::<Config>()? })
//! })?;
//! let container = builder.build();
//!
//! let db = container.resolve::<Database>()?;
//! assert_eq!(db.config.url, "postgres://localhost");
//! # Ok::<(), weld_di::DiError>(())
//! ```
//!
//! ## Scopes
//!
//! Scoped services yield one instance per [`ActivationScope`]:
//!
//! ```rust
//! use weld_di::ContainerBuilder;
//!
//! struct Session { id: u64 }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.add_scoped_factory::<Session, _>(|_| Ok(Session { id: 7 }))?;
//! let container = builder.build();
//!
//! let scope = container.create_scope();
//! let a = scope.get::<Session>()?;
//! let b = scope.get::<Session>()?;
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//!
//! // A fresh scope gets a fresh instance.
//! let other = container.create_scope();
//! let c = other.get::<Session>()?;
//! assert!(!std::sync::Arc::ptr_eq(&a, &c));
//! # Ok::<(), weld_di::DiError>(())
//! ```
//!
//! ## Async factories
//!
//! Factories that must await (handshakes, warm-up) are registered through
//! the async entry points and resolved with [`Container::aresolve`].
//! Requesting such a service from a synchronous path fails with
//! [`DiError::AsyncContextRequired`] instead of blocking.
//!
//! ```rust
//! use weld_di::{ContainerBuilder, DiResult};
//!
//! struct Pool { size: usize }
//!
//! # fn main() -> DiResult<()> {
//! let mut builder = ContainerBuilder::new();
//! builder.add_singleton_async::<Pool, _>(|| async { Ok(Pool { size: 4 }) })?;
//! let container = builder.build();
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let pool = rt.block_on(container.aresolve::<Pool>())?;
//! assert_eq!(pool.size, 4);
//! assert!(container.resolve::<Pool>().is_err());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod container;
mod descriptors;
mod error;
mod internal;
mod key;
mod lifetime;
mod provider;
mod registry;

pub use container::{Container, ContainerBuilder};
pub use descriptors::{FactoryArity, FactoryDescriptor, ParamShape, Parameter, Signature};
pub use error::{DiError, DiResult};
pub use key::{ServiceKey, ServiceType};
pub use lifetime::Lifetime;
pub use provider::{ActivationScope, AsyncAssembler, AsyncFactory, Factory, Provider, ResolvedArgs};
