//! Observability hooks for artifact dispatch.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use pdispatch::{ArtifactDispatcher, PendingResults};
//! use pobserve::{SafeDispatchHooks, TracingDispatchHooks};
//! use pstream::{BufferedResponseSink, ResponseChannel};
//!
//! let channel = ResponseChannel::new(Arc::new(BufferedResponseSink::new()));
//! let _dispatcher = ArtifactDispatcher::builder(channel, Arc::new(PendingResults::new()))
//!     .hooks(Arc::new(SafeDispatchHooks::new(TracingDispatchHooks)))
//!     .build();
//! ```

mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsDispatchHooks;
pub use safe_hooks::{CompositeDispatchHooks, SafeDispatchHooks};
pub use tracing_hooks::TracingDispatchHooks;

pub mod prelude {
    pub use crate::{
        CompositeDispatchHooks, MetricsDispatchHooks, SafeDispatchHooks, TracingDispatchHooks,
    };
}
