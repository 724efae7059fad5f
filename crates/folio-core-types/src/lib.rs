//! Types shared by the folio error and logging facilities
//!
//! - **Correlation**: `RequestId`, `TraceId`, `RequestContext`
//! - **Redaction**: `Sensitive<T>`
//! - **Log schema**: canonical field keys and event names

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::{RequestContext, RequestId, TraceId};
pub use sensitive::Sensitive;
