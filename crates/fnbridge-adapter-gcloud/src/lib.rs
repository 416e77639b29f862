//! Adapter for hosting the application handler on the cloud functions
//! platform. One `dispatch` per inbound invocation; the platform's own
//! error handling picks up anything that propagates out.

mod request;

pub use request::{adapt_request, dispatch, function_target};
