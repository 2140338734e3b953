//! The two prompt flows. Both propagate every [`FlowError`](crate::error::FlowError)
//! to their caller; recovery happens in [`crate::actions`].

pub mod chat;
pub mod style;

pub use chat::ChatFlow;
pub use style::StyleFlow;
