//! Connection/Cursor façade (§4.6): a blocking and a cooperative variant,
//! identical in behaviour apart from scheduling (§5), both wrapping the
//! same [`crate::core::Core`].

pub mod blocking;
pub mod r#async;
