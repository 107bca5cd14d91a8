//! Domain records: orders, notifications and the events that describe their changes.

pub mod event;
pub mod notification;
pub mod order;

pub use event::*;
pub use notification::*;
pub use order::*;
