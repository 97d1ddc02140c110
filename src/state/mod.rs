//! Table state that outlives a single paint
//!
//! Current item and selection, the events they publish, and the persisted
//! column layout.

pub mod dispatcher;
pub mod events;
pub mod layout;
pub mod selection;
