//! Message manager: state, events and the actor handle.

pub mod actor;
pub mod events;
pub mod state;

pub use actor::{ManagerCommand, ManagerEvents, ManagerHandle};
pub use events::{EventEmitter, EventReceiver, EventSender, ManagerEvent};
pub use state::MessageManager;
