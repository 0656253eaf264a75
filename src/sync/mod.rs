pub mod event;
pub mod listener;
pub mod worker;

pub use event::{ChangeEvent, ChangeKind, MachineNode, SensorReading};
pub use listener::{start, start_with_events, ListenerState, SyncHandle};
pub use worker::{EventOutcome, SensorRow, SensorSink};
