/// Server-sent notification delivery
///
/// Per-process only: emitters and the replay cache live in memory.
pub mod event;
pub mod registry;
pub mod stream;

pub use event::{id_timestamp, SseEvent};
pub use registry::{Emitter, EmitterRegistry};
pub use stream::{event_stream, EventStream};
