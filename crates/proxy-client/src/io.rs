mod chunks;
mod events;
mod lines;

pub use chunks::{Chunks, ChunksError};
pub use events::{EventStream, EventStreamError};
pub use lines::{LineBuffer, LineBufferError};
