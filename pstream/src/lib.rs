//! Streaming response model: SSE frames, response sinks, and the delivery phase.

mod delivery;
mod error;
mod frame;
mod sink;

pub mod prelude {
    pub use crate::{
        BufferedResponseSink, ChannelResponseSink, DeliveryPhase, ResponseChannel, ResponseSink,
        StreamError, StreamErrorKind, StreamFrame,
    };
}

pub use delivery::{DeliveryPhase, ResponseChannel};
pub use error::{StreamError, StreamErrorKind};
pub use frame::{ATTACHMENT_EVENT, MESSAGE_EVENT, StreamFrame};
pub use sink::{BufferedResponseSink, ChannelResponseSink, ResponseSink};
