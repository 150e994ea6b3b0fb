//! Channel projector runtime.
//!
//! [`ChannelProjector`] keeps an ordered list of message views in sync with a
//! remote chat channel, driven entirely by the channel's event stream.

/// Load/send/dispose operations over any SDK implementing the core traits.
pub mod projector;
mod shared;

pub use projector::ChannelProjector;
