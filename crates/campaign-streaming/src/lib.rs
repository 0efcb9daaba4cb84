//! Bounded progress channels and the in-process server-sent-event bus.

pub mod bus;
pub mod events;
pub mod progress;

pub use bus::SseBus;
pub use events::{RescoreResult, ScoredDomainSample, SseEvent};
pub use progress::{progress_channel, ProgressSender, PROGRESS_CHANNEL_CAPACITY};
