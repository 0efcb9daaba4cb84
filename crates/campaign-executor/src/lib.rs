//! Phase Execution State Machine and Control-Channel Dispatcher
//!: the per-phase lifecycle driver, cooperative pause/cancel
//! primitives, and the command-routing layer the orchestrator attaches
//! upstream control streams to.

pub mod cancel;
pub mod control;
pub mod pause;
pub mod phase;

pub use cancel::CancellationToken;
pub use control::{ControlDispatcher, InboundCommand};
pub use pause::PauseBarrier;
pub use phase::{
    ControlCommand, ControlSignal, PhaseExecutor, PhaseWorkerContext, PhaseWorkerFn,
    PhaseWorkerFuture, PhaseWorkerResult,
};
