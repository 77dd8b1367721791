//! Stateful liveness session engine.
//!
//! Owns the per-verification state machine (`Session`), the bounded metric
//! history the scorer reads, the completion report handed to the caller,
//! and the frame pump that runs a session on its own thread behind an
//! async handle. The pure per-frame math lives in `liveness-core`.

pub mod history;
pub mod pump;
pub mod report;
pub mod session;

pub use pump::{spawn_session, SessionHandle};
pub use report::{CompletionReport, SnapshotImage};
pub use session::{
    FailureReason, FramePacket, Session, SessionError, SessionState, StateSnapshot,
};
