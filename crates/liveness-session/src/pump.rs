//! Frame pump: single-owner session thread fed over an SPSC channel.
//!
//! The capture side (often a camera callback on its own thread) hands
//! frames to a dedicated OS thread that owns the `Session`. The bounded
//! `mpsc` channel preserves arrival order — the baseline and the movement
//! metric are both order-sensitive — and provides backpressure instead of
//! unbounded buffering. Dropping every handle tears the thread down from
//! any state; no terminal state is required first.

use tokio::sync::{mpsc, oneshot};

use liveness_core::EngineConfig;

use crate::report::CompletionReport;
use crate::session::{FramePacket, Session, SessionError, StateSnapshot};

/// Messages sent from handles to the session thread.
enum SessionRequest {
    Frame(FramePacket),
    BeginCalibration,
    FailTimeout,
    Snapshot {
        reply: oneshot::Sender<StateSnapshot>,
    },
    Finish {
        reply: oneshot::Sender<Result<CompletionReport, SessionError>>,
    },
}

/// Clone-safe handle to the session thread.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionRequest>,
}

/// Spawn a session on a dedicated OS thread. Fails fast on an invalid
/// configuration; after that, per-frame faults never surface here.
pub fn spawn_session(config: EngineConfig) -> Result<SessionHandle, SessionError> {
    let mut session = Session::new(config)?;
    let (tx, mut rx) = mpsc::channel::<SessionRequest>(32);

    std::thread::Builder::new()
        .name("liveness-session".into())
        .spawn(move || {
            tracing::info!(id = %session.verification_id(), "session thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    SessionRequest::Frame(packet) => {
                        session.process_frame(packet);
                    }
                    SessionRequest::BeginCalibration => {
                        session.begin_calibration();
                    }
                    SessionRequest::FailTimeout => {
                        session.fail_timeout();
                    }
                    SessionRequest::Snapshot { reply } => {
                        let _ = reply.send(session.snapshot());
                    }
                    SessionRequest::Finish { reply } => {
                        let _ = reply.send(session.report().ok_or(SessionError::NotFinished));
                    }
                }
            }
            tracing::info!("session thread exiting");
        })
        .expect("failed to spawn session thread");

    Ok(SessionHandle { tx })
}

impl SessionHandle {
    /// Deliver one frame. Awaits when the channel is full (backpressure)
    /// rather than reordering or dropping.
    pub async fn push_frame(&self, packet: FramePacket) -> Result<(), SessionError> {
        self.tx
            .send(SessionRequest::Frame(packet))
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Trigger the `Ready → Calibrating` transition.
    pub async fn begin_calibration(&self) -> Result<(), SessionError> {
        self.tx
            .send(SessionRequest::BeginCalibration)
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Force a timeout failure from the caller's clock.
    pub async fn fail_timeout(&self) -> Result<(), SessionError> {
        self.tx
            .send(SessionRequest::FailTimeout)
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Read-only state snapshot for interface rendering.
    pub async fn snapshot(&self) -> Result<StateSnapshot, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionRequest::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Fetch the completion report. Errors with `NotFinished` while the
    /// session is still running.
    pub async fn finish(&self) -> Result<CompletionReport, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionRequest::Finish { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)?
    }
}
