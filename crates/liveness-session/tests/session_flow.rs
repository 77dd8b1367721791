//! End-to-end session flow through the frame pump: an async caller feeds
//! synthetic frames over the handle and collects the completion report,
//! the same shape a camera-capture integration takes.

use liveness_core::synthetic::{shifted, synthetic_face};
use liveness_core::EngineConfig;
use liveness_session::{spawn_session, FramePacket, SessionError, SessionState, SnapshotImage};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn neutral(i: usize) -> FramePacket {
    let ear = 0.30 + 0.005 * ((i % 5) as f32 - 2.0) / 2.0;
    let face = synthetic_face(ear, 0.05, 0.0);
    FramePacket::face(shifted(&face, 0.001 * ((i % 3) as f32 - 1.0), 0.0))
}

/// Pick the frame that satisfies the currently prompted challenge. The
/// blink prompt needs a closed-then-open script, so `step` counts frames
/// fed since the prompt last changed.
fn frame_for_prompt(prompt: &str, step: usize, i: usize) -> FramePacket {
    let jitter = 0.001 * ((i % 3) as f32 - 1.0);
    let face = match prompt {
        "Blink both eyes" => {
            if step < 3 {
                synthetic_face(0.08, 0.05, 0.0)
            } else {
                synthetic_face(0.31, 0.05, 0.0)
            }
        }
        "Smile" => synthetic_face(0.30, 0.30, 0.0),
        "Turn your head to your left" => synthetic_face(0.30, 0.05, 0.25),
        "Turn your head to your right" => synthetic_face(0.30, 0.05, -0.25),
        other => panic!("unexpected prompt: {other}"),
    };
    FramePacket::face(shifted(&face, jitter, 0.0))
}

#[tokio::test]
async fn full_session_over_the_pump() {
    init_tracing();
    let config = EngineConfig {
        calibration_sample_count: 5,
        ..Default::default()
    };
    let handle = spawn_session(config).unwrap();

    // Not finished yet: the report endpoint must say so, not block
    match handle.finish().await {
        Err(SessionError::NotFinished) => {}
        other => panic!("expected NotFinished, got {other:?}"),
    }

    // Face acquisition, then calibration
    handle.push_frame(neutral(0)).await.unwrap();
    handle.begin_calibration().await.unwrap();
    for i in 0..5 {
        handle.push_frame(neutral(i)).await.unwrap();
    }
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.state, SessionState::Challenging);
    assert!(snap.prompt.is_some());

    // Drive whatever plan the session drew, following its prompts. Attach
    // an image so completion captures a selfie.
    let mut i = 0;
    let mut step = 0;
    let mut last_prompt = snap.prompt.unwrap();
    loop {
        let snap = handle.snapshot().await.unwrap();
        if snap.state.is_terminal() {
            break;
        }
        let prompt = snap.prompt.expect("challenging without a prompt");
        if prompt != last_prompt {
            last_prompt = prompt;
            step = 0;
        }
        let mut packet = frame_for_prompt(prompt, step, i);
        packet.snapshot = Some(SnapshotImage {
            width: 640,
            height: 480,
            data: vec![0xAB; 16],
        });
        handle.push_frame(packet).await.unwrap();
        i += 1;
        step += 1;
        assert!(i < 500, "session did not terminate");
    }

    let report = handle.finish().await.unwrap();
    assert!(report.passed, "sub-scores: {:?}", report.sub_scores);
    assert!(report.score >= 0.6);
    assert_eq!(report.completed_challenges.len(), 4);
    assert!(report.failure.is_none());
    assert_eq!(report.snapshot.unwrap().data, vec![0xAB; 16]);
}

#[tokio::test]
async fn external_timeout_over_the_pump() {
    init_tracing();
    let config = EngineConfig {
        calibration_sample_count: 5,
        ..Default::default()
    };
    let handle = spawn_session(config).unwrap();

    handle.push_frame(neutral(0)).await.unwrap();
    handle.begin_calibration().await.unwrap();
    handle.fail_timeout().await.unwrap();

    let report = handle.finish().await.unwrap();
    assert!(!report.passed);
    assert!(report.failure.is_some());
    assert!(report.completed_challenges.is_empty());
}

#[tokio::test]
async fn cloned_handle_keeps_session_alive() {
    init_tracing();
    let config = EngineConfig::default();
    let handle = spawn_session(config).unwrap();
    let clone = handle.clone();
    drop(handle);

    // The surviving clone keeps the thread alive
    clone.push_frame(neutral(0)).await.unwrap();
    let snap = clone.snapshot().await.unwrap();
    assert_eq!(snap.state, SessionState::Ready);
}
