use std::time::Duration;

use eyeread_lib::{
    config::{EyeReadConfig, TrackingMode},
    content::Vocabulary,
    dwell::{CommitEvent, CommitTrigger, DwellStatus},
    gaze::{CameraFrame, EyePose, Mat4, Point, Rect, Vec3, Vec4, WordFrames, WordRect},
    tracking::{Capabilities, TrackingService},
};
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

const FRAME: Duration = Duration::from_millis(100);
const ON_WORD: Point = Point { x: 10.0, y: 10.0 };
const OFF_WORDS: Point = Point { x: 200.0, y: 200.0 };

fn vocabulary() -> Vocabulary {
    Vocabulary::new([
        ("magnificent", "very beautiful and impressive"),
        ("garden", "a piece of ground for growing plants"),
        ("observe", "to watch carefully"),
    ])
}

fn frames() -> WordFrames {
    WordFrames::new(vec![WordRect::new(
        "magnificent",
        Rect::new(0.0, 0.0, 50.0, 20.0),
    )])
}

fn service_with(config: EyeReadConfig, capabilities: Capabilities) -> TrackingService {
    let service = TrackingService::new(config, vocabulary(), capabilities).unwrap();
    service.update_word_frames(frames());
    service
}

fn service() -> TrackingService {
    service_with(EyeReadConfig::default(), Capabilities::face_tracking())
}

/// Deliver one sample per frame at `point` for `span`.
async fn gaze_for(service: &TrackingService, point: Point, span: Duration) {
    let end = Instant::now() + span;
    while Instant::now() < end {
        service.submit_gaze(point).await.unwrap();
        time::sleep(FRAME).await;
    }
}

/// Let the tracking loop drain its queue.
async fn settle() {
    time::sleep(Duration::from_millis(1)).await;
}

fn drain(rx: &mut broadcast::Receiver<CommitEvent>) -> Vec<CommitEvent> {
    let mut out = Vec::new();
    while let Ok(commit) = rx.try_recv() {
        out.push(commit);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn continuous_dwell_commits_once_at_threshold() {
    let service = service();
    let mut commits = service.commits();
    service.start_tracking().await.unwrap();

    let start = Instant::now().into_std();
    gaze_for(&service, ON_WORD, Duration::from_millis(3100)).await;
    settle().await;

    let commits = drain(&mut commits);
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].word, "magnificent");
    assert_eq!(commits[0].trigger, CommitTrigger::Dwell);
    assert_eq!(commits[0].at.duration_since(start), Duration::from_secs(3));

    let snapshot = service.snapshot();
    assert_eq!(snapshot.highlighted_word.as_deref(), Some("magnificent"));
    assert!(snapshot.show_definition);
    assert_eq!(
        snapshot.definition.as_deref(),
        Some("very beautiful and impressive")
    );
    assert_eq!(snapshot.status, "Looking at word: magnificent");
    assert_eq!(snapshot.dwell_status, DwellStatus::Committed);
}

#[tokio::test(start_paused = true)]
async fn leaving_before_threshold_commits_nothing() {
    let service = service();
    let mut commits = service.commits();
    service.start_tracking().await.unwrap();

    gaze_for(&service, ON_WORD, Duration::from_millis(2900)).await;
    gaze_for(&service, OFF_WORDS, FRAME).await;
    time::sleep(Duration::from_secs(5)).await;

    assert!(drain(&mut commits).is_empty());
    let snapshot = service.snapshot();
    assert_eq!(snapshot.dwell_status, DwellStatus::Idle);
    assert!(!snapshot.show_definition);
}

#[tokio::test(start_paused = true)]
async fn brief_exit_requires_a_fresh_full_dwell() {
    let service = service();
    let mut commits = service.commits();
    service.start_tracking().await.unwrap();

    let start = Instant::now().into_std();
    gaze_for(&service, ON_WORD, Duration::from_millis(1500)).await;
    gaze_for(&service, OFF_WORDS, FRAME).await;
    gaze_for(&service, ON_WORD, Duration::from_millis(3000)).await;
    gaze_for(&service, OFF_WORDS, FRAME).await;
    settle().await;

    let commits = drain(&mut commits);
    assert_eq!(commits.len(), 1);
    assert_eq!(
        commits[0].at.duration_since(start),
        Duration::from_millis(4600)
    );
}

#[tokio::test(start_paused = true)]
async fn stop_then_start_leaves_no_stale_commit() {
    let service = service();
    let mut commits = service.commits();
    let first = service.start_tracking().await.unwrap();

    gaze_for(&service, ON_WORD, Duration::from_secs(2)).await;
    service.stop_tracking().await.unwrap();
    let second = service.start_tracking().await.unwrap();
    assert_ne!(first, second);

    let snapshot = service.snapshot();
    assert_eq!(snapshot.dwell_status, DwellStatus::Idle);
    assert_eq!(snapshot.current_word, None);

    time::sleep(Duration::from_secs(5)).await;
    assert!(drain(&mut commits).is_empty());
}

#[tokio::test(start_paused = true)]
async fn lifecycle_calls_are_idempotent() {
    let service = service();

    service.stop_tracking().await.unwrap();
    assert!(!service.is_tracking().await);

    let id = service.start_tracking().await.unwrap();
    assert_eq!(service.start_tracking().await.unwrap(), id);
    assert!(service.snapshot().is_tracking);

    service.stop_tracking().await.unwrap();
    service.stop_tracking().await.unwrap();
    let snapshot = service.snapshot();
    assert!(!snapshot.is_tracking);
    assert_eq!(snapshot.session_id, None);
    assert_eq!(snapshot.status, "Tracking stopped");
}

#[tokio::test(start_paused = true)]
async fn samples_while_stopped_are_dropped() {
    let service = service();
    let mut commits = service.commits();

    gaze_for(&service, ON_WORD, Duration::from_secs(4)).await;
    assert!(drain(&mut commits).is_empty());
    assert_eq!(service.snapshot().dwell_status, DwellStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn replaced_frames_apply_to_the_next_sample() {
    let service = service();
    let mut commits = service.commits();
    service.start_tracking().await.unwrap();

    gaze_for(&service, ON_WORD, Duration::from_secs(1)).await;

    let generation = service.update_word_frames(WordFrames::new(vec![WordRect::new(
        "garden",
        Rect::new(0.0, 0.0, 60.0, 30.0),
    )]));
    assert_eq!(service.word_frames().generation(), generation);

    gaze_for(&service, ON_WORD, Duration::from_millis(3100)).await;
    settle().await;

    let words: Vec<_> = drain(&mut commits).into_iter().map(|c| c.word).collect();
    assert_eq!(words, vec!["garden".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn unsupported_device_stays_idle() {
    let service = service_with(EyeReadConfig::default(), Capabilities::none());
    let mut commits = service.commits();
    assert_eq!(
        service.snapshot().status,
        "This device does not support eye tracking."
    );

    service.start_tracking().await.unwrap();
    assert_eq!(
        service.snapshot().status,
        "Face tracking is not supported on this device"
    );

    gaze_for(&service, ON_WORD, Duration::from_secs(4)).await;
    assert!(drain(&mut commits).is_empty());
    assert_eq!(service.snapshot().dwell_status, DwellStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn interruption_resets_and_resume_rearms() {
    let service = service();
    let mut commits = service.commits();
    service.start_tracking().await.unwrap();

    gaze_for(&service, ON_WORD, Duration::from_secs(2)).await;
    service.session_interrupted().await.unwrap();
    settle().await;

    let snapshot = service.snapshot();
    assert_eq!(snapshot.status, "Session was interrupted");
    assert_eq!(snapshot.dwell_status, DwellStatus::Idle);

    // Frames that still trickle in during the interruption are ignored.
    gaze_for(&service, ON_WORD, Duration::from_secs(4)).await;
    assert!(drain(&mut commits).is_empty());

    service.session_interruption_ended().await.unwrap();
    settle().await;
    assert_eq!(service.snapshot().status, "Session interruption ended");

    gaze_for(&service, ON_WORD, Duration::from_millis(3100)).await;
    settle().await;
    assert_eq!(drain(&mut commits).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn session_failure_marks_tracking_unavailable() {
    let service = service();
    let mut commits = service.commits();
    service.start_tracking().await.unwrap();

    service.session_failed("camera lost").await.unwrap();
    settle().await;

    let snapshot = service.snapshot();
    assert!(!snapshot.tracking_available);
    assert_eq!(snapshot.status, "Session failed: camera lost");

    gaze_for(&service, ON_WORD, Duration::from_secs(4)).await;
    assert!(drain(&mut commits).is_empty());
}

#[tokio::test(start_paused = true)]
async fn tap_shows_definition_then_hides_it() {
    let config = EyeReadConfig {
        tracking_mode: TrackingMode::TapFallback,
        ..EyeReadConfig::default()
    };
    let service = service_with(config, Capabilities::face_tracking());
    let mut commits = service.commits();
    service.start_tracking().await.unwrap();

    // Gaze is ignored in tap mode.
    gaze_for(&service, ON_WORD, Duration::from_secs(4)).await;
    assert!(drain(&mut commits).is_empty());

    service.tap("observe").await.unwrap();
    settle().await;

    let commits = drain(&mut commits);
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].trigger, CommitTrigger::Tap);

    let snapshot = service.snapshot();
    assert!(snapshot.show_definition);
    assert_eq!(snapshot.definition.as_deref(), Some("to watch carefully"));

    // A second tap restarts the hide deadline.
    time::sleep(Duration::from_secs(3)).await;
    service.tap("observe").await.unwrap();
    time::sleep(Duration::from_secs(3)).await;
    assert!(service.snapshot().show_definition);

    time::sleep(Duration::from_millis(2100)).await;
    let snapshot = service.snapshot();
    assert!(!snapshot.show_definition);
    assert_eq!(snapshot.highlighted_word, None);
}

#[tokio::test(start_paused = true)]
async fn projected_pose_drives_the_dwell() {
    let service = service();
    let viewport = service.config().viewport;
    service.update_word_frames(WordFrames::new(vec![WordRect::new(
        "observe",
        Rect::new(
            viewport.width / 2.0 - 40.0,
            viewport.height / 2.0 - 15.0,
            80.0,
            30.0,
        ),
    )]));

    let mut commits = service.commits();
    service.start_tracking().await.unwrap();

    let eye = |x: f32| {
        let mut m = Mat4::from_translation(Vec3::new(x, 0.0, 0.0));
        m.columns[2] = Vec4::new(0.0, 0.0, 1.0, 0.0);
        m
    };
    let pose = EyePose {
        face: Mat4::IDENTITY,
        left_eye: eye(-0.03),
        right_eye: eye(0.03),
    };

    let end = Instant::now() + Duration::from_millis(3100);
    while Instant::now() < end {
        service
            .submit_pose(pose, CameraFrame::default())
            .await
            .unwrap();
        time::sleep(FRAME).await;
    }
    settle().await;

    let commits = drain(&mut commits);
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].word, "observe");
}

#[tokio::test(start_paused = true)]
async fn snapshot_watchers_see_the_commit() {
    let service = service();
    let mut watcher = service.watch();
    service.start_tracking().await.unwrap();

    let driver = service.clone();
    let feed = tokio::spawn(async move {
        gaze_for(&driver, ON_WORD, Duration::from_millis(3500)).await;
    });

    let snapshot = loop {
        watcher.changed().await.unwrap();
        let snapshot = watcher.borrow_and_update().clone();
        if snapshot.show_definition {
            break snapshot;
        }
    };
    assert_eq!(snapshot.highlighted_word.as_deref(), Some("magnificent"));
    feed.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn concurrent_stop_and_start_agree_with_the_snapshot() {
    let service = service();
    service.start_tracking().await.unwrap();
    gaze_for(&service, ON_WORD, Duration::from_secs(1)).await;

    let (stopped, started) = tokio::join!(service.stop_tracking(), service.start_tracking());
    stopped.unwrap();
    let new_id = started.unwrap();

    let running = service.is_tracking().await;
    let snapshot = service.snapshot();
    assert_eq!(snapshot.is_tracking, running);
    if running {
        assert_eq!(snapshot.session_id.as_deref(), Some(new_id.as_str()));
        assert_ne!(snapshot.status, "Tracking stopped");
    } else {
        assert_eq!(snapshot.session_id, None);
    }
}

#[test]
fn concurrent_frame_publishers_leave_the_newest_generation_live() {
    let service = TrackingService::new(
        EyeReadConfig::default(),
        vocabulary(),
        Capabilities::face_tracking(),
    )
    .unwrap();

    let generations: Vec<u64> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = &service;
                scope.spawn(move || {
                    (0..50)
                        .map(|_| service.update_word_frames(frames()))
                        .max()
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let newest = generations.into_iter().max().unwrap();
    assert_eq!(newest, 400);
    assert_eq!(service.word_frames().generation(), newest);
}
