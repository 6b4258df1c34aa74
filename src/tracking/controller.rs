use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::info;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{EyeReadConfig, TrackingMode};
use crate::content::Vocabulary;
use crate::dwell::CommitEvent;
use crate::gaze::{CameraFrame, EyePose, Point, WordFrames, WordFramesSnapshot};

use super::loop_worker::{now, tracking_loop, GazeSample, LoopContext, TrackingEvent};
use super::status::{self, Capabilities, TrackingSnapshot};

const COMMIT_CHANNEL_CAPACITY: usize = 64;

struct ActiveSession {
    session_id: String,
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
    events: mpsc::UnboundedSender<TrackingEvent>,
}

/// Cloneable handle the reading screen drives: lifecycle, word-frame
/// publication, input delivery and observable output.
#[derive(Clone)]
pub struct TrackingService {
    config: Arc<EyeReadConfig>,
    vocabulary: Arc<Vocabulary>,
    frames: Arc<watch::Sender<WordFramesSnapshot>>,
    snapshot: Arc<watch::Sender<TrackingSnapshot>>,
    commits: broadcast::Sender<CommitEvent>,
    session: Arc<Mutex<Option<ActiveSession>>>,
}

impl TrackingService {
    pub fn new(
        config: EyeReadConfig,
        vocabulary: Vocabulary,
        capabilities: Capabilities,
    ) -> Result<Self> {
        config.validate()?;

        let snapshot = TrackingSnapshot::initial(config.tracking_mode, capabilities);
        let (snapshot_tx, _) = watch::channel(snapshot);
        let (frames_tx, _) = watch::channel(Arc::new(WordFrames::empty()));
        let (commits_tx, _) = broadcast::channel(COMMIT_CHANNEL_CAPACITY);

        Ok(Self {
            config: Arc::new(config),
            vocabulary: Arc::new(vocabulary),
            frames: Arc::new(frames_tx),
            snapshot: Arc::new(snapshot_tx),
            commits: commits_tx,
            session: Arc::new(Mutex::new(None)),
        })
    }

    pub fn config(&self) -> &EyeReadConfig {
        &self.config
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that sees every snapshot change, for reactive UI binding.
    pub fn watch(&self) -> watch::Receiver<TrackingSnapshot> {
        self.snapshot.subscribe()
    }

    /// Receiver for commit events emitted after this call.
    pub fn commits(&self) -> broadcast::Receiver<CommitEvent> {
        self.commits.subscribe()
    }

    pub async fn is_tracking(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Start a tracking session. Calling it while a session is running
    /// returns the running session's id.
    pub async fn start_tracking(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        if let Some(active) = session.as_ref() {
            return Ok(active.session_id.clone());
        }

        let session_id = Uuid::new_v4().to_string();
        let mode = self.config.tracking_mode;

        self.snapshot.send_modify(|s| {
            s.is_tracking = true;
            s.session_id = Some(session_id.clone());
            s.clear_dwell();
            match mode {
                TrackingMode::ArFaceTracking if s.tracking_available => {
                    s.set_status(status::STATUS_STARTING)
                }
                TrackingMode::ArFaceTracking => s.set_status(status::STATUS_START_UNSUPPORTED),
                TrackingMode::TapFallback => s.set_status(status::STATUS_TAP_FALLBACK),
            }
        });

        let ctx = LoopContext {
            session_id: session_id.clone(),
            mode,
            threshold: self.config.dwell_threshold(),
            definition_display: self.config.definition_display(),
            viewport: self.config.viewport,
            vocabulary: Arc::clone(&self.vocabulary),
            frames: self.frames.subscribe(),
            snapshot: Arc::clone(&self.snapshot),
            commits: self.commits.clone(),
        };

        let cancel_token = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(tracking_loop(ctx, events_rx, cancel_token.clone()));

        info!("Started tracking session {} in {:?} mode", session_id, mode);

        *session = Some(ActiveSession {
            session_id: session_id.clone(),
            handle,
            cancel_token,
            events: events_tx,
        });

        Ok(session_id)
    }

    /// Stop the running session, cancelling any pending dwell. A no-op when
    /// nothing is running.
    pub async fn stop_tracking(&self) -> Result<()> {
        // Held until the snapshot is reset so a concurrent start cannot
        // interleave with the teardown.
        let mut session = self.session.lock().await;
        let Some(active) = session.take() else {
            return Ok(());
        };

        active.cancel_token.cancel();
        let joined = active.handle.await;

        self.snapshot.send_modify(|s| {
            s.is_tracking = false;
            s.session_id = None;
            s.clear_dwell();
            s.hide_definition();
            s.set_status(status::STATUS_STOPPED);
        });
        drop(session);

        joined.context("tracking loop task failed to join")?;
        info!("Stopped tracking session {}", active.session_id);
        Ok(())
    }

    /// Publish the word rectangles of a new layout pass, replacing the
    /// previous snapshot. Returns the snapshot's generation.
    pub fn update_word_frames(&self, frames: WordFrames) -> u64 {
        let mut generation = 0;
        self.frames.send_modify(|current| {
            generation = current.generation() + 1;
            *current = Arc::new(frames.with_generation(generation));
        });
        generation
    }

    pub fn word_frames(&self) -> WordFramesSnapshot {
        Arc::clone(&self.frames.borrow())
    }

    pub async fn submit_gaze(&self, point: Point) -> Result<()> {
        self.submit_sample(GazeSample { point, at: now() }).await
    }

    pub async fn submit_sample(&self, sample: GazeSample) -> Result<()> {
        self.send(TrackingEvent::Gaze(sample)).await
    }

    pub async fn submit_pose(&self, pose: EyePose, camera: CameraFrame) -> Result<()> {
        self.send(TrackingEvent::Pose {
            pose,
            camera,
            at: now(),
        })
        .await
    }

    pub async fn tap(&self, word: &str) -> Result<()> {
        self.send(TrackingEvent::Tap {
            word: word.to_string(),
            at: now(),
        })
        .await
    }

    pub async fn session_interrupted(&self) -> Result<()> {
        self.send(TrackingEvent::Interrupted).await
    }

    pub async fn session_interruption_ended(&self) -> Result<()> {
        self.send(TrackingEvent::InterruptionEnded).await
    }

    pub async fn session_failed(&self, reason: impl Into<String>) -> Result<()> {
        self.send(TrackingEvent::Failed(reason.into())).await
    }

    /// Input arriving while no session runs is dropped, the way a paused
    /// camera delivers no frames.
    async fn send(&self, event: TrackingEvent) -> Result<()> {
        let session = self.session.lock().await;
        let Some(active) = session.as_ref() else {
            log::debug!("dropping {:?}: tracking is not running", event);
            return Ok(());
        };
        active
            .events
            .send(event)
            .map_err(|_| anyhow!("tracking loop for session {} is gone", active.session_id))
    }
}
