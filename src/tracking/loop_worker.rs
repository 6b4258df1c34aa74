use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::TrackingMode;
use crate::content::Vocabulary;
use crate::dwell::{CommitEvent, CommitTrigger, DwellMachine, DwellStatus, Transition};
use crate::gaze::{look_at_point, resolve, CameraFrame, EyePose, Point, Viewport, WordFramesSnapshot};

use super::status::{self, TrackingSnapshot};

// Set to false to silence this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// One gaze estimate in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeSample {
    pub point: Point,
    pub at: Instant,
}

/// Input delivered to the tracking loop, in arrival order.
#[derive(Debug, Clone)]
pub enum TrackingEvent {
    Gaze(GazeSample),
    Pose {
        pose: EyePose,
        camera: CameraFrame,
        at: Instant,
    },
    Tap {
        word: String,
        at: Instant,
    },
    Interrupted,
    InterruptionEnded,
    Failed(String),
}

pub(crate) struct LoopContext {
    pub session_id: String,
    pub mode: TrackingMode,
    pub threshold: Duration,
    pub definition_display: Duration,
    pub viewport: Viewport,
    pub vocabulary: Arc<Vocabulary>,
    pub frames: watch::Receiver<WordFramesSnapshot>,
    pub snapshot: Arc<watch::Sender<TrackingSnapshot>>,
    pub commits: broadcast::Sender<CommitEvent>,
}

/// Current time on tokio's clock, so paused-time tests drive it too.
pub(crate) fn now() -> Instant {
    time::Instant::now().into_std()
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Owns the dwell machine for one tracking session. All resolver and timer
/// state lives on this task; at most one dwell deadline and one tap-hide
/// deadline are pending at a time.
pub(crate) async fn tracking_loop(
    ctx: LoopContext,
    mut events: mpsc::UnboundedReceiver<TrackingEvent>,
    cancel_token: CancellationToken,
) {
    let session_id = ctx.session_id.clone();
    let mut worker = Worker::new(ctx);
    log_info!("tracking loop started for session {}", session_id);

    loop {
        let dwell_deadline = worker.machine.deadline();
        let hide_deadline = worker.hide_at;

        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("tracking loop shutting down for session {}", session_id);
                break;
            }
            _ = sleep_until_opt(dwell_deadline) => {
                if let Some(commit) = worker.machine.poll(now()) {
                    worker.commit(commit);
                }
            }
            _ = sleep_until_opt(hide_deadline) => {
                worker.hide_tapped_definition();
            }
            event = events.recv() => match event {
                Some(event) => worker.handle(event),
                None => {
                    log_warn!("tracking event channel closed for session {}", session_id);
                    break;
                }
            }
        }
    }
}

struct Worker {
    ctx: LoopContext,
    machine: DwellMachine,
    hide_at: Option<Instant>,
    receiving_frames: bool,
    interrupted: bool,
}

impl Worker {
    fn new(ctx: LoopContext) -> Self {
        let machine = DwellMachine::new(ctx.threshold);
        Self {
            ctx,
            machine,
            hide_at: None,
            receiving_frames: false,
            interrupted: false,
        }
    }

    fn handle(&mut self, event: TrackingEvent) {
        match event {
            TrackingEvent::Gaze(sample) => {
                if self.accepts_gaze() {
                    self.on_point(sample.point, sample.at);
                }
            }
            TrackingEvent::Pose { pose, camera, at } => {
                if !self.accepts_gaze() {
                    return;
                }
                match look_at_point(&pose, &camera, self.ctx.viewport) {
                    Some(point) => self.on_point(point, at),
                    None => log_debug!("skipping frame with unprojectable gaze"),
                }
            }
            TrackingEvent::Tap { word, at } => self.on_tap(&word, at),
            TrackingEvent::Interrupted => {
                self.interrupted = true;
                self.reset_dwell();
                self.ctx
                    .snapshot
                    .send_modify(|s| s.set_status(status::STATUS_INTERRUPTED));
                log_warn!("tracking session {} interrupted", self.ctx.session_id);
            }
            TrackingEvent::InterruptionEnded => {
                self.interrupted = false;
                self.reset_dwell();
                self.ctx
                    .snapshot
                    .send_modify(|s| s.set_status(status::STATUS_INTERRUPTION_ENDED));
                log_info!("tracking session {} resumed", self.ctx.session_id);
            }
            TrackingEvent::Failed(reason) => {
                self.reset_dwell();
                self.ctx.snapshot.send_modify(|s| {
                    s.tracking_available = false;
                    s.set_status(status::session_failed(&reason));
                });
                log_warn!("tracking session {} failed: {}", self.ctx.session_id, reason);
            }
        }
    }

    fn accepts_gaze(&self) -> bool {
        self.ctx.mode == TrackingMode::ArFaceTracking
            && !self.interrupted
            && self.ctx.snapshot.borrow().tracking_available
    }

    fn on_point(&mut self, point: Point, at: Instant) {
        if !self.receiving_frames {
            self.receiving_frames = true;
            self.ctx
                .snapshot
                .send_modify(|s| s.set_status(status::STATUS_ACTIVE));
        }

        // Latest published layout; anything published before this sample is visible here.
        let frames = Arc::clone(&self.ctx.frames.borrow());
        let word = resolve(point, &frames);
        let update = self.machine.observe(word, at);

        if let Some(commit) = update.committed {
            self.commit(commit);
        }

        match update.transition {
            Transition::Unchanged => {}
            Transition::Entered(word) => {
                log_debug!("gaze entered '{}' (layout generation {})", word, frames.generation());
                self.hide_at = None;
                self.ctx.snapshot.send_modify(|s| {
                    s.hide_definition();
                    s.dwell_status = DwellStatus::Dwelling;
                    s.current_word = Some(word);
                });
            }
            Transition::Exited(word) => {
                log_debug!("gaze left '{}'", word);
                self.ctx.snapshot.send_modify(|s| s.clear_dwell());
            }
        }
    }

    fn on_tap(&mut self, word: &str, at: Instant) {
        let word = word.trim();
        if word.is_empty() {
            return;
        }
        self.hide_at = Some(at + self.ctx.definition_display);
        self.publish(CommitEvent {
            word: word.to_string(),
            at,
            committed_at: Utc::now(),
            trigger: CommitTrigger::Tap,
        });
    }

    fn commit(&mut self, commit: CommitEvent) {
        self.hide_at = None;
        self.ctx.snapshot.send_modify(|s| {
            s.dwell_status = DwellStatus::Committed;
        });
        self.publish(commit);
    }

    fn publish(&mut self, commit: CommitEvent) {
        let definition = self
            .ctx
            .vocabulary
            .definition(&commit.word)
            .map(str::to_string);
        if definition.is_none() {
            log_debug!("no definition for '{}'", commit.word);
        }

        self.ctx.snapshot.send_modify(|s| {
            s.highlighted_word = Some(commit.word.clone());
            s.show_definition = true;
            s.definition = definition;
            s.set_status(status::looking_at(&commit.word));
        });

        log_info!("{:?} commit for '{}'", commit.trigger, commit.word);
        // No subscribers is fine; the snapshot already carries the result.
        let _ = self.ctx.commits.send(commit);
    }

    fn hide_tapped_definition(&mut self) {
        self.hide_at = None;
        self.ctx.snapshot.send_modify(|s| s.hide_definition());
    }

    fn reset_dwell(&mut self) {
        self.receiving_frames = false;
        if self.machine.reset() {
            self.ctx.snapshot.send_modify(|s| s.clear_dwell());
        }
    }
}
