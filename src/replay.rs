//! Scripted gaze sessions: timed gaze points, poses, taps and session
//! events played against a [`TrackingService`] on tokio's clock.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::{self, Instant};

use crate::config::EyeReadConfig;
use crate::content::{layout_article, Article, FontSize};
use crate::dwell::CommitTrigger;
use crate::gaze::{CameraFrame, EyePose, Point};
use crate::tracking::{TrackingService, TrackingSnapshot};

const ENABLE_LOGS: bool = true;
use crate::{log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScriptAction {
    /// Look at a point; repeated every frame for `hold_ms` when non-zero.
    #[serde(rename_all = "camelCase")]
    Gaze {
        x: f64,
        y: f64,
        #[serde(default)]
        hold_ms: u64,
    },
    Pose {
        pose: EyePose,
        #[serde(default)]
        camera: CameraFrame,
    },
    Tap {
        word: String,
    },
    /// Re-lay out the article at a new font size and publish its frames.
    #[serde(rename_all = "camelCase")]
    Layout {
        font_size: FontSize,
    },
    Interrupt,
    Resume,
    Fail {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStep {
    /// Offset from the start of the replay.
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: ScriptAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GazeScript {
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Uniform noise added to every gaze point, in points.
    #[serde(default)]
    pub jitter_px: f64,
    #[serde(default)]
    pub seed: u64,
    /// Time to keep running after the last step so pending timers can fire.
    #[serde(default)]
    pub settle_ms: u64,
    pub steps: Vec<ScriptStep>,
}

fn default_frame_interval_ms() -> u64 {
    16
}

impl GazeScript {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read gaze script from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse gaze script in {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayCommit {
    pub word: String,
    pub trigger: CommitTrigger,
    pub at_ms: u64,
    pub committed_at: DateTime<Utc>,
    pub definition: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub session_id: String,
    pub commits: Vec<ReplayCommit>,
    pub final_snapshot: TrackingSnapshot,
}

/// Play `script` against `service`. The article is laid out with the
/// configured font size before the first step.
pub async fn run_script(
    service: &TrackingService,
    config: &EyeReadConfig,
    article: &Article,
    script: &GazeScript,
) -> Result<ReplayReport> {
    let mut commits_rx = service.commits();
    let mut rng = StdRng::seed_from_u64(script.seed);
    let frame = Duration::from_millis(script.frame_interval_ms.max(1));

    service.update_word_frames(layout_article(article, config.font_size, &config.layout));
    let session_id = service.start_tracking().await?;

    let start = Instant::now();
    let start_std = start.into_std();

    for step in &script.steps {
        time::sleep_until(start + Duration::from_millis(step.at_ms)).await;

        match &step.action {
            ScriptAction::Gaze { x, y, hold_ms } => {
                let until = Instant::now() + Duration::from_millis(*hold_ms);
                loop {
                    let point = jitter(Point::new(*x, *y), script.jitter_px, &mut rng);
                    service.submit_gaze(point).await?;
                    if Instant::now() + frame > until {
                        break;
                    }
                    time::sleep(frame).await;
                }
            }
            ScriptAction::Pose { pose, camera } => service.submit_pose(*pose, *camera).await?,
            ScriptAction::Tap { word } => service.tap(word).await?,
            ScriptAction::Layout { font_size } => {
                let generation =
                    service.update_word_frames(layout_article(article, *font_size, &config.layout));
                log_info!("published {:?} layout as generation {}", font_size, generation);
            }
            ScriptAction::Interrupt => service.session_interrupted().await?,
            ScriptAction::Resume => service.session_interruption_ended().await?,
            ScriptAction::Fail { reason } => service.session_failed(reason.clone()).await?,
        }
    }

    time::sleep(Duration::from_millis(script.settle_ms)).await;

    let mut commits = Vec::new();
    loop {
        match commits_rx.try_recv() {
            Ok(commit) => commits.push(ReplayCommit {
                definition: article.difficult_words.definition(&commit.word).map(str::to_string),
                at_ms: commit.at.saturating_duration_since(start_std).as_millis() as u64,
                committed_at: commit.committed_at,
                word: commit.word,
                trigger: commit.trigger,
            }),
            Err(TryRecvError::Lagged(skipped)) => {
                log_warn!("replay missed {} commit events", skipped);
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }

    let final_snapshot = service.snapshot();
    service.stop_tracking().await?;

    Ok(ReplayReport {
        session_id,
        commits,
        final_snapshot,
    })
}

fn jitter(point: Point, amount: f64, rng: &mut StdRng) -> Point {
    if amount <= 0.0 {
        return point;
    }
    Point::new(
        point.x + rng.gen_range(-amount..=amount),
        point.y + rng.gen_range(-amount..=amount),
    )
}
