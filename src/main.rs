use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use log::info;

use eyeread_lib::{
    content::load_articles,
    replay::{run_script, GazeScript},
    Capabilities, ConfigStore, TrackingMode, TrackingService,
};

/// Replay a scripted gaze session against an article and print the commits.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gaze script (JSON)
    script: PathBuf,

    /// Article list (JSON)
    #[arg(long, default_value = "demos/articles.json")]
    articles: PathBuf,

    /// Title of the article to read; defaults to the first one
    #[arg(long)]
    article: Option<String>,

    /// Config file; missing means defaults
    #[arg(long, env = "EYEREAD_CONFIG", default_value = "eyeread.json")]
    config: PathBuf,

    /// Use tap fallback regardless of the configured mode
    #[arg(long)]
    tap_fallback: bool,

    /// Pretend the device has no face tracking
    #[arg(long)]
    no_face_tracking: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    eyeread_lib::init_logging();

    info!("EyeRead replay starting...");

    let mut config = ConfigStore::new(args.config.clone())?.get();
    if args.tap_fallback {
        config.tracking_mode = TrackingMode::TapFallback;
    }

    let articles = load_articles(&args.articles)?;
    let article = match &args.article {
        Some(title) => articles
            .iter()
            .find(|a| &a.title == title)
            .ok_or_else(|| anyhow!("no article titled '{title}' in {}", args.articles.display()))?,
        None => articles
            .first()
            .ok_or_else(|| anyhow!("{} contains no articles", args.articles.display()))?,
    };

    let script = GazeScript::load(&args.script)?;
    let capabilities = if args.no_face_tracking {
        Capabilities::none()
    } else {
        Capabilities::face_tracking()
    };

    let service = TrackingService::new(config.clone(), article.difficult_words.clone(), capabilities)?;
    let report = run_script(&service, &config, article, &script).await?;

    info!(
        "Replay of '{}' finished with {} commit(s)",
        article.title,
        report.commits.len()
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
