use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Select;
use std::path::{Path, PathBuf};
use video2storyboard::core::config::{Config, GeminiConfig};
use video2storyboard::core::io::NativeStorage;
use video2storyboard::core::storyboard::{ImageState, RunSnapshot};
use video2storyboard::core::upload::VideoUpload;
use video2storyboard::services::clipboard::{CopyTarget, TerminalClipboard};
use video2storyboard::services::export::export_storyboard;
use video2storyboard::services::generation::create_generators;
use video2storyboard::services::pipeline::SceneProgress;
use video2storyboard::services::setup;
use video2storyboard::services::workflow::{RunOptions, StoryboardWorkflow};

struct BarProgress {
    bar: ProgressBar,
}

impl SceneProgress for BarProgress {
    fn scenes_ready(&self, count: usize) {
        self.bar.set_length(count as u64);
        self.bar.reset();
    }

    fn scene_resolved(&self, index: usize, state: ImageState) {
        if state == ImageState::Failed {
            self.bar.println(format!("Scene {}: image failed", index + 1));
        }
        self.bar.inc(1);
    }

    fn images_finished(&self) {
        self.bar.finish_with_message("Images complete");
    }
}

enum MenuItem {
    Copy(CopyTarget, bool),
    Done,
}

impl std::fmt::Display for MenuItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MenuItem::Copy(target, true) => write!(f, "{} (copied)", target),
            MenuItem::Copy(target, false) => write!(f, "{}", target),
            MenuItem::Done => f.write_str("Done"),
        }
    }
}

fn apply_env_api_key(config: &mut Config) {
    let Ok(key) = std::env::var("GEMINI_API_KEY") else {
        return;
    };
    let gemini = config.generation.gemini.get_or_insert_with(GeminiConfig::default);
    if gemini.api_key.trim().is_empty() {
        gemini.api_key = key;
    }
}

fn print_storyboard(snapshot: &RunSnapshot) {
    let board = &snapshot.storyboard;
    if let Some(bp) = &board.blueprint {
        println!("\n== Story Blueprint ==");
        println!("Hook:      {}", bp.hook);
        println!("Pacing:    {}", bp.pacing);
        println!("Mood:      {}", bp.mood);
        println!("Expansion: {}", bp.expansion);
    }
    if let Some(profile) = &board.character_profile {
        println!("\n== Character ==\n{}", profile.as_str());
    }
    println!("\n== Scenes ==");
    for scene in board.scenes.iter() {
        println!("[{}] ({:?}) {}", scene.index + 1, scene.image_state, scene.text);
    }
    if let Some(meta) = &board.metadata {
        println!("\n== YouTube ==");
        println!("Title: {}", meta.title);
        println!("Description: {}", meta.description);
        println!("Tags:");
        for tag in meta.tag_list() {
            println!("  {}", tag);
        }
    }
}

fn copy_menu(workflow: &StoryboardWorkflow, snapshot: &RunSnapshot) -> Result<()> {
    let targets = CopyTarget::available(&snapshot.storyboard);
    if targets.is_empty() {
        return Ok(());
    }
    let clipboard = TerminalClipboard;
    loop {
        let mut items: Vec<MenuItem> = targets
            .iter()
            .map(|t| MenuItem::Copy(*t, workflow.is_copied(*t)))
            .collect();
        items.push(MenuItem::Done);

        match Select::new("Copy to clipboard:", items).prompt()? {
            MenuItem::Copy(target, _) => {
                workflow.copy(target, &clipboard);
            }
            MenuItem::Done => return Ok(()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            eprintln!("Please ensure 'config.yml' exists with valid Gemini settings.");
            return Err(e);
        }
    };
    apply_env_api_key(&mut config);
    config.ensure_directories()?;

    setup::run_setup(&mut config)?;

    let video_path = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => setup::ask_video_path()?,
    };
    let upload = match VideoUpload::from_path(&video_path).await {
        Ok(upload) => upload,
        Err(e) => {
            eprintln!("Cannot use {}: {}", video_path.display(), e);
            return Ok(());
        }
    };

    let generators = create_generators(&config)?;
    let workflow = StoryboardWorkflow::new(&config, generators);
    let options = RunOptions::from_settings(&config.storyboard);

    println!("Analyzing {} ...", upload.file_name());
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} scenes")?
            .progress_chars("#>-"),
    );
    let progress = BarProgress { bar };

    let snapshot = match workflow.run(Some(&upload), &options, &progress).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            progress.bar.abandon();
            eprintln!("Storyboard generation failed: {}", e);
            return Ok(());
        }
    };

    print_storyboard(&snapshot);

    let stem = Path::new(upload.file_name())
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| format!("run_{}", snapshot.run_id));
    let folder = Path::new(&config.output_folder).join(stem);
    let written = export_storyboard(
        &NativeStorage::new(),
        &folder.to_string_lossy(),
        &snapshot,
        options.style,
        options.aspect_ratio,
    )
    .await?;
    println!("\nSaved {} files to {}", written.len(), folder.display());

    if !config.unattended {
        copy_menu(&workflow, &snapshot)?;
    }

    Ok(())
}
