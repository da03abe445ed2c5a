use crate::core::config::Config;
use crate::core::style::{AspectRatio, VISUAL_STYLES};
use crate::services::prompt::{MAX_SCENES, MIN_SCENES};
use anyhow::Result;
use inquire::validator::Validation;
use inquire::{CustomType, Select, Text};
use std::path::PathBuf;

/// Asks for the visual style, aspect ratio and scene count, starting from
/// the configured values. Saves the config when anything changed.
pub fn run_setup(config: &mut Config) -> Result<()> {
    if config.unattended {
        return Ok(());
    }

    let settings = &mut config.storyboard;
    let current = settings.visual_style();
    let mut needs_save = false;

    let cursor = VISUAL_STYLES.iter().position(|s| s.id == current.id).unwrap_or(0);
    let style = Select::new("Select Visual Style:", VISUAL_STYLES.iter().collect::<Vec<_>>())
        .with_starting_cursor(cursor)
        .prompt()?;
    if style.id != settings.style {
        settings.style = style.id.to_string();
        needs_save = true;
    }

    let cursor = AspectRatio::ALL
        .iter()
        .position(|r| *r == settings.aspect_ratio)
        .unwrap_or(0);
    let ratio = Select::new("Select Aspect Ratio:", AspectRatio::ALL.to_vec())
        .with_starting_cursor(cursor)
        .prompt()?;
    if ratio != settings.aspect_ratio {
        settings.aspect_ratio = ratio;
        needs_save = true;
    }

    let count = CustomType::<u32>::new("Number of scenes:")
        .with_default(settings.scene_count())
        .with_validator(|n: &u32| {
            if (MIN_SCENES..=MAX_SCENES).contains(n) {
                Ok(Validation::Valid)
            } else {
                Ok(Validation::Invalid(
                    format!("Choose between {} and {} scenes", MIN_SCENES, MAX_SCENES).into(),
                ))
            }
        })
        .prompt()?;
    if count != settings.scene_count {
        settings.scene_count = count;
        needs_save = true;
    }

    if needs_save {
        config.save()?;
        println!("Configuration saved.");
    }

    Ok(())
}

pub fn ask_video_path() -> Result<PathBuf> {
    let answer = Text::new("Path to the source video (max 15MB):").prompt()?;
    Ok(PathBuf::from(answer.trim()))
}
