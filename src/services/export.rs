use crate::core::io::Storage;
use crate::core::storyboard::{ImageState, RunSnapshot};
use crate::core::style::{AspectRatio, VisualStyle};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct SceneEntry<'a> {
    index: usize,
    text: &'a str,
    image_state: ImageState,
    image_file: Option<String>,
}

#[derive(Serialize)]
struct StoryboardDocument<'a> {
    run_id: u64,
    style: &'a str,
    aspect_ratio: AspectRatio,
    blueprint: &'a Option<crate::core::storyboard::StoryBlueprint>,
    character_profile: Option<&'a str>,
    scenes: Vec<SceneEntry<'a>>,
    metadata: &'a Option<crate::core::storyboard::YoutubeMetadata>,
}

fn join(folder: &str, name: &str) -> String {
    Path::new(folder).join(name).to_string_lossy().to_string()
}

/// Writes scene images, `storyboard.json` and (when present) `metadata.txt`
/// under `folder`. Returns the written paths.
pub async fn export_storyboard(
    storage: &dyn Storage,
    folder: &str,
    snapshot: &RunSnapshot,
    style: &VisualStyle,
    aspect_ratio: AspectRatio,
) -> Result<Vec<String>> {
    let board = &snapshot.storyboard;
    let mut written = Vec::new();
    let mut scenes = Vec::with_capacity(board.scenes.len());

    for scene in board.scenes.iter() {
        let image_file = match &scene.image {
            Some(image) => {
                let name = image.file_name(scene.index);
                let path = join(folder, &name);
                storage
                    .write(&path, &image.bytes)
                    .await
                    .with_context(|| format!("Failed to write {}", path))?;
                written.push(path);
                Some(name)
            }
            None => None,
        };
        scenes.push(SceneEntry {
            index: scene.index,
            text: &scene.text,
            image_state: scene.image_state,
            image_file,
        });
    }

    let document = StoryboardDocument {
        run_id: snapshot.run_id,
        style: style.id,
        aspect_ratio,
        blueprint: &board.blueprint,
        character_profile: board.character_profile.as_ref().map(|p| p.as_str()),
        scenes,
        metadata: &board.metadata,
    };
    let json_path = join(folder, "storyboard.json");
    storage
        .write(&json_path, serde_json::to_string_pretty(&document)?.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", json_path))?;
    written.push(json_path);

    if let Some(meta) = &board.metadata {
        let meta_path = join(folder, "metadata.txt");
        storage.write(&meta_path, meta.combined().as_bytes()).await?;
        written.push(meta_path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::{MemoryStorage, NativeStorage};
    use crate::core::storyboard::{
        CharacterProfile, ImageHandle, RunState, SceneBoard, SceneOutcome, Storyboard,
        YoutubeMetadata,
    };
    use crate::core::style::find_style;

    fn snapshot() -> RunSnapshot {
        let mut scenes = SceneBoard::from_texts(["alley", "door"]);
        scenes.apply(0, SceneOutcome::Loaded(ImageHandle::new(vec![9, 9], "image/png")));
        scenes.apply(1, SceneOutcome::Failed("down".to_string()));
        RunSnapshot {
            run_id: 4,
            state: RunState::Succeeded,
            error_message: None,
            storyboard: Storyboard {
                blueprint: None,
                character_profile: Some(CharacterProfile::new("A fox")),
                scenes,
                metadata: Some(YoutubeMetadata {
                    title: "T".to_string(),
                    description: "D".to_string(),
                    tags: "#a #b".to_string(),
                }),
            },
        }
    }

    #[tokio::test]
    async fn test_export_writes_images_json_and_metadata() -> Result<()> {
        let storage = MemoryStorage::new();
        let style = find_style("clay").unwrap();
        let written =
            export_storyboard(&storage, "out", &snapshot(), style, AspectRatio::Vertical).await?;

        assert_eq!(
            written,
            vec!["out/scene-1.png", "out/storyboard.json", "out/metadata.txt"]
        );
        assert_eq!(storage.read("out/scene-1.png").await?, vec![9, 9]);
        assert!(!storage.exists("out/scene-2.png").await?);
        assert_eq!(storage.read("out/metadata.txt").await?, b"T\n\nD\n\n#a #b");

        let json: serde_json::Value =
            serde_json::from_slice(&storage.read("out/storyboard.json").await?)?;
        assert_eq!(json["style"], "clay");
        assert_eq!(json["aspect_ratio"], "9:16");
        assert_eq!(json["character_profile"], "A fox");
        assert_eq!(json["scenes"][0]["image_file"], "scene-1.png");
        assert_eq!(json["scenes"][1]["image_state"], "failed");
        assert!(json["scenes"][1]["image_file"].is_null());
        assert_eq!(json["metadata"]["tags"], "#a #b");
        Ok(())
    }

    #[tokio::test]
    async fn test_export_to_disk() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let folder = dir.path().join("run_4");
        let style = find_style("realistic").unwrap();

        export_storyboard(
            &NativeStorage::new(),
            folder.to_str().unwrap(),
            &snapshot(),
            style,
            AspectRatio::Wide,
        )
        .await?;

        assert!(folder.join("scene-1.png").exists());
        assert!(folder.join("storyboard.json").exists());
        Ok(())
    }
}
