use crate::core::storyboard::Storyboard;
use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::collections::HashSet;
use std::io::Write;

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<()>;
}

/// Sets the terminal's clipboard through the OSC 52 escape sequence.
pub struct TerminalClipboard;

impl Clipboard for TerminalClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let mut out = std::io::stdout().lock();
        write!(out, "\x1b]52;c;{}\x07", BASE64.encode(text))?;
        out.flush()?;
        Ok(())
    }
}

/// Things a user can copy out of a finished storyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyTarget {
    Scene(usize),
    Title,
    Description,
    Tags,
    AllMetadata,
}

impl CopyTarget {
    pub fn id(&self) -> String {
        match self {
            CopyTarget::Scene(i) => format!("scene-{}", i + 1),
            CopyTarget::Title => "title".to_string(),
            CopyTarget::Description => "desc".to_string(),
            CopyTarget::Tags => "tags".to_string(),
            CopyTarget::AllMetadata => "all-meta".to_string(),
        }
    }

    pub fn text(&self, storyboard: &Storyboard) -> Option<String> {
        match self {
            CopyTarget::Scene(i) => storyboard.scenes.get(*i).map(|s| s.text.clone()),
            CopyTarget::Title => storyboard.metadata.as_ref().map(|m| m.title.clone()),
            CopyTarget::Description => storyboard.metadata.as_ref().map(|m| m.description.clone()),
            CopyTarget::Tags => storyboard.metadata.as_ref().map(|m| m.tags.clone()),
            CopyTarget::AllMetadata => storyboard.metadata.as_ref().map(|m| m.combined()),
        }
    }

    /// Every target that has text in `storyboard`, scenes first.
    pub fn available(storyboard: &Storyboard) -> Vec<CopyTarget> {
        let mut targets: Vec<CopyTarget> = (0..storyboard.scenes.len()).map(CopyTarget::Scene).collect();
        if storyboard.metadata.is_some() {
            targets.extend([
                CopyTarget::Title,
                CopyTarget::Description,
                CopyTarget::Tags,
                CopyTarget::AllMetadata,
            ]);
        }
        targets
    }
}

impl std::fmt::Display for CopyTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CopyTarget::Scene(i) => write!(f, "Scene {}", i + 1),
            CopyTarget::Title => f.write_str("Title"),
            CopyTarget::Description => f.write_str("Description"),
            CopyTarget::Tags => f.write_str("Tags"),
            CopyTarget::AllMetadata => f.write_str("All metadata"),
        }
    }
}

/// Identifiers copied during the current run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyTracker {
    copied: HashSet<String>,
}

impl CopyTracker {
    /// Hands `text` to the clipboard and marks `id` as copied. Clipboard
    /// failures are logged, never returned.
    pub fn copy(&mut self, clipboard: &dyn Clipboard, id: &str, text: &str) {
        if let Err(e) = clipboard.write_text(text) {
            log::warn!("Clipboard write for '{}' failed: {:#}", id, e);
        }
        self.copied.insert(id.to_string());
    }

    pub fn is_copied(&self, id: &str) -> bool {
        self.copied.contains(id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::storyboard::{SceneBoard, YoutubeMetadata};
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct MemoryClipboard {
        pub(crate) texts: Mutex<Vec<String>>,
    }

    impl Clipboard for MemoryClipboard {
        fn write_text(&self, text: &str) -> Result<()> {
            self.texts.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct BrokenClipboard;

    impl Clipboard for BrokenClipboard {
        fn write_text(&self, _text: &str) -> Result<()> {
            Err(anyhow::anyhow!("no display"))
        }
    }

    fn storyboard() -> Storyboard {
        Storyboard {
            scenes: SceneBoard::from_texts(["one", "two"]),
            metadata: Some(YoutubeMetadata {
                title: "T".to_string(),
                description: "D".to_string(),
                tags: "#x".to_string(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_targets_and_text() {
        let board = storyboard();
        let targets = CopyTarget::available(&board);
        assert_eq!(targets.len(), 6);
        assert_eq!(targets[1].id(), "scene-2");
        assert_eq!(targets[1].text(&board).as_deref(), Some("two"));
        assert_eq!(CopyTarget::AllMetadata.text(&board).as_deref(), Some("T\n\nD\n\n#x"));
        assert!(CopyTarget::Scene(9).text(&board).is_none());
        assert!(CopyTarget::available(&Storyboard::default()).is_empty());
    }

    #[test]
    fn test_tracker_marks_even_when_clipboard_fails() {
        let mut tracker = CopyTracker::default();
        let clipboard = MemoryClipboard::default();

        tracker.copy(&clipboard, "title", "T");
        tracker.copy(&BrokenClipboard, "tags", "#x");

        assert!(tracker.is_copied("title"));
        assert!(tracker.is_copied("tags"));
        assert!(!tracker.is_copied("desc"));
        assert_eq!(*clipboard.texts.lock().unwrap(), vec!["T".to_string()]);
    }
}
