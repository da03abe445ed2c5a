//! Splits the generation service's text answer into storyboard sections.
//!
//! The answer is tokenized on bracketed markers (`[STORY_BLUEPRINT]`,
//! `[CHARACTER_PROFILE]`, `[SCENE n]`, `[YOUTUBE_METADATA]`, any case, inner
//! whitespace ignored). A section runs from the end of its marker to the start
//! of the next recognized marker, or to the end of the text. Bracketed text that
//! is not a marker is ordinary content.
//!
//! Inside the blueprint and metadata sections, sub-fields are introduced by
//! `LABEL:` and run until the next known label of that section.

use crate::core::error::StudioError;
use crate::core::storyboard::{
    CharacterProfile, SceneBoard, StoryBlueprint, Storyboard, YoutubeMetadata, FALLBACK_TAGS,
    FALLBACK_TITLE,
};

/// Longest bracket body still considered as a marker candidate.
const MAX_MARKER_LEN: usize = 40;

const BLUEPRINT_LABELS: [&str; 4] = ["HOOK", "PACING", "MOOD", "EXPANSION"];
const METADATA_LABELS: [&str; 3] = ["TITLE", "DESCRIPTION", "TAGS"];

/// Stripped from the metadata block before its fields are read.
const EMPHASIS_CHARS: [char; 3] = ['*', '`', '~'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    Blueprint,
    CharacterProfile,
    Scene,
    Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Marker {
    kind: MarkerKind,
    /// Byte offset of `[`.
    start: usize,
    /// Byte offset just past `]`.
    end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub blueprint: Option<StoryBlueprint>,
    pub character_profile: CharacterProfile,
    pub scenes: Vec<String>,
    pub metadata: Option<YoutubeMetadata>,
}

impl ParsedResponse {
    pub fn into_storyboard(self) -> Storyboard {
        Storyboard {
            blueprint: self.blueprint,
            character_profile: Some(self.character_profile),
            scenes: SceneBoard::from_texts(self.scenes),
            metadata: self.metadata,
        }
    }
}

fn classify(body: &str) -> Option<MarkerKind> {
    let normalized = body.trim().to_ascii_uppercase();
    match normalized.as_str() {
        "STORY_BLUEPRINT" => return Some(MarkerKind::Blueprint),
        "CHARACTER_PROFILE" => return Some(MarkerKind::CharacterProfile),
        "YOUTUBE_METADATA" => return Some(MarkerKind::Metadata),
        _ => {}
    }
    let ordinal = normalized.strip_prefix("SCENE")?.trim();
    if !ordinal.is_empty() && ordinal.bytes().all(|b| b.is_ascii_digit()) {
        Some(MarkerKind::Scene)
    } else {
        None
    }
}

fn scan_markers(text: &str) -> Vec<Marker> {
    let bytes = text.as_bytes();
    let mut markers = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('[') {
        let start = pos + offset;
        let body_start = start + 1;
        let close = bytes[body_start..]
            .iter()
            .take(MAX_MARKER_LEN + 1)
            .position(|&b| b == b']' || b == b'[' || b == b'\n');

        match close {
            Some(len) if bytes[body_start + len] == b']' => {
                let end = body_start + len + 1;
                if let Some(kind) = classify(&text[body_start..body_start + len]) {
                    markers.push(Marker { kind, start, end });
                    pos = end;
                    continue;
                }
            }
            _ => {}
        }
        pos = body_start;
    }

    markers
}

/// The text owned by `markers[i]`.
fn section<'a>(text: &'a str, markers: &[Marker], i: usize) -> &'a str {
    let from = markers[i].end;
    let to = markers.get(i + 1).map_or(text.len(), |next| next.start);
    &text[from..to]
}

fn first_section<'a>(text: &'a str, markers: &[Marker], kind: MarkerKind) -> Option<&'a str> {
    let i = markers.iter().position(|m| m.kind == kind)?;
    Some(section(text, markers, i))
}

/// Matches `word` followed by optional blanks and a colon at `pos` of the
/// upper-cased text. Returns the offset just past the colon.
fn match_label(upper: &str, pos: usize, word: &str) -> Option<usize> {
    let bytes = upper.as_bytes();
    if pos > 0 {
        let prev = bytes[pos - 1];
        if prev.is_ascii_alphanumeric() || prev == b'_' {
            return None;
        }
    }
    let mut cursor = pos + word.len();
    while cursor < bytes.len() && (bytes[cursor] == b' ' || bytes[cursor] == b'\t') {
        cursor += 1;
    }
    (bytes.get(cursor) == Some(&b':')).then_some(cursor + 1)
}

/// Reads `LABEL: value` fields out of `block`. Each value is bounded by the
/// next occurrence of any label in `labels`. The first occurrence of a label
/// wins; absent labels yield `None`.
fn extract_fields<const N: usize>(block: &str, labels: [&str; N]) -> [Option<String>; N] {
    // ASCII upper-casing keeps byte offsets identical to `block`.
    let upper = block.to_ascii_uppercase();

    let mut hits: Vec<(usize, usize, usize)> = Vec::new(); // (start, value_start, label)
    for (label_idx, word) in labels.iter().enumerate() {
        for (pos, _) in upper.match_indices(word) {
            if let Some(value_start) = match_label(&upper, pos, word) {
                hits.push((pos, value_start, label_idx));
            }
        }
    }
    hits.sort_unstable();

    let mut fields: [Option<String>; N] = std::array::from_fn(|_| None);
    for (i, &(_, value_start, label_idx)) in hits.iter().enumerate() {
        if fields[label_idx].is_some() {
            continue;
        }
        let value_end = hits[i + 1..]
            .iter()
            .find(|(start, _, _)| *start >= value_start)
            .map_or(block.len(), |(start, _, _)| *start);
        fields[label_idx] = Some(block[value_start..value_end].trim().to_string());
    }
    fields
}

fn parse_blueprint(block: &str) -> StoryBlueprint {
    let [hook, pacing, mood, expansion] = extract_fields(block, BLUEPRINT_LABELS);
    StoryBlueprint {
        hook: hook.unwrap_or_default(),
        pacing: pacing.unwrap_or_default(),
        mood: mood.unwrap_or_default(),
        expansion: expansion.unwrap_or_default(),
    }
}

pub fn strip_emphasis(text: &str) -> String {
    text.chars().filter(|c| !EMPHASIS_CHARS.contains(c)).collect()
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn parse_metadata(block: &str) -> YoutubeMetadata {
    let clean = strip_emphasis(block);
    let [title, description, tags] = extract_fields(&clean, METADATA_LABELS);
    YoutubeMetadata {
        title: non_empty_or(title, FALLBACK_TITLE),
        description: description.unwrap_or_default(),
        tags: non_empty_or(tags, FALLBACK_TAGS),
    }
}

/// Parses one generation response. Missing sections degrade to defaults;
/// the only failure is a response without any `[SCENE n]` section.
pub fn parse_response(text: &str) -> Result<ParsedResponse, StudioError> {
    let markers = scan_markers(text);

    let scenes: Vec<String> = markers
        .iter()
        .enumerate()
        .filter(|(_, m)| m.kind == MarkerKind::Scene)
        .map(|(i, _)| section(text, &markers, i).trim().to_string())
        .collect();

    if scenes.is_empty() {
        return Err(StudioError::NoScenesDetected);
    }

    let blueprint = first_section(text, &markers, MarkerKind::Blueprint).map(parse_blueprint);
    let character_profile = first_section(text, &markers, MarkerKind::CharacterProfile)
        .map_or_else(CharacterProfile::fallback, CharacterProfile::new);
    let metadata = first_section(text, &markers, MarkerKind::Metadata).map(parse_metadata);

    Ok(ParsedResponse {
        blueprint,
        character_profile,
        scenes,
        metadata,
    })
}
