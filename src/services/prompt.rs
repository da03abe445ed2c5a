//! Instruction text sent to the generation service.

use crate::core::storyboard::CharacterProfile;
use crate::core::style::VisualStyle;

pub const MIN_SCENES: u32 = 1;
pub const MAX_SCENES: u32 = 20;

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are the Storyboard Engine, an absolute consistency architect. \
Your job is to create a single visual identity that never changes from frame to frame.

CONSISTENCY PROCEDURE:
1. ANALYZE the video to find the main character. If there are several, pick the most dominant one.
2. WRITE [CHARACTER_PROFILE] as the master identity spec. It must cover ethnicity, face shape, hair color and style in detail, eye color, skin texture and CLOTHING DETAILS (colors, materials, accessories).
3. EVERY [SCENE] must open with a summary of that identity before describing the action.

OUTPUT STRUCTURE (EXACT):

[STORY_BLUEPRINT]
HOOK: [analysis of the opening]
PACING: [analysis of the rhythm]
MOOD: [color and lighting]
EXPANSION: [story twist]

[CHARACTER_PROFILE]
[Master technical description in English. Example: 'A 25-year-old Caucasian male, sharp jawline, short messy raven hair, piercing ice-blue eyes, wearing a weathered tan canvas field jacket over a charcoal grey hoodie, silver industrial ring on right index finger.']

[SCENE 1]
[Detailed visual description starting with the character's identity, followed by the action and the exact environment, in English.]

[YOUTUBE_METADATA]
Title: [viral title, no asterisks]
Description: [SEO description, no asterisks]
Tags: [relevant tags separated by spaces, no asterisks]

HARD RULES:
- Do NOT use asterisks (*) or markdown bold in Title, Description or Tags.
- Do NOT use generic terms like 'a man' or 'the girl' in scenes. Use the specific description from the profile.
- Clothing must NOT change between scenes.
- There must be NO TEXT or lettering in the images.";

pub fn clamp_scene_count(requested: u32) -> u32 {
    requested.clamp(MIN_SCENES, MAX_SCENES)
}

/// Builds the single text-generation prompt for a run. Pure function of the
/// scene count, which is clamped to `MIN_SCENES..=MAX_SCENES` first.
pub fn build_storyboard_prompt(scene_count: u32) -> String {
    let n = clamp_scene_count(scene_count);
    let scene_range = if n == 1 {
        "[SCENE 1]".to_string()
    } else {
        format!("[SCENE 1] to [SCENE {}]", n)
    };

    format!(
        "LOOK CLOSELY AT THE VIDEO FILE PROVIDED.\n\
         1. EXTRACT the most dominant character's exact physical identity.\n\
         2. CREATE a Technical Identity Spec in [CHARACTER_PROFILE] (English). Be extremely specific about facial features, hair, and clothing layers.\n\
         3. DESIGN exactly {n} scenes {scene_range} that mirror the video's core but improve it.\n\
         4. ENSURE every scene description starts by reinforcing the character's identity for absolute consistency.\n\
         5. PROVIDE [YOUTUBE_METADATA] with Title, Description and Tags. Do NOT use asterisks (*) or any markdown emphasis in the title, description or tags. Make the metadata highly relevant and appealing to a broad audience.\n\
         \n\
         CHARACTER CONSISTENCY IS MANDATORY. The subject must never change across scenes."
    )
}

/// Builds the image prompt for one scene. The profile is stated twice: once
/// as the consistency anchor and once inside the mandatory rules.
pub fn build_scene_image_prompt(
    scene_text: &str,
    profile: &CharacterProfile,
    style: &VisualStyle,
) -> String {
    let profile = profile.as_str();
    format!(
        "TASK: Generate a high-quality visual for a cinematic storyboard.\n\
         SCENE: {scene_text}\n\
         CHARACTER CONSISTENCY: {profile}\n\
         STYLE: {style_prompt}\n\
         \n\
         MANDATORY RULES:\n\
         1. NO TEXT, NO LETTERS, NO NUMBERS, NO CAPTIONS, NO SUBTITLES, NO WATERMARKS in the image.\n\
         2. Ensure the main character exactly matches the description: {profile}.\n\
         3. The image must be purely visual and cinematic.",
        style_prompt = style.prompt,
    )
}
