use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualStyle {
    pub id: &'static str,
    pub name: &'static str,
    pub prompt: &'static str,
}

impl fmt::Display for VisualStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub const VISUAL_STYLES: &[VisualStyle] = &[
    VisualStyle {
        id: "realistic",
        name: "Realistic",
        prompt: "Hyper-realistic photography, high fidelity textures, cinematic natural lighting, 8k resolution, professional camera lens look.",
    },
    VisualStyle {
        id: "3d_cartoon_realistic",
        name: "3D Cartoon Realistic",
        prompt: "High-end 3D CGI animation, realistic fur and material physics, volumetric lighting, ray-traced shadows, modern studio animated film style.",
    },
    VisualStyle {
        id: "pixar",
        name: "3D Pixar",
        prompt: "Soft 3D animation style, rounded shapes, vibrant colors, expressive character designs, warm lighting.",
    },
    VisualStyle {
        id: "clay",
        name: "Claymation",
        prompt: "Tactile stop-motion claymation, detailed fingerprints on clay, handmade aesthetic, soft studio lighting.",
    },
    VisualStyle {
        id: "neon",
        name: "Cyberpunk",
        prompt: "Glowy neon aesthetic, futuristic atmosphere, high contrast lighting, magenta and cyan color palette.",
    },
];

pub fn find_style(id: &str) -> Option<&'static VisualStyle> {
    VISUAL_STYLES.iter().find(|s| s.id.eq_ignore_ascii_case(id))
}

pub fn default_style() -> &'static VisualStyle {
    &VISUAL_STYLES[0]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9", alias = "wide")]
    Wide,
    #[serde(rename = "9:16", alias = "vertical")]
    Vertical,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 2] = [AspectRatio::Wide, AspectRatio::Vertical];

    /// The ratio tag the image service expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Wide => "16:9",
            AspectRatio::Vertical => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectRatio::Wide => write!(f, "Wide ({})", self.as_str()),
            AspectRatio::Vertical => write!(f, "Vertical ({})", self.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_style() {
        assert_eq!(find_style("NEON").map(|s| s.name), Some("Cyberpunk"));
        assert!(find_style("watercolor").is_none());
        assert_eq!(default_style().id, "realistic");
    }

    #[test]
    fn test_aspect_ratio_parsing() {
        let parsed: AspectRatio = serde_yaml_ng::from_str("\"9:16\"").unwrap();
        assert_eq!(parsed, AspectRatio::Vertical);
        assert_eq!(serde_json::to_string(&AspectRatio::Wide).unwrap(), "\"16:9\"");
    }
}
