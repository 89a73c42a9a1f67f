//! Room and motion presets for video generation, and prompt enhancement.

use serde::{Deserialize, Serialize};

/// Frames sent to the decoder per chunk.
pub const DECODE_CHUNK_SIZE: u32 = 2;
/// Diffusion steps for video generation.
pub const VIDEO_INFERENCE_STEPS: u32 = 10;
/// Fixed seed so the same input animates the same way.
pub const VIDEO_SEED: u64 = 42;
/// Edge length the source image is resized to before animation.
pub const VIDEO_INPUT_SIZE: u32 = 384;

/// Room the source image shows. Unknown names fall back to the living room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    LivingRoom,
    Bedroom,
    Kitchen,
    Bathroom,
    Office,
    DiningRoom,
    Exterior,
}

impl RoomType {
    /// Parse leniently: anything unrecognised is a living room.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "bedroom" => Self::Bedroom,
            "kitchen" => Self::Kitchen,
            "bathroom" => Self::Bathroom,
            "office" => Self::Office,
            "dining_room" => Self::DiningRoom,
            "exterior" => Self::Exterior,
            _ => Self::LivingRoom,
        }
    }

    /// (base motion bucket, frames, fps)
    fn preset(&self) -> (i32, u32, u32) {
        match self {
            Self::LivingRoom => (85, 14, 7),
            Self::Bedroom => (70, 14, 6),
            Self::Kitchen => (95, 14, 8),
            Self::Bathroom => (75, 14, 6),
            Self::Office => (80, 14, 7),
            Self::DiningRoom => (90, 14, 7),
            Self::Exterior => (100, 14, 8),
        }
    }
}

/// How much camera/scene motion to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionStyle {
    Subtle,
    Moderate,
    Dynamic,
    Showcase,
}

impl MotionStyle {
    /// Parse leniently: anything unrecognised is moderate.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "subtle" => Self::Subtle,
            "dynamic" => Self::Dynamic,
            "showcase" => Self::Showcase,
            _ => Self::Moderate,
        }
    }

    fn offset(&self) -> i32 {
        match self {
            Self::Subtle => -15,
            Self::Moderate => 0,
            Self::Dynamic => 20,
            Self::Showcase => 35,
        }
    }
}

/// Everything a video backend needs besides the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSettings {
    pub motion_bucket_id: u8,
    pub num_frames: u32,
    pub fps: u32,
    pub num_inference_steps: u32,
    pub decode_chunk_size: u32,
    pub seed: u64,
    pub enhance_lighting: bool,
    pub adjust_contrast: bool,
}

impl VideoSettings {
    pub fn new(room: RoomType, motion: MotionStyle) -> Self {
        let (base, frames, fps) = room.preset();
        let bucket = (base + motion.offset()).clamp(0, 255) as u8;
        Self {
            motion_bucket_id: bucket,
            num_frames: frames,
            fps,
            num_inference_steps: VIDEO_INFERENCE_STEPS,
            decode_chunk_size: DECODE_CHUNK_SIZE,
            seed: VIDEO_SEED,
            enhance_lighting: true,
            adjust_contrast: true,
        }
    }

    /// Resolve from free-form request strings.
    pub fn resolve(room_type: &str, motion_style: &str) -> Self {
        Self::new(RoomType::parse(room_type), MotionStyle::parse(motion_style))
    }

    pub fn with_preprocessing(mut self, enhance_lighting: bool, adjust_contrast: bool) -> Self {
        self.enhance_lighting = enhance_lighting;
        self.adjust_contrast = adjust_contrast;
        self
    }

    /// Clip length in seconds.
    pub fn duration(&self) -> f64 {
        self.num_frames as f64 / self.fps as f64
    }
}

/// Wrap a user prompt with the interior-photography style suffix.
pub fn enhance_prompt(prompt: &str) -> String {
    format!(
        "interior design, {}, professional photography, 8k, detailed, high quality",
        prompt.trim()
    )
}
