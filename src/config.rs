//! Configuration types for batch reframing operations

use crate::error::{ReframeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Canvas edge length used when a target dimension is zero or unset
pub const DEFAULT_TARGET_SIZE: u32 = 512;

/// Template used when none is configured
pub const DEFAULT_FILENAME_TEMPLATE: &str = "{name}.{ext}";

/// Rule for mapping a source image onto the target canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitPolicy {
    /// Scale to fit entirely inside the canvas, centered, no cropping
    #[default]
    Contain,
    /// Scale to cover the canvas, cropping overflow symmetrically
    Cover,
    /// Same geometry as `Cover`
    Crop,
}

impl std::fmt::Display for FitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contain => write!(f, "contain"),
            Self::Cover => write!(f, "cover"),
            Self::Crop => write!(f, "crop"),
        }
    }
}

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG (no transparency, composited over an opaque fill)
    Jpeg,
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// Lossy WebP with alpha channel transparency
    WebP,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jpeg => write!(f, "jpeg"),
            Self::Png => write!(f, "png"),
            Self::WebP => write!(f, "webp"),
        }
    }
}

/// Named canvas presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    /// Lookup key used on the command line and in config files
    pub key: &'static str,
    /// Label substituted for `{preset}` in filename templates
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Built-in presets
pub const PRESETS: &[Preset] = &[
    Preset {
        key: "square-512",
        label: "square",
        width: 512,
        height: 512,
    },
    Preset {
        key: "instagram-square",
        label: "instagram-square",
        width: 1080,
        height: 1080,
    },
    Preset {
        key: "instagram-portrait",
        label: "instagram-portrait",
        width: 1080,
        height: 1350,
    },
    Preset {
        key: "story",
        label: "story",
        width: 1080,
        height: 1920,
    },
    Preset {
        key: "thumbnail",
        label: "thumb",
        width: 256,
        height: 256,
    },
];

impl Preset {
    /// Look up a built-in preset by key (case-insensitive)
    #[must_use]
    pub fn find(key: &str) -> Option<&'static Preset> {
        PRESETS.iter().find(|p| p.key.eq_ignore_ascii_case(key))
    }

    /// Like [`Preset::find`], but an unknown key is an error listing the
    /// available keys
    ///
    /// # Errors
    ///
    /// Returns `ReframeError::InvalidConfig` for unknown keys.
    pub fn lookup(key: &str) -> Result<&'static Preset> {
        Self::find(key).ok_or_else(|| {
            let known: Vec<&str> = PRESETS.iter().map(|p| p.key).collect();
            ReframeError::invalid_config(format!(
                "Unknown preset '{key}'. Available: {}",
                known.join(", ")
            ))
        })
    }
}

/// Options shared by every image in one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Target canvas width (0 = default)
    pub target_width: u32,
    /// Target canvas height (0 = default)
    pub target_height: u32,
    /// Fit policy
    pub fit: FitPolicy,
    /// Corner radius in pixels, clamped to half the shorter canvas edge
    pub corner_radius: u32,
    /// Requested output format
    pub output_format: OutputFormat,
    /// Encoder quality (0-100, ignored for PNG)
    pub quality: u8,
    /// Strip the background before encoding
    pub remove_background: bool,
    /// Output filename template
    pub filename_template: String,
    /// Active preset label, substituted for `{preset}`
    pub preset_label: Option<String>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_TARGET_SIZE,
            target_height: DEFAULT_TARGET_SIZE,
            fit: FitPolicy::Contain,
            corner_radius: 0,
            output_format: OutputFormat::Png,
            quality: 90,
            remove_background: false,
            filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
            preset_label: None,
        }
    }
}

impl TransformOptions {
    /// Create a new options builder
    #[must_use]
    pub fn builder() -> TransformOptionsBuilder {
        TransformOptionsBuilder::new()
    }

    /// Load options from a JSON file
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let options: Self = serde_json::from_str(&content).map_err(|e| {
            ReframeError::invalid_config(format!(
                "Failed to parse options file '{}': {e}",
                path.as_ref().display()
            ))
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Canvas size with zero dimensions replaced by the default
    #[must_use]
    pub fn canvas_size(&self) -> (u32, u32) {
        let or_default = |v: u32| if v == 0 { DEFAULT_TARGET_SIZE } else { v };
        (or_default(self.target_width), or_default(self.target_height))
    }

    /// Format actually written
    ///
    /// JPEG cannot carry transparency, so background removal forces PNG.
    #[must_use]
    pub fn effective_format(&self) -> OutputFormat {
        if self.remove_background && self.output_format == OutputFormat::Jpeg {
            OutputFormat::Png
        } else {
            self.output_format
        }
    }

    /// Corner radius clamped to half the shorter canvas edge
    #[must_use]
    pub fn effective_corner_radius(&self) -> u32 {
        let (width, height) = self.canvas_size();
        self.corner_radius.min(width.min(height) / 2)
    }

    /// Options with every batch-wide normalization applied
    ///
    /// Zero dimensions become the default, the output format is coerced and
    /// the corner radius is clamped. Runs once, before any image is processed.
    #[must_use]
    pub fn resolved(&self) -> Self {
        let (target_width, target_height) = self.canvas_size();
        Self {
            target_width,
            target_height,
            corner_radius: self.effective_corner_radius(),
            output_format: self.effective_format(),
            ..self.clone()
        }
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(ReframeError::config_value_error(
                "quality",
                self.quality,
                "0-100",
            ));
        }
        Ok(())
    }
}

/// Builder for `TransformOptions`
pub struct TransformOptionsBuilder {
    options: TransformOptions,
    preset_key: Option<String>,
}

impl TransformOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: TransformOptions::default(),
            preset_key: None,
        }
    }

    #[must_use]
    pub fn target_size(mut self, width: u32, height: u32) -> Self {
        self.options.target_width = width;
        self.options.target_height = height;
        self
    }

    #[must_use]
    pub fn fit(mut self, fit: FitPolicy) -> Self {
        self.options.fit = fit;
        self
    }

    #[must_use]
    pub fn corner_radius(mut self, radius: u32) -> Self {
        self.options.corner_radius = radius;
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.options.output_format = format;
        self
    }

    #[must_use]
    pub fn quality(mut self, quality: u8) -> Self {
        self.options.quality = quality.clamp(0, 100);
        self
    }

    #[must_use]
    pub fn remove_background(mut self, remove: bool) -> Self {
        self.options.remove_background = remove;
        self
    }

    #[must_use]
    pub fn filename_template<S: Into<String>>(mut self, template: S) -> Self {
        self.options.filename_template = template.into();
        self
    }

    #[must_use]
    pub fn preset_label<S: Into<String>>(mut self, label: S) -> Self {
        self.options.preset_label = Some(label.into());
        self
    }

    /// Apply a named preset's canvas size and label
    #[must_use]
    pub fn preset<S: Into<String>>(mut self, key: S) -> Self {
        self.preset_key = Some(key.into());
        self
    }

    /// Build the options
    ///
    /// # Errors
    ///
    /// Returns `ReframeError` for:
    /// - Unknown preset keys
    /// - Invalid quality values (> 100)
    pub fn build(mut self) -> Result<TransformOptions> {
        if let Some(key) = self.preset_key.take() {
            let preset = Preset::lookup(&key)?;
            self.options.target_width = preset.width;
            self.options.target_height = preset.height;
            if self.options.preset_label.is_none() {
                self.options.preset_label = Some(preset.label.to_string());
            }
        }

        self.options.validate()?;
        Ok(self.options)
    }
}

impl Default for TransformOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
