//! Conversion of CLI arguments into transform options

use crate::cli::main_impl::{Cli, CliFitPolicy, CliOutputFormat};
use crate::config::{FitPolicy, OutputFormat, Preset, TransformOptions};
use anyhow::{Context, Result};

impl From<CliFitPolicy> for FitPolicy {
    fn from(fit: CliFitPolicy) -> Self {
        match fit {
            CliFitPolicy::Contain => FitPolicy::Contain,
            CliFitPolicy::Cover => FitPolicy::Cover,
            CliFitPolicy::Crop => FitPolicy::Crop,
        }
    }
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Png => OutputFormat::Png,
            CliOutputFormat::Jpeg => OutputFormat::Jpeg,
            CliOutputFormat::Webp => OutputFormat::WebP,
        }
    }
}

/// Convert CLI arguments to `TransformOptions`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build options from CLI arguments
    ///
    /// Precedence, lowest first: defaults, `--config` file, `--preset`,
    /// individual flags.
    pub(crate) fn from_cli(cli: &Cli) -> Result<TransformOptions> {
        let mut options = match &cli.config {
            Some(path) => TransformOptions::from_json_file(path)
                .with_context(|| format!("Failed to load options from {}", path.display()))?,
            None => TransformOptions::default(),
        };

        if let Some(key) = &cli.preset {
            let preset = Preset::lookup(key).context("Invalid --preset")?;
            options.target_width = preset.width;
            options.target_height = preset.height;
            options.preset_label = Some(preset.label.to_string());
        }

        if let Some(width) = cli.width {
            options.target_width = width;
        }
        if let Some(height) = cli.height {
            options.target_height = height;
        }
        if let Some(fit) = cli.fit {
            options.fit = fit.into();
        }
        if let Some(format) = cli.format {
            options.output_format = format.into();
        }
        if let Some(quality) = cli.quality {
            options.quality = quality;
        }
        if let Some(radius) = cli.corner_radius {
            options.corner_radius = radius;
        }
        if cli.remove_background {
            options.remove_background = true;
        }
        if let Some(template) = &cli.template {
            options.filename_template.clone_from(template);
        }

        options.validate().context("Invalid options")?;
        Ok(options)
    }
}
