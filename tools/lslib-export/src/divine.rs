//! Divine (LSLib command line) converter invocation.
//!
//! GR2 is never read or written directly: documents go through `Divine`
//! in `convert-model` mode, and its output is checked for fatal messages
//! since older LSLib versions report some failures with a zero exit code.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use lslib_profile::GameId;
use serde::Deserialize;
use thiserror::Error;

use crate::document::DocumentFormat;

/// Name of the converter executable looked up on `PATH`.
pub const DIVINE_EXE: &str = "Divine";

const GLB_UNSUPPORTED: &str = "[FATAL] Value glb is not allowed";

/// `[converter]` section of `lslib.toml`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConverterSettings {
    /// Path to the Divine executable. Looked up on `PATH` when unset.
    pub path: Option<PathBuf>,
    /// Ignore UVs that fail to form a triangle instead of failing
    pub ignore_uv_nan: bool,
    pub x_flip_meshes: bool,
    /// Mirror left (`_l`) and right (`_r`) bones
    pub mirror_skeletons: bool,
    /// Convert Y-up documents to the game's basis on export
    pub yup_conversion: bool,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            path: None,
            ignore_uv_nan: false,
            x_flip_meshes: false,
            mirror_skeletons: false,
            yup_conversion: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("LSLib path was not set up and Divine was not found on PATH. Cannot convert to GR2.")]
    NotConfigured,

    #[error("The LSLib path {} is invalid. Cannot convert to GR2.", .0.display())]
    InvalidPath(PathBuf),

    #[error("No target game selected. Cannot convert to GR2.")]
    UnsetGame,

    #[error("Failed to launch lslib: {0}")]
    Launch(#[source] std::io::Error),

    #[error("LSLib v1.20 or later is required for glTF support")]
    GltfUnsupported,

    #[error("Failed to convert GR2 (see the message log for more details). {message}")]
    Failed { code: Option<i32>, message: String },
}

/// Locate the converter executable.
///
/// A configured path must point to an existing file; an empty or missing
/// one falls back to a `PATH` lookup.
pub fn resolve_path(configured: Option<&Path>) -> Result<PathBuf, ConvertError> {
    match configured {
        Some(path) if !path.as_os_str().is_empty() => {
            if path.is_file() {
                Ok(path.to_path_buf())
            } else {
                Err(ConvertError::InvalidPath(path.to_path_buf()))
            }
        }
        _ => which::which(DIVINE_EXE).map_err(|_| ConvertError::NotConfigured),
    }
}

/// A resolved Divine executable plus the options passed on every run
#[derive(Debug, Clone)]
pub struct Converter {
    exe: PathBuf,
    settings: ConverterSettings,
}

impl Converter {
    pub fn new(settings: ConverterSettings) -> Result<Self, ConvertError> {
        let exe = resolve_path(settings.path.as_deref())?;
        Ok(Self { exe, settings })
    }

    pub fn executable(&self) -> &Path {
        &self.exe
    }

    pub fn settings(&self) -> &ConverterSettings {
        &self.settings
    }

    /// Arguments converting `src` (a `format` document) to GR2 at `dst`.
    pub fn export_args(
        &self,
        game: GameId,
        src: &Path,
        dst: &Path,
        format: DocumentFormat,
    ) -> Result<Vec<OsString>, ConvertError> {
        let game = game.converter_arg().ok_or(ConvertError::UnsetGame)?;

        let mut args = base_args(game, src, dst, format.converter_name(), "gr2");
        let options = [
            (self.settings.ignore_uv_nan, "ignore-uv-nan"),
            (self.settings.x_flip_meshes, "x-flip-meshes"),
            (self.settings.mirror_skeletons, "mirror-skeletons"),
            (self.settings.yup_conversion, "apply-basis-transforms"),
        ];
        push_options(&mut args, &options);
        Ok(args)
    }

    /// Arguments converting the GR2 at `src` to a `format` document at `dst`.
    ///
    /// Import always runs in BG3 mode, which reads every GR2 flavour.
    pub fn import_args(&self, src: &Path, dst: &Path, format: DocumentFormat) -> Vec<OsString> {
        let mut args = base_args("bg3", src, dst, "gr2", format.converter_name());
        push_options(&mut args, &[(true, "flip-uvs")]);
        let options = [
            (self.settings.x_flip_meshes, "x-flip-meshes"),
            (self.settings.mirror_skeletons, "mirror-skeletons"),
        ];
        push_options(&mut args, &options);
        args
    }

    pub fn export_gr2(
        &self,
        game: GameId,
        src: &Path,
        dst: &Path,
        format: DocumentFormat,
    ) -> Result<(), ConvertError> {
        let args = self.export_args(game, src, dst, format)?;
        self.run(&args)
    }

    pub fn import_gr2(
        &self,
        src: &Path,
        dst: &Path,
        format: DocumentFormat,
    ) -> Result<(), ConvertError> {
        let args = self.import_args(src, dst, format);
        self.run(&args)
    }

    fn run(&self, args: &[OsString]) -> Result<(), ConvertError> {
        tracing::info!("Starting GR2 conversion using {}", self.exe.display());
        tracing::debug!("Sending command: {:?} {:?}", self.exe, args);

        let output = Command::new(&self.exe)
            .args(args)
            .output()
            .map_err(ConvertError::Launch)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!("STDOUT: {}", stdout);
        if !stderr.is_empty() {
            tracing::debug!("STDERR: {}", stderr);
        }

        check_output(output.status.success(), output.status.code(), &stdout, &stderr)
    }
}

fn base_args(game: &str, src: &Path, dst: &Path, input: &str, output: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["--loglevel", "all", "-g", game, "-s"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(src.into());
    args.push("-d".into());
    args.push(dst.into());
    args.extend(
        ["-i", input, "-o", output, "-a", "convert-model"]
            .into_iter()
            .map(OsString::from),
    );
    args
}

fn push_options(args: &mut Vec<OsString>, options: &[(bool, &str)]) {
    for &(enabled, option) in options {
        if enabled {
            args.push("-e".into());
            args.push(option.into());
        }
    }
}

/// Classify a finished converter run.
pub(crate) fn check_output(
    success: bool,
    code: Option<i32>,
    stdout: &str,
    stderr: &str,
) -> Result<(), ConvertError> {
    if success && !stdout.starts_with("[FATAL] ") {
        return Ok(());
    }

    if stdout.starts_with(GLB_UNSUPPORTED) {
        return Err(ConvertError::GltfUnsupported);
    }

    let mut message = stderr.to_string();
    if !message.is_empty() {
        message.push('\n');
    }
    if let Some(last) = stdout.lines().last() {
        message.push_str(last);
    }
    Err(ConvertError::Failed { code, message })
}
