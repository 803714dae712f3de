//! Configuration for diploma verification and extraction.

use crate::extract::AttributeRequirements;
use serde::Deserialize;
use std::path::PathBuf;

/// Verification and extraction configuration.
///
/// Deserializable with every field optional, so a host service can read it
/// from its own configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiplomaConfig {
    /// Directory of trusted certificates (`*.pem`, `*.crt`, `*.cer`, `*.der`).
    pub cert_dir: PathBuf,

    /// Where the renderer writes intermediates. System temp dir when `None`.
    pub tmp_dir: Option<PathBuf>,

    /// Keep renderer intermediates for inspection.
    pub keep_output: bool,

    /// Let the renderer's own output through to the console.
    pub debug: bool,

    /// Renderer executable.
    pub renderer_program: PathBuf,

    /// Required-attribute policy.
    pub requirements: AttributeRequirements,
}

impl Default for DiplomaConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DiplomaConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            cert_dir: PathBuf::from("certs"),
            tmp_dir: None,
            keep_output: false,
            debug: false,
            renderer_program: PathBuf::from("pdf2htmlEX"),
            requirements: AttributeRequirements::default(),
        }
    }

    pub fn with_cert_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cert_dir = dir.into();
        self
    }

    pub fn with_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = Some(dir.into());
        self
    }

    pub fn with_keep_output(mut self, keep: bool) -> Self {
        self.keep_output = keep;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_renderer_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.renderer_program = program.into();
        self
    }

    pub fn with_requirements(mut self, requirements: AttributeRequirements) -> Self {
        self.requirements = requirements;
        self
    }
}
