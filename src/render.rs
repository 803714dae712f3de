//! Rendering verified PDF bytes into a DOM.
//!
//! Extraction works on the layout a PDF-to-HTML converter produces, not on
//! the PDF itself. [`Renderer`] is the seam; [`Pdf2HtmlEx`] runs the
//! `pdf2htmlEX` tool, which only reads from and writes to files.

use crate::config::DiplomaConfig;
use crate::dom::{parse_html, Document};
use crate::error::{Error, ErrorKind, Result};
use crate::signatures::TrustedDocument;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};

const OP: &str = "render PDF";

/// Turns trusted PDF bytes into a DOM with a `page-container` element.
pub trait Renderer {
    fn render(&self, trusted: &TrustedDocument) -> Result<Document>;
}

/// Renderer backed by the `pdf2htmlEX` command-line tool.
#[derive(Debug, Clone)]
pub struct Pdf2HtmlEx {
    program: PathBuf,
    tmp_dir: Option<PathBuf>,
    keep_output: bool,
    debug: bool,
}

impl Default for Pdf2HtmlEx {
    fn default() -> Self {
        Self::new()
    }
}

impl Pdf2HtmlEx {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("pdf2htmlEX"),
            tmp_dir: None,
            keep_output: false,
            debug: false,
        }
    }

    pub fn from_config(config: &DiplomaConfig) -> Self {
        Self {
            program: config.renderer_program.clone(),
            tmp_dir: config.tmp_dir.clone(),
            keep_output: config.keep_output,
            debug: config.debug,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Directory for intermediates; the system temp dir when unset.
    pub fn with_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = Some(dir.into());
        self
    }

    /// Leave the PDF and HTML intermediates on disk.
    pub fn with_keep_output(mut self, keep: bool) -> Self {
        self.keep_output = keep;
        self
    }

    /// Pass the tool's own output through to the console.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn failed(reason: impl Into<crate::error::Cause>) -> Error {
        Error::new(OP, ErrorKind::Render).with_cause(reason)
    }
}

impl Renderer for Pdf2HtmlEx {
    fn render(&self, trusted: &TrustedDocument) -> Result<Document> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("duo-verified-");
        let work_dir = match &self.tmp_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
        .map_err(|e| Error::from(e).context(OP))?;

        let input = work_dir.path().join("diploma.pdf");
        let output = "diploma.html";
        fs::write(&input, trusted.as_bytes()).map_err(|e| Error::from(e).context(OP))?;

        let mut command = Command::new(&self.program);
        command
            .arg("--process-nontext")
            .arg("0")
            .arg("--dest-dir")
            .arg(work_dir.path())
            .arg(&input)
            .arg(output);
        if !self.debug {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }
        log::debug!("Running {:?}", command);

        let status = command.status().map_err(Self::failed)?;
        if !status.success() {
            return Err(Self::failed(format!("{} exited with {}", self.program.display(), status)));
        }

        let html = fs::read_to_string(work_dir.path().join(output))
            .map_err(|e| Error::from(e).context(OP))?;

        if self.keep_output {
            let kept = work_dir.keep();
            log::info!("Keeping renderer output in {}", kept.display());
        }

        parse_html(&html).map_err(|e| e.context(OP))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program() {
        let renderer = Pdf2HtmlEx::new().with_program("/nonexistent/pdf2htmlEX");
        let trusted = TrustedDocument::new(b"%PDF-1.7\n".to_vec());
        let err = renderer.render(&trusted).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Render);
        assert_eq!(err.op(), "render PDF");
    }

    #[cfg(unix)]
    #[test]
    fn test_renders_with_fake_tool() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-pdf2htmlEX");
        // Arguments: --process-nontext 0 --dest-dir DIR IN OUT
        fs::write(
            &script,
            "#!/bin/sh\nprintf '<html><body><div id=\"page-container\"><div>p1</div></div></body></html>' > \"$4/$6\"\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        let renderer = Pdf2HtmlEx::new()
            .with_program(&script)
            .with_tmp_dir(out_dir.path());
        let doc = renderer.render(&TrustedDocument::new(b"%PDF".to_vec())).unwrap();
        assert_eq!(doc.pages().unwrap().len(), 1);
        // Intermediates are removed.
        assert_eq!(fs::read_dir(out_dir.path()).unwrap().count(), 0);

        let kept = renderer.with_keep_output(true);
        kept.render(&TrustedDocument::new(b"%PDF".to_vec())).unwrap();
        let dirs: Vec<_> = fs::read_dir(out_dir.path()).unwrap().map(|e| e.unwrap().path()).collect();
        assert_eq!(dirs.len(), 1);
        assert!(dirs[0].join("diploma.pdf").is_file());
        assert!(dirs[0].join("diploma.html").is_file());
    }
}
