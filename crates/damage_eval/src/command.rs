//! A classifier backed by an external program.

use crate::classifier::{ClassifierError, DamageClassifier, ASSESSMENT_PROMPT};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Runs `program [args..] <pre-image> <post-image>` once per pair.
///
/// The assessment prompt is written to the program's stdin and its stdout is
/// taken as the raw label. A non-zero exit status is a request failure.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandClassifier {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn run(&self, pre: &Path, post: &Path) -> Result<String, ClassifierError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(pre)
            .arg(post)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            // The program may exit without reading the prompt.
            if let Err(e) = stdin.write_all(ASSESSMENT_PROMPT.as_bytes()) {
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(ClassifierError::Request(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn image_extension(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("bin")
}

impl DamageClassifier for CommandClassifier {
    fn assess(&self, pre: &[u8], post: &[u8]) -> Result<String, ClassifierError> {
        let dir = tempfile::tempdir()?;
        let pre_path = dir.path().join(format!("pre.{}", image_extension(pre)));
        let post_path = dir.path().join(format!("post.{}", image_extension(post)));
        fs::write(&pre_path, pre)?;
        fs::write(&post_path, post)?;
        self.run(&pre_path, &post_path)
    }
}
