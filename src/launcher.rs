use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{FleetError, Result};

pub trait Opener {
    fn open(&self, path: &Path) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileManager {
    program: String,
}

impl FileManager {
    pub fn new(program: Option<String>) -> Self {
        Self {
            program: program.unwrap_or_else(|| default_program().to_string()),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Opener for FileManager {
    fn open(&self, path: &Path) -> Result<()> {
        tracing::debug!(program = %self.program, path = %path.display(), "launching file manager");
        Command::new(&self.program)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| FleetError::Launch {
                program: self.program.clone(),
                source,
            })?;
        Ok(())
    }
}

pub fn default_program() -> &'static str {
    if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}
