//! Commit targets: default output naming and in-place input replacement.

use std::fs;
use std::path::{Path, PathBuf};

use hintbox_core::{Error, Result};

/// Where a mutated movie ends up.
///
/// Without an explicit output the movie is written next to the input under
/// an `out_` prefix and then swapped over the input on commit.
#[derive(Debug, Clone)]
pub struct CommitTarget {
    input: PathBuf,
    explicit_output: Option<PathBuf>,
}

impl CommitTarget {
    pub fn new(input: impl Into<PathBuf>, explicit_output: Option<PathBuf>) -> Self {
        Self {
            input: input.into(),
            explicit_output,
        }
    }

    #[must_use]
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// The path the writer should produce.
    #[must_use]
    pub fn output(&self) -> PathBuf {
        if let Some(out) = &self.explicit_output {
            return out.clone();
        }
        let name = self
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "movie".to_string());
        self.input.with_file_name(format!("out_{name}"))
    }

    /// Whether commit swaps the written file over the input.
    #[must_use]
    pub fn replaces_input(&self) -> bool {
        self.explicit_output.is_none()
    }

    /// Swap the written output over the input.
    ///
    /// Rename is attempted first; when it fails (cross-device targets) the
    /// file is copied and the temporary removed.
    pub fn replace_input(&self) -> Result<()> {
        if !self.replaces_input() {
            return Err(Error::StorageFailure(
                "commit target has an explicit output".to_string(),
            ));
        }
        let output = self.output();
        if self.input.exists() {
            fs::remove_file(&self.input)?;
        }
        if fs::rename(&output, &self.input).is_err() {
            fs::copy(&output, &self.input)?;
            fs::remove_file(&output)?;
        }
        tracing::debug!("Committed movie over {}", self.input.display());
        Ok(())
    }
}
