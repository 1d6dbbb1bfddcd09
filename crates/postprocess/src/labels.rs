use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Class-id to name table loaded from a newline-separated file, one name
/// per line in class-id order.
#[derive(Debug, Default, Clone)]
pub struct Labels {
    names: Vec<String>,
}

impl Labels {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open label file {}", path.display()))?;

        let mut names = Vec::new();
        for line in BufReader::new(file).lines() {
            names.push(line.context("Failed to read label file")?);
        }
        Ok(Self { names })
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolves a class id; ids outside the table (negative included) map
    /// to "unknown".
    pub fn get(&self, class_id: i32) -> &str {
        usize::try_from(class_id)
            .ok()
            .and_then(|idx| self.names.get(idx))
            .map(String::as_str)
            .unwrap_or("unknown")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
