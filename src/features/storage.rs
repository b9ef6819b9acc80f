use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Service registry descriptor.
#[derive(Debug, Clone, Default)]
pub struct RegistryFeature {
    pub enabled: bool,
    /// Registry document; `None` selects the built-in local registry.
    pub path: Option<PathBuf>,
}

impl RegistryFeature {
    pub fn local() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            path: Some(path.into()),
        }
    }
}

/// Driver family used to seed the schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDriver {
    #[default]
    Postgres,
    /// Records statements in memory instead of executing them.
    Memory,
}

impl SqlDriver {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlDriver::Postgres => "postgres",
            SqlDriver::Memory => "memory",
        }
    }
}

/// Schema seeding descriptor.
#[derive(Debug, Clone, Default)]
pub struct SqlFeature {
    pub enabled: bool,
    pub driver: SqlDriver,
    pub files: Vec<PathBuf>,
    /// Directories whose `*.sql` entries are seeded after `files`.
    pub dirs: Vec<PathBuf>,
    pub create_table_stmts: Vec<String>,
    pub create_index_stmts: Vec<String>,
}

impl SqlFeature {
    pub fn postgres() -> Self {
        Self {
            enabled: true,
            driver: SqlDriver::Postgres,
            ..Self::default()
        }
    }

    pub fn memory() -> Self {
        Self {
            enabled: true,
            driver: SqlDriver::Memory,
            ..Self::default()
        }
    }

    pub fn with_files(mut self, files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dirs(mut self, dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_table_statements(mut self, stmts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.create_table_stmts = stmts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_index_statements(mut self, stmts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.create_index_stmts = stmts.into_iter().map(Into::into).collect();
        self
    }

    /// Explicit files followed by each directory's `*.sql` entries (sorted by name),
    /// without duplicates.
    pub fn resolve_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut resolved: Vec<PathBuf> = Vec::new();
        let mut push = |path: PathBuf| {
            if !resolved.contains(&path) {
                resolved.push(path);
            }
        };

        for file in &self.files {
            push(file.clone());
        }

        for dir in &self.dirs {
            for file in sql_files_in(dir)? {
                push(file);
            }
        }

        Ok(resolved)
    }
}

fn sql_files_in(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
