//! Capabilities supplied by the caller: compiling and loading

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::{Error, Result};

/// Derives the compiled form of a raw artifact.
///
/// Implementations are pure with respect to the cache: they read the raw
/// artifact and return where they produced the compiled form. The store
/// moves the result onto the deterministic compiled path.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(&self, raw_path: &Path) -> Result<PathBuf>;
}

/// Loads a compiled artifact into whatever the execution engine uses.
#[async_trait]
pub trait ArtifactLoader: Send + Sync {
    type Handle: Send;

    async fn load(&self, compiled_path: &Path) -> Result<Self::Handle>;
}

/// Reference to a compiled artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub path: PathBuf,
}

/// Loader that only checks the compiled artifact exists and returns its path.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathLoader;

#[async_trait]
impl ArtifactLoader for PathLoader {
    type Handle = CompiledArtifact;

    async fn load(&self, compiled_path: &Path) -> Result<CompiledArtifact> {
        match tokio::fs::metadata(compiled_path).await {
            Ok(_) => Ok(CompiledArtifact {
                path: compiled_path.to_path_buf(),
            }),
            Err(e) => Err(Error::load(format!("{}: {e}", compiled_path.display()))),
        }
    }
}

/// Compiler running an external program.
///
/// Arguments may contain `{input}` (the raw artifact path) and `{output}`
/// (a fresh path next to the raw artifact that the program must create,
/// as a file or a directory).
///
/// ```ignore
/// let compiler = CommandCompiler::new("xcrun")
///     .args(["coremlcompiler", "compile", "{input}", "{output}"]);
/// ```
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandCompiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn output_path(raw_path: &Path) -> PathBuf {
        let stem = raw_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        raw_path.with_file_name(format!(
            ".{stem}.{}.compiling",
            uuid::Uuid::new_v4().simple()
        ))
    }
}

#[async_trait]
impl Compiler for CommandCompiler {
    async fn compile(&self, raw_path: &Path) -> Result<PathBuf> {
        let output = Self::output_path(raw_path);
        let input = raw_path.to_string_lossy();
        let output_arg = output.to_string_lossy();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output_arg)
            })
            .collect();

        tracing::debug!(program = %self.program, ?args, "Running compiler");
        let result = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| Error::compile(format!("failed to run {}: {e}", self.program)))?;

        if !result.status.success() {
            discard_output(&output).await;
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::compile(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                stderr.trim()
            )));
        }
        if tokio::fs::symlink_metadata(&output).await.is_err() {
            return Err(Error::compile(format!(
                "{} did not produce {}",
                self.program,
                output.display()
            )));
        }
        Ok(output)
    }
}

/// Remove whatever a failed compiler run left at `output`.
async fn discard_output(output: &Path) {
    let removed = match tokio::fs::symlink_metadata(output).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(output).await,
        Ok(_) => tokio::fs::remove_file(output).await,
        Err(_) => return,
    };
    if let Err(e) = removed {
        tracing::warn!(path = %output.display(), "Failed to remove partial compiler output: {e}");
    }
}
