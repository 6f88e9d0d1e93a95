//! The file-operation step handler.
//!
//! Executes create/read/update/delete against the local filesystem through
//! `tokio::fs`.  When constructed with a sandbox root, step paths are
//! resolved relative to it and may not escape it.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::fs;

use crate::action::{FileOperation, FileOperationConfig, StepAction, StepKind};
use crate::error::StepError;
use crate::traits::{StepContext, StepHandler};

#[derive(Default)]
pub struct FileOperationHandler {
    root: Option<PathBuf>,
}

impl FileOperationHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confine every step path underneath `root`.
    pub fn sandboxed(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, raw: &str) -> Result<PathBuf, StepError> {
        let path = Path::new(raw);
        match &self.root {
            None => Ok(path.to_path_buf()),
            Some(root) => {
                if path.is_absolute() {
                    return Err(StepError::Config(format!(
                        "absolute path '{raw}' not allowed inside a sandbox"
                    )));
                }
                if path.components().any(|c| matches!(c, Component::ParentDir)) {
                    return Err(StepError::Config(format!(
                        "path '{raw}' escapes the sandbox"
                    )));
                }
                Ok(root.join(path))
            }
        }
    }

    fn required_content<'a>(config: &'a FileOperationConfig) -> Result<&'a str, StepError> {
        config.content.as_deref().ok_or_else(|| {
            StepError::Config(format!(
                "'{}' operation requires content",
                config.operation
            ))
        })
    }
}

#[async_trait]
impl StepHandler for FileOperationHandler {
    async fn process(&self, action: &StepAction, _ctx: &StepContext) -> Result<Value, StepError> {
        let config = match action {
            StepAction::FileOperation(config) => config,
            other => {
                return Err(StepError::kind_mismatch(StepKind::FileOperation, other.kind()))
            }
        };

        let path = self.resolve(&config.path)?;
        let mut read_content = None;

        match config.operation {
            FileOperation::Create => {
                let content = Self::required_content(config)?;
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).await?;
                }
                fs::write(&path, content).await?;
            }
            FileOperation::Update => {
                let content = Self::required_content(config)?;
                // Unlike create, update refuses to conjure the file.
                fs::metadata(&path).await?;
                fs::write(&path, content).await?;
            }
            FileOperation::Read => {
                read_content = Some(fs::read_to_string(&path).await?);
            }
            FileOperation::Delete => {
                fs::remove_file(&path).await?;
            }
        }

        Ok(json!({
            "operation": config.operation.to_string(),
            "path": config.path,
            "success": true,
            "content": read_content,
        }))
    }
}
