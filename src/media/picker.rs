use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rustyline::DefaultEditor;

use super::{MediaError, MediaSource, Permission};

/// Asks the user a question and returns their answer, `None` when
/// there is no answer to be had. Called on a blocking thread.
pub type Prompter = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

fn readline_prompter() -> Prompter {
    Arc::new(|question: &str| {
        let mut rl = DefaultEditor::new().ok()?;
        rl.readline(question).ok()
    })
}

/// Picks photos from a directory on disk by asking the user in the
/// terminal. Consent to read the directory is asked for once and
/// remembered for the rest of the session.
pub struct TerminalPicker {
    media_dir: PathBuf,
    consent: Mutex<Option<Permission>>,
    prompter: Prompter,
}

impl TerminalPicker {
    pub fn new(media_dir: &Path) -> Self {
        Self::with_prompter(media_dir, readline_prompter())
    }

    pub fn with_prompter(media_dir: &Path, prompter: Prompter) -> Self {
        Self {
            media_dir: media_dir.to_path_buf(),
            consent: Mutex::new(None),
            prompter,
        }
    }

    async fn ask(&self, question: String) -> Option<String> {
        let prompter = Arc::clone(&self.prompter);
        match tokio::task::spawn_blocking(move || prompter(&question)).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!("Prompt failed: {}", err);
                None
            }
        }
    }

    fn cached_consent(&self) -> MutexGuard<'_, Option<Permission>> {
        self.consent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn ask_consent(&self) -> Permission {
        if !self.media_dir.is_dir() {
            tracing::warn!("Media directory {} does not exist", self.media_dir.display());
            return Permission::Denied;
        }
        let question = format!(
            "Allow access to photos in {}? [y/N] ",
            self.media_dir.display()
        );
        match self.ask(question).await {
            Some(answer) if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") => {
                Permission::Granted
            }
            _ => Permission::Denied,
        }
    }

    // Only files inside the media directory are covered by the
    // user's consent
    fn resolve(&self, name: &str) -> Result<PathBuf, MediaError> {
        let root = self
            .media_dir
            .canonicalize()
            .map_err(|e| MediaError::Unreadable(e.to_string()))?;
        let path = root
            .join(name)
            .canonicalize()
            .map_err(|e| MediaError::Unreadable(format!("{}: {}", name, e)))?;
        if !path.starts_with(&root) {
            tracing::warn!("Refusing to read {} outside of the media directory", path.display());
            return Err(MediaError::PermissionDenied);
        }
        Ok(path)
    }
}

#[async_trait]
impl MediaSource for TerminalPicker {
    async fn request_permission(&self) -> Permission {
        let cached = *self.cached_consent();
        if let Some(permission) = cached {
            return permission;
        }
        let permission = self.ask_consent().await;
        *self.cached_consent() = Some(permission);
        permission
    }

    async fn pick(&self) -> Result<Option<Vec<u8>>, MediaError> {
        let answer = self
            .ask(String::from("Photo file name (leave blank to cancel): "))
            .await;
        let name = match answer {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => return Ok(None),
        };
        let path = self.resolve(&name)?;
        let bytes = fs::read(&path).map_err(|e| MediaError::Unreadable(e.to_string()))?;
        Ok(Some(bytes))
    }
}

/// A picker with the photo already chosen, e.g. from a command line
/// argument. Naming the file explicitly counts as granting access.
pub struct FilePicker {
    path: PathBuf,
}

impl FilePicker {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl MediaSource for FilePicker {
    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn pick(&self) -> Result<Option<Vec<u8>>, MediaError> {
        let bytes = fs::read(&self.path)
            .map_err(|e| MediaError::Unreadable(format!("{}: {}", self.path.display(), e)))?;
        Ok(Some(bytes))
    }
}
