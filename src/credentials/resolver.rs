//! Service-account key file resolution.
//!
//! The dispatcher depends on the [`CredentialsProvider`] capability; the
//! environment-driven resolver decides where the key file lives and, when
//! the key material arrives inline, materializes it on disk.

use std::fs;
use std::path::PathBuf;

use crate::config::{ExecutionMode, RuntimeEnv};

/// Fixed key file name used by every branch.
pub const KEY_FILE_NAME: &str = "google-serviceaccount.json";

/// Capability for locating backing-store credentials.
///
/// Resolution always yields some path; whether a usable key actually
/// exists there is validated downstream when the store loads.
pub trait CredentialsProvider: Send + Sync {
    /// Resolve the key file path, materializing it first if needed.
    fn key_file(&self) -> PathBuf;
}

/// Environment-driven resolver with three mutually exclusive branches,
/// checked in priority order:
///
/// 1. development mode: fixed path under the project root
/// 2. inline key JSON: written under the temp directory on every call
/// 3. fallback: the same project-root path, for locally placed key files
pub struct EnvCredentialsResolver {
    mode: ExecutionMode,
    inline_json: Option<String>,
    project_root: PathBuf,
    temp_dir: PathBuf,
}

impl EnvCredentialsResolver {
    pub fn new(
        env: &RuntimeEnv,
        project_root: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mode: env.mode,
            inline_json: env.inline_credentials.clone(),
            project_root: project_root.into(),
            temp_dir: temp_dir.into(),
        }
    }

    /// Resolver rooted at the current working directory and the system
    /// temp directory.
    pub fn from_runtime(env: &RuntimeEnv) -> Self {
        let project_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let temp_dir = std::env::temp_dir().join("sheetserve");
        Self::new(env, project_root, temp_dir)
    }

    /// Write the inline key under the temp directory and return its path.
    ///
    /// Failures are logged and non-fatal: the intended path is returned
    /// either way, and the store's own load surfaces the real error. The
    /// file is rewritten on every call since the inline key can change
    /// between deployments.
    fn materialize_inline(&self, content: &str) -> PathBuf {
        if let Err(err) = fs::create_dir_all(&self.temp_dir) {
            log::warn!(
                "could not create credential directory {}: {}",
                self.temp_dir.display(),
                err
            );
        }
        let path = self.temp_dir.join(KEY_FILE_NAME);
        if let Err(err) = fs::write(&path, content) {
            log::warn!("could not write credential file {}: {}", path.display(), err);
        }
        path
    }
}

impl CredentialsProvider for EnvCredentialsResolver {
    fn key_file(&self) -> PathBuf {
        if self.mode.is_development() {
            return self.project_root.join(KEY_FILE_NAME);
        }
        if let Some(content) = &self.inline_json {
            return self.materialize_inline(content);
        }
        self.project_root.join(KEY_FILE_NAME)
    }
}
