//! Network manager invocation
//!
//! `netplan generate` validates what was written, `netplan apply` pushes it
//! to live interfaces. Both block until the child exits; no timeout is set.

use crate::error::{NetcfgError, NetcfgResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info};

/// How far a run goes after rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Render only; nothing is written or executed
    DryRun,
    /// Write and validate, leave live interfaces alone
    ValidateOnly,
    /// Write, validate and apply
    Apply,
}

/// Where a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStatus {
    Skipped,
    Validated,
    Applied,
}

/// Network manager operations
#[async_trait]
pub trait NetplanBackend: Send + Sync {
    /// Check the written configuration; `Validation` on rejection
    async fn generate(&self) -> NetcfgResult<()>;

    /// Apply the configuration to live interfaces; `Apply` on failure
    async fn apply(&self) -> NetcfgResult<()>;
}

/// Backend that shells out to the `netplan` binary
pub struct NetplanCli {
    binary: String,
    workdir: Option<PathBuf>,
}

impl NetplanCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            workdir: None,
        }
    }

    /// Run commands from the directory holding the target document
    pub fn with_workdir(mut self, dir: impl AsRef<Path>) -> Self {
        self.workdir = Some(dir.as_ref().to_path_buf());
        self
    }

    async fn run(&self, action: &str) -> NetcfgResult<Output> {
        let cmd_str = format!("{} {}", self.binary, action);
        debug!("Running '{}'", cmd_str);

        let mut command = Command::new(&self.binary);
        command.arg(action);
        if let Some(dir) = self.workdir.as_ref().filter(|d| d.is_dir()) {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .await
            .map_err(|e| NetcfgError::CommandFailed {
                cmd: cmd_str.clone(),
                code: None,
                stderr: e.to_string(),
            })?;

        debug!("'{}' exited with {}", cmd_str, output.status);
        Ok(output)
    }
}

impl Default for NetplanCli {
    fn default() -> Self {
        Self::new("netplan")
    }
}

/// Collaborator diagnostics, passed through as written
fn diagnostic(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr.into_owned()
    }
}

#[async_trait]
impl NetplanBackend for NetplanCli {
    async fn generate(&self) -> NetcfgResult<()> {
        let output = self.run("generate").await?;
        if !output.status.success() {
            return Err(NetcfgError::Validation(diagnostic(&output)));
        }
        Ok(())
    }

    async fn apply(&self) -> NetcfgResult<()> {
        let output = self.run("apply").await?;
        if !output.status.success() {
            return Err(NetcfgError::Apply(diagnostic(&output)));
        }
        Ok(())
    }
}

/// Refuse to touch live interfaces without root
pub fn ensure_root() -> NetcfgResult<()> {
    // SAFETY: geteuid has no preconditions and cannot fail
    let euid = unsafe { libc::geteuid() };
    if euid != 0 {
        return Err(NetcfgError::PermissionDenied(
            "applying network configuration requires root".to_string(),
        ));
    }
    Ok(())
}

/// Privilege check run before anything is written in apply mode
pub type RootCheck = fn() -> NetcfgResult<()>;

/// Drives a [`NetplanBackend`] according to a [`RunMode`]
pub struct ApplyRunner<B> {
    backend: B,
    mode: RunMode,
    root_check: Option<RootCheck>,
}

impl<B: NetplanBackend> ApplyRunner<B> {
    pub fn new(backend: B, mode: RunMode) -> Self {
        Self {
            backend,
            mode,
            root_check: Some(ensure_root),
        }
    }

    /// Skip the effective-UID check before apply
    pub fn without_root_check(mut self) -> Self {
        self.root_check = None;
        self
    }

    /// Replace the effective-UID check
    pub fn with_root_check(mut self, check: RootCheck) -> Self {
        self.root_check = Some(check);
        self
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Preconditions that must hold before the target is touched
    ///
    /// Only apply mode needs root; dry-run and validate-only pass.
    pub fn preflight(&self) -> NetcfgResult<()> {
        match (self.mode, self.root_check) {
            (RunMode::Apply, Some(check)) => check(),
            _ => Ok(()),
        }
    }

    pub async fn validate(&self) -> NetcfgResult<()> {
        self.backend.generate().await?;
        info!("Configuration validated");
        Ok(())
    }

    pub async fn apply(&self) -> NetcfgResult<()> {
        if self.mode != RunMode::Apply {
            return Ok(());
        }
        self.preflight()?;
        self.backend.apply().await?;
        info!("Configuration applied");
        Ok(())
    }

    /// Validate, then apply when the mode allows it
    pub async fn run(&self) -> NetcfgResult<ApplyStatus> {
        match self.mode {
            RunMode::DryRun => Ok(ApplyStatus::Skipped),
            RunMode::ValidateOnly => {
                self.validate().await?;
                Ok(ApplyStatus::Validated)
            }
            RunMode::Apply => {
                self.validate().await?;
                self.apply().await?;
                Ok(ApplyStatus::Applied)
            }
        }
    }
}
