//! Seams for the external signing and key-generation tools.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use clap::ValueEnum;
use log::debug;

use crate::error::ToolError;

/// Produces a header/signature artifact for one payload.
///
/// Cost must depend only on the payload size; `version` exists to defeat any
/// caching inside the tool.
pub trait ExternalSigner {
    fn sign(
        &mut self,
        payload: &Path,
        out: &Path,
        size_bytes: u64,
        version: u64,
    ) -> Result<(), ToolError>;
}

/// Creates a key pair at the given paths.
pub trait KeyGenerator {
    fn generate(&mut self, public_key: &Path, secret_key: &Path) -> Result<(), ToolError>;
}

/// Command-line convention of the signing executable.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum ArgStyle {
    /// `<sec> <payload> <out> --size <N> --version <V>`
    #[default]
    Flags,
    /// `<payload> <pub> <sec> <version> <out>`
    Positional,
}

impl ArgStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgStyle::Flags => "flags",
            ArgStyle::Positional => "positional",
        }
    }
}

fn run_tool(program: &Path, cmd: &mut Command) -> Result<(), ToolError> {
    let status = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| ToolError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(ToolError::Exit {
            program: program.to_path_buf(),
            status,
        })
    }
}

/// Runs the signer as a child process per call and waits for it.
#[derive(Clone, Debug)]
pub struct ProcessSigner {
    program: PathBuf,
    public_key: PathBuf,
    secret_key: PathBuf,
    style: ArgStyle,
}

impl ProcessSigner {
    pub fn new(
        program: impl Into<PathBuf>,
        public_key: impl Into<PathBuf>,
        secret_key: impl Into<PathBuf>,
        style: ArgStyle,
    ) -> Self {
        Self {
            program: program.into(),
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            style,
        }
    }

    fn command(&self, payload: &Path, out: &Path, size_bytes: u64, version: u64) -> Command {
        let mut cmd = Command::new(&self.program);
        match self.style {
            ArgStyle::Flags => {
                cmd.arg(&self.secret_key)
                    .arg(payload)
                    .arg(out)
                    .arg("--size")
                    .arg(size_bytes.to_string())
                    .arg("--version")
                    .arg(version.to_string());
            }
            ArgStyle::Positional => {
                cmd.arg(payload)
                    .arg(&self.public_key)
                    .arg(&self.secret_key)
                    .arg(version.to_string())
                    .arg(out);
            }
        }
        cmd
    }
}

impl ExternalSigner for ProcessSigner {
    fn sign(
        &mut self,
        payload: &Path,
        out: &Path,
        size_bytes: u64,
        version: u64,
    ) -> Result<(), ToolError> {
        let mut cmd = self.command(payload, out, size_bytes, version);
        run_tool(&self.program, &mut cmd)
    }
}

#[derive(Clone, Debug)]
pub struct ProcessKeyGenerator {
    program: PathBuf,
}

impl ProcessKeyGenerator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl KeyGenerator for ProcessKeyGenerator {
    fn generate(&mut self, public_key: &Path, secret_key: &Path) -> Result<(), ToolError> {
        debug!("running {} to create key pair", self.program.display());
        let mut cmd = Command::new(&self.program);
        cmd.arg(public_key).arg(secret_key);
        run_tool(&self.program, &mut cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_flags_style_arguments() {
        let s = ProcessSigner::new("sign_fw_c", "out/pub.key", "out/sec.key", ArgStyle::Flags);
        let cmd = s.command(
            Path::new("out/payload_4096.bin"),
            Path::new("out/hdr_4096.bin"),
            4096,
            77,
        );
        assert_eq!(
            args(&cmd),
            [
                "out/sec.key",
                "out/payload_4096.bin",
                "out/hdr_4096.bin",
                "--size",
                "4096",
                "--version",
                "77"
            ]
        );
    }

    #[test]
    fn test_positional_style_arguments() {
        let s = ProcessSigner::new("sign_fw_c", "pub.key", "sec.key", ArgStyle::Positional);
        let cmd = s.command(Path::new("p.bin"), Path::new("h.bin"), 4096, 5);
        assert_eq!(args(&cmd), ["p.bin", "pub.key", "sec.key", "5", "h.bin"]);
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let mut s = ProcessSigner::new(
            "/nonexistent/sign-bench-signer",
            "pub.key",
            "sec.key",
            ArgStyle::Flags,
        );
        let err = s
            .sign(Path::new("p.bin"), Path::new("h.bin"), 1, 2)
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_exit_error() {
        let mut g = ProcessKeyGenerator::new("false");
        let err = g
            .generate(Path::new("pub.key"), Path::new("sec.key"))
            .unwrap_err();
        assert!(matches!(err, ToolError::Exit { .. }));
    }
}
