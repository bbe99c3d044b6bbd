use std::{ffi::OsStr, fmt::Display, process::Output};

/// Preflights svnadmin before the expensive passes run, ensuring the
/// command is executable at all.
pub fn preflight(svnadmin: &OsStr) -> Result<(), crate::Error> {
    let output = std::process::Command::new(svnadmin)
        .arg("--version")
        .arg("--quiet")
        .output()
        .map_err(crate::Error::Spawn)?;

    match output.status.code() {
        Some(0) => Ok(()),
        _ => Err(crate::Error::Preflight(Error::new(svnadmin, output))),
    }
}

#[derive(Debug)]
pub struct Error {
    command: String,
    output: Output,
}

impl Error {
    fn new(svnadmin: &OsStr, output: Output) -> Self {
        Self {
            command: format!("{} --version --quiet", svnadmin.to_string_lossy()),
            output,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "running {} failed with {}; stderr:\n{}",
            self.command,
            match self.output.status.code() {
                Some(code) => format!("exit code {}", code),
                None => "signal".into(),
            },
            String::from_utf8_lossy(&self.output.stderr)
        )
    }
}
