//! Writing a generated translation unit to its destination.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::EmitError;

/// Where generated C goes. `-` on the command line means stdout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    Path(PathBuf),
}

impl OutputTarget {
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            OutputTarget::Stdout
        } else {
            OutputTarget::Path(PathBuf::from(arg))
        }
    }
}

fn has_c_extension(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension == "c")
}

/// Write `code` to `target`.
///
/// # Errors
///
/// Returns an error if the output file cannot be created or written.
pub fn emit_code(code: &str, target: &OutputTarget) -> Result<(), EmitError> {
    match target {
        OutputTarget::Stdout => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(code.as_bytes())
                .and_then(|()| lock.flush())
                .map_err(|source| EmitError::Write {
                    path: PathBuf::from("-"),
                    source,
                })
        }
        OutputTarget::Path(path) => {
            if !has_c_extension(path) {
                tracing::warn!(
                    path = %path.display(),
                    "C output file '{}' doesn't have the extension '.c'",
                    path.display()
                );
            }
            let file = File::create(path).map_err(|source| EmitError::Create {
                path: path.clone(),
                source,
            })?;
            let mut writer = BufWriter::new(file);
            writer
                .write_all(code.as_bytes())
                .and_then(|()| writer.flush())
                .map_err(|source| EmitError::Write {
                    path: path.clone(),
                    source,
                })?;
            tracing::debug!(path = %path.display(), bytes = code.len(), "C output written");
            Ok(())
        }
    }
}

/// [`emit_code`] for drivers that only need success or failure. The
/// failure is logged here.
pub fn output_code(code: &str, target: &OutputTarget) -> bool {
    match emit_code(code, target) {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(error = %err, source = ?std::error::Error::source(&err), "emitting C code failed");
            false
        }
    }
}
