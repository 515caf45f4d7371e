//! Recoverable failures of the C backend.
//!
//! Everything else the backend can run into is a broken IR invariant and
//! panics.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Writing the generated translation unit failed.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("unable to open output file '{}'", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to write to '{}'", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A [`TargetProperties`](crate::TargetProperties) that no C implementation
/// could have.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("`{name}` is {size} bytes, but must be at least {min}")]
    TooSmall {
        name: &'static str,
        size: u32,
        min: u32,
    },
    #[error("`{larger}` ({larger_size} bytes) is smaller than `{smaller}` ({smaller_size} bytes)")]
    Misordered {
        smaller: &'static str,
        smaller_size: u32,
        larger: &'static str,
        larger_size: u32,
    },
    #[error("pointer size {0} is not 4 or 8 bytes")]
    PointerSize(u32),
}
