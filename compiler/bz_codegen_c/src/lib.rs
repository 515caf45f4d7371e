//! C source backend for the bz compiler.
//!
//! Lowers a typed [`bz_ir::Module`] into a single C translation unit. The
//! IR already spells out every construct, copy, move, destruct, swap and
//! assign as an element-wise plan; this crate decides how each plan looks
//! in C, tracks which temporaries need cleanup at which scope exit, and
//! keeps the emitted text minimally parenthesized.
//!
//! # Modules
//!
//! - [`types`]: interned C types and their names
//! - [`value`]: lowered values and the C precedence model
//! - [`context`]: naming, output sections and per-function state
//! - [`abi`]: how parameters and results cross a C call
//! - [`emit`]: writing the result to a file or stdout
//!
//! ```text
//! let code = bz_codegen_c::generate_code(&module, CodegenOptions::default());
//! bz_codegen_c::output_code(&code, &OutputTarget::from_arg("out.c"));
//! ```

pub mod abi;
pub mod config;
pub mod context;
pub mod emit;
pub mod error;
mod lower;
pub mod types;
pub mod value;

pub use config::{CodegenOptions, TargetProperties};
pub use context::CodegenContext;
pub use emit::{emit_code, output_code, OutputTarget};
pub use error::{EmitError, TargetError};
pub use lower::Lowerer;
pub use value::{ExprValue, Precedence};

static TRACING_INIT: std::sync::Once = std::sync::Once::new();

/// Install a `RUST_LOG`-filtered subscriber for backend diagnostics, e.g.
/// `RUST_LOG=bz_codegen_c=debug`. Does nothing when `RUST_LOG` is unset or
/// a subscriber was already installed.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .try_init();
        }
    });
}

/// Lower `module` into C source text.
pub fn generate_code(module: &bz_ir::Module, options: CodegenOptions) -> String {
    let _span = tracing::debug_span!("generate_code").entered();
    Lowerer::new(module, options).generate()
}
