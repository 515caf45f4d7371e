//! Backend configuration.

use crate::error::TargetError;
use crate::types::CScalar;

/// Sizes of the C integer types on the target, in bytes.
///
/// Fixed-width source integers are mapped onto the first C type of the
/// right size, so this decides e.g. whether `int64` is `long` or
/// `long long`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TargetProperties {
    pub short_size: u32,
    pub int_size: u32,
    pub long_size: u32,
    pub long_long_size: u32,
    pub pointer_size: u32,
}

impl TargetProperties {
    /// 64-bit Linux and macOS.
    pub const fn lp64() -> Self {
        TargetProperties {
            short_size: 2,
            int_size: 4,
            long_size: 8,
            long_long_size: 8,
            pointer_size: 8,
        }
    }

    /// 64-bit Windows.
    pub const fn llp64() -> Self {
        TargetProperties {
            short_size: 2,
            int_size: 4,
            long_size: 4,
            long_long_size: 8,
            pointer_size: 8,
        }
    }

    /// 32-bit targets.
    pub const fn ilp32() -> Self {
        TargetProperties {
            short_size: 2,
            int_size: 4,
            long_size: 4,
            long_long_size: 8,
            pointer_size: 4,
        }
    }

    /// Check the minimum sizes and ordering the C standard guarantees.
    pub fn validate(&self) -> Result<(), TargetError> {
        let minimums = [
            ("short", self.short_size, 2),
            ("int", self.int_size, 2),
            ("long", self.long_size, 4),
            ("long long", self.long_long_size, 8),
        ];
        for (name, size, min) in minimums {
            if size < min {
                return Err(TargetError::TooSmall { name, size, min });
            }
        }
        for pair in minimums.windows(2) {
            let (smaller, smaller_size, _) = pair[0];
            let (larger, larger_size, _) = pair[1];
            if larger_size < smaller_size {
                return Err(TargetError::Misordered {
                    smaller,
                    smaller_size,
                    larger,
                    larger_size,
                });
            }
        }
        if !matches!(self.pointer_size, 4 | 8) {
            return Err(TargetError::PointerSize(self.pointer_size));
        }
        Ok(())
    }

    /// The first C integer type of `size` bytes.
    pub fn integer_of_size(&self, size: u32, signed: bool) -> Option<CScalar> {
        let candidates = [
            (1, CScalar::SignedChar, CScalar::UnsignedChar),
            (self.short_size, CScalar::Short, CScalar::UnsignedShort),
            (self.int_size, CScalar::Int, CScalar::UnsignedInt),
            (self.long_size, CScalar::Long, CScalar::UnsignedLong),
            (self.long_long_size, CScalar::LongLong, CScalar::UnsignedLongLong),
        ];
        candidates
            .into_iter()
            .find(|(candidate_size, _, _)| *candidate_size == size)
            .map(|(_, signed_ty, unsigned_ty)| if signed { signed_ty } else { unsigned_ty })
    }
}

impl Default for TargetProperties {
    fn default() -> Self {
        Self::lp64()
    }
}

/// Options for one [`generate_code`](crate::generate_code) run.
#[derive(Clone, Debug)]
pub struct CodegenOptions {
    pub target: TargetProperties,
    /// One level of indentation in function bodies.
    pub indentation: String,
}

impl CodegenOptions {
    /// Options for `target`, rejecting impossible targets up front.
    pub fn new(target: TargetProperties) -> Result<Self, TargetError> {
        target.validate()?;
        Ok(CodegenOptions {
            target,
            ..CodegenOptions::default()
        })
    }

    #[must_use]
    pub fn with_indentation(mut self, indentation: impl Into<String>) -> Self {
        self.indentation = indentation.into();
        self
    }
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            target: TargetProperties::default(),
            indentation: "\t".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn builtin_targets_are_valid() {
        for target in [TargetProperties::lp64(), TargetProperties::llp64(), TargetProperties::ilp32()] {
            assert_eq!(target.validate(), Ok(()));
        }
    }

    #[test]
    fn first_matching_integer_wins() {
        let lp64 = TargetProperties::lp64();
        assert_eq!(lp64.integer_of_size(8, true), Some(CScalar::Long));
        assert_eq!(lp64.integer_of_size(1, false), Some(CScalar::UnsignedChar));
        assert_eq!(TargetProperties::llp64().integer_of_size(8, false), Some(CScalar::UnsignedLongLong));
        assert_eq!(lp64.integer_of_size(16, true), None);
    }

    #[test]
    fn rejects_impossible_targets() {
        let small_long = TargetProperties { long_size: 2, ..TargetProperties::lp64() };
        assert_eq!(
            small_long.validate(),
            Err(TargetError::TooSmall { name: "long", size: 2, min: 4 })
        );

        let misordered = TargetProperties { int_size: 8, long_size: 4, ..TargetProperties::lp64() };
        assert_eq!(
            misordered.validate(),
            Err(TargetError::Misordered {
                smaller: "int",
                smaller_size: 8,
                larger: "long",
                larger_size: 4,
            })
        );

        let odd_pointer = TargetProperties { pointer_size: 2, ..TargetProperties::ilp32() };
        assert_eq!(odd_pointer.validate(), Err(TargetError::PointerSize(2)));
        assert!(CodegenOptions::new(odd_pointer).is_err());
    }

    #[test]
    fn options_builder() {
        let options = CodegenOptions::default().with_indentation("    ");
        assert_eq!(options.indentation, "    ");
        assert_eq!(options.target, TargetProperties::lp64());
    }
}
