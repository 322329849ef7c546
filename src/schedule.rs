//! Key material validation and exponent slicing.
//!
//! A [`KeySchedule`] is the configuration checkpoint for a run: every
//! precondition the stages rely on is rejected here, before any worker
//! spawns. Slices come out least-significant first, so stage `i` of the
//! pipeline consumes `slices()[i - 1]`.

use thiserror::Error;

use crate::arith::{MAX_MODULUS, bit_len};

/// Widest exponent register the slicer supports.
pub const MAX_WIDTH: u32 = u64::BITS;

/// Rejected key material or pipeline shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("stage count must be at least 1")]
    NoStages,

    #[error("exponent width must be at least 1 bit")]
    ZeroWidth,

    #[error("exponent width {width} exceeds the {max}-bit slicer", max = MAX_WIDTH)]
    WidthTooLarge { width: u32 },

    #[error("exponent width {width} does not divide evenly across {stages} stages")]
    UnevenSplit { width: u32, stages: u32 },

    #[error("exponent needs {bits} bits but the configured width is {width}")]
    ExponentTooWide { bits: u32, width: u32 },

    #[error("modulus {modulus} is too small; the accumulator seeds at 1")]
    ModulusTooSmall { modulus: u64 },

    #[error("modulus {modulus} exceeds the overflow-safe bound {max}", max = MAX_MODULUS)]
    ModulusTooLarge { modulus: u64 },

    #[error("stage {stage} slice spans {bits} bits, over its {budget}-bit budget")]
    SliceOverBudget { stage: u32, bits: u32, budget: u32 },
}

/// Validated key material plus the per-stage exponent slices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchedule {
    exponent: u64,
    modulus: u64,
    width: u32,
    stages: u32,
    slices: Vec<u64>,
}

impl KeySchedule {
    /// Validate a `(exponent, modulus, width, stages)` quadruple and cut the
    /// exponent into per-stage slices.
    pub fn new(exponent: u64, modulus: u64, width: u32, stages: u32) -> Result<Self, ConfigError> {
        if stages == 0 {
            return Err(ConfigError::NoStages);
        }
        if width == 0 {
            return Err(ConfigError::ZeroWidth);
        }
        if width > MAX_WIDTH {
            return Err(ConfigError::WidthTooLarge { width });
        }
        if width % stages != 0 {
            return Err(ConfigError::UnevenSplit { width, stages });
        }
        let bits = bit_len(exponent);
        if bits > width {
            return Err(ConfigError::ExponentTooWide { bits, width });
        }
        if modulus < 2 {
            return Err(ConfigError::ModulusTooSmall { modulus });
        }
        if modulus > MAX_MODULUS {
            return Err(ConfigError::ModulusTooLarge { modulus });
        }
        let slices = split_exponent(exponent, width, stages);
        Ok(Self { exponent, modulus, width, stages, slices })
    }

    pub fn exponent(&self) -> u64 {
        self.exponent
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn stage_count(&self) -> u32 {
        self.stages
    }

    /// Bits each stage consumes.
    pub fn slice_width(&self) -> u32 {
        self.width / self.stages
    }

    /// Exponent slices, least-significant first.
    pub fn slices(&self) -> &[u64] {
        &self.slices
    }
}

/// Cut the low `width` bits of `e` into `stages` equal slices, least
/// significant first. Shapes are pre-validated by [`KeySchedule::new`].
fn split_exponent(e: u64, width: u32, stages: u32) -> Vec<u64> {
    let w = width / stages;
    // Top shift is width - w <= 63, so the shift never saturates.
    (0..stages).map(|i| (e >> (i * w)) & low_mask(w)).collect()
}

/// Mask selecting the low `bits` bits; `bits` may span the whole word.
fn low_mask(bits: u32) -> u64 {
    if bits >= u64::BITS { u64::MAX } else { (1u64 << bits) - 1 }
}
