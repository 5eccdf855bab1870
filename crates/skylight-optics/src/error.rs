use std::path::PathBuf;

/// Errors returned by [`crate::OpticalModel`] setters.
#[derive(Debug, thiserror::Error)]
pub enum OpticsError {
    #[error("wavelength {wavelength} nm outside the visible range [{min}, {max}] nm")]
    WavelengthOutOfRange { wavelength: f32, min: f32, max: f32 },
}

/// Errors from loading or saving the optical LUT cache file.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to read LUT cache {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write LUT cache {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("LUT cache tag mismatch: expected {expected:#010x}, found {found:#010x}")]
    TagMismatch { expected: u32, found: u32 },

    #[error("LUT cache version mismatch: expected {expected:#010x}, found {found:#010x}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("LUT cache truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("LUT cache has {extra} trailing bytes")]
    TrailingBytes { extra: usize },

    #[error("LUT cache files are only written on little-endian targets")]
    UnsupportedEndianness,
}
