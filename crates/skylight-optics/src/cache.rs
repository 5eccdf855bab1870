//! Binary cache file for [`OpticalLuts`].
//!
//! Layout (little-endian):
//! ```text
//! u32 tag | u32 version | depth entries (H*A x 8 bytes) | scale entries (H x 12 bytes)
//! ```
//! A file is accepted only if the tag, version and total length all match.

use std::path::PathBuf;

use crate::error::CacheError;
use crate::lut::{
    ANGULAR_STEPS, HEIGHT_STEPS, OpticalDepthEntry, OpticalLuts, OpticalScaleEntry,
};

/// Default file tag, `"SKYL"` read as a little-endian u32.
pub const DEFAULT_CACHE_TAG: u32 = 0x4C59_4B53;
/// Default format version.
pub const DEFAULT_CACHE_VERSION: u32 = 0x0001_0002;

const HEADER_SIZE: usize = 8;
const DEPTH_BYTES: usize = HEIGHT_STEPS * ANGULAR_STEPS * std::mem::size_of::<OpticalDepthEntry>();
const SCALE_BYTES: usize = HEIGHT_STEPS * std::mem::size_of::<OpticalScaleEntry>();

/// Total size of a valid cache file.
pub const CACHE_FILE_SIZE: usize = HEADER_SIZE + DEPTH_BYTES + SCALE_BYTES;

/// Where the cache lives and which header it must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LutCacheConfig {
    pub path: PathBuf,
    pub tag: u32,
    pub version: u32,
}

impl Default for LutCacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("optical.lut"),
            tag: DEFAULT_CACHE_TAG,
            version: DEFAULT_CACHE_VERSION,
        }
    }
}

/// Serialize `luts` with the header from `config`.
pub fn encode(luts: &OpticalLuts, config: &LutCacheConfig) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(CACHE_FILE_SIZE);
    bytes.extend_from_slice(&config.tag.to_le_bytes());
    bytes.extend_from_slice(&config.version.to_le_bytes());
    bytes.extend_from_slice(bytemuck::cast_slice(luts.depth.as_slice()));
    bytes.extend_from_slice(bytemuck::cast_slice(luts.scale.as_slice()));
    bytes
}

/// Parse a cache file image, validating header and length.
pub fn decode(bytes: &[u8], config: &LutCacheConfig) -> Result<OpticalLuts, CacheError> {
    if bytes.len() < HEADER_SIZE {
        return Err(CacheError::Truncated {
            expected: CACHE_FILE_SIZE,
            actual: bytes.len(),
        });
    }

    let tag = read_u32(&bytes[0..4]);
    if tag != config.tag {
        return Err(CacheError::TagMismatch {
            expected: config.tag,
            found: tag,
        });
    }
    let version = read_u32(&bytes[4..8]);
    if version != config.version {
        return Err(CacheError::VersionMismatch {
            expected: config.version,
            found: version,
        });
    }

    if bytes.len() < CACHE_FILE_SIZE {
        return Err(CacheError::Truncated {
            expected: CACHE_FILE_SIZE,
            actual: bytes.len(),
        });
    }
    if bytes.len() > CACHE_FILE_SIZE {
        return Err(CacheError::TrailingBytes {
            extra: bytes.len() - CACHE_FILE_SIZE,
        });
    }

    // Copy into typed storage; the byte slice carries no alignment guarantee.
    let mut depth = vec![OpticalDepthEntry::default(); HEIGHT_STEPS * ANGULAR_STEPS];
    let mut scale = vec![OpticalScaleEntry::default(); HEIGHT_STEPS];
    let depth_end = HEADER_SIZE + DEPTH_BYTES;
    bytemuck::cast_slice_mut::<OpticalDepthEntry, u8>(&mut depth)
        .copy_from_slice(&bytes[HEADER_SIZE..depth_end]);
    bytemuck::cast_slice_mut::<OpticalScaleEntry, u8>(&mut scale)
        .copy_from_slice(&bytes[depth_end..]);

    Ok(OpticalLuts { depth, scale })
}

/// Read and validate the cache file at `config.path`.
pub fn load(config: &LutCacheConfig) -> Result<OpticalLuts, CacheError> {
    let bytes = std::fs::read(&config.path).map_err(|source| CacheError::Read {
        path: config.path.clone(),
        source,
    })?;
    decode(&bytes, config)
}

/// Write `luts` to `config.path`, creating parent directories.
///
/// Entries are written in native byte order, so big-endian targets refuse.
pub fn save(luts: &OpticalLuts, config: &LutCacheConfig) -> Result<(), CacheError> {
    if !cfg!(target_endian = "little") {
        return Err(CacheError::UnsupportedEndianness);
    }
    let write_err = |source| CacheError::Write {
        path: config.path.clone(),
        source,
    };
    if let Some(parent) = config.path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(&config.path, encode(luts, config)).map_err(write_err)?;
    tracing::info!("Saved optical LUT cache to {}", config.path.display());
    Ok(())
}

/// Load the LUTs from the cache, or build them and refresh the cache.
///
/// With `config == None` the cache is bypassed entirely.
pub fn load_or_build_luts(config: Option<&LutCacheConfig>) -> OpticalLuts {
    let Some(config) = config else {
        return OpticalLuts::build();
    };

    match load(config) {
        Ok(luts) => {
            tracing::info!("Loaded optical LUT cache from {}", config.path.display());
            luts
        }
        Err(err) => {
            tracing::info!("Optical LUT cache unusable ({err}); rebuilding");
            let luts = OpticalLuts::build();
            if let Err(err) = save(&luts, config) {
                tracing::warn!("{err}");
            }
            luts
        }
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lut::test_luts;

    fn config_in(dir: &std::path::Path) -> LutCacheConfig {
        LutCacheConfig {
            path: dir.join("optical.lut"),
            ..LutCacheConfig::default()
        }
    }

    #[test]
    fn test_encoded_size() {
        let luts = test_luts();
        let bytes = encode(&luts, &LutCacheConfig::default());
        assert_eq!(bytes.len(), CACHE_FILE_SIZE);
        assert_eq!(CACHE_FILE_SIZE, 8 + 32 * 256 * 8 + 32 * 12);
        assert_eq!(&bytes[0..4], &DEFAULT_CACHE_TAG.to_le_bytes());
        assert_eq!(&bytes[4..8], &DEFAULT_CACHE_VERSION.to_le_bytes());
    }

    #[test]
    fn test_save_load_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let luts = test_luts();

        save(&luts, &config).unwrap();
        let loaded = load(&config).unwrap();
        assert_eq!(*luts, loaded);
        assert_eq!(
            std::fs::read(&config.path).unwrap(),
            encode(&loaded, &config)
        );
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let config = LutCacheConfig {
            path: dir.path().join("nested/cache/optical.lut"),
            ..LutCacheConfig::default()
        };
        save(&test_luts(), &config).unwrap();
        assert!(config.path.exists());
    }

    #[test]
    fn test_tag_mismatch_rejected() {
        let luts = test_luts();
        let bytes = encode(&luts, &LutCacheConfig::default());
        let other = LutCacheConfig {
            tag: 0xDEAD_BEEF,
            ..LutCacheConfig::default()
        };
        assert!(matches!(
            decode(&bytes, &other),
            Err(CacheError::TagMismatch { found: DEFAULT_CACHE_TAG, .. })
        ));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let luts = test_luts();
        let bytes = encode(&luts, &LutCacheConfig::default());
        let newer = LutCacheConfig {
            version: DEFAULT_CACHE_VERSION + 1,
            ..LutCacheConfig::default()
        };
        assert!(matches!(
            decode(&bytes, &newer),
            Err(CacheError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_rejected() {
        let luts = test_luts();
        let config = LutCacheConfig::default();
        let bytes = encode(&luts, &config);
        assert!(matches!(
            decode(&bytes[..bytes.len() - 1], &config),
            Err(CacheError::Truncated { .. })
        ));
        assert!(matches!(
            decode(&bytes[..3], &config),
            Err(CacheError::Truncated { actual: 3, .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let luts = test_luts();
        let config = LutCacheConfig::default();
        let mut bytes = encode(&luts, &config);
        bytes.extend_from_slice(&[0, 0]);
        assert!(matches!(
            decode(&bytes, &config),
            Err(CacheError::TrailingBytes { extra: 2 })
        ));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        assert!(matches!(load(&config), Err(CacheError::Read { .. })));
    }

    #[test]
    fn test_load_or_build_uses_valid_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        // Plant a recognisable table; a rebuild would overwrite it.
        let mut planted = (*test_luts()).clone();
        planted.depth[0].mie = 12345.0;
        save(&planted, &config).unwrap();

        let luts = load_or_build_luts(Some(&config));
        assert_eq!(luts.depth_entries()[0].mie, 12345.0);
    }

    #[test]
    fn test_load_or_build_repairs_corrupt_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(&config.path, b"garbage").unwrap();

        let luts = load_or_build_luts(Some(&config));
        assert_eq!(luts, *test_luts());
        assert_eq!(load(&config).unwrap(), luts);
    }
}
