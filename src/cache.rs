//! Binary cache lifecycle: naming, validation, and regeneration.
//!
//! The database never trusts a cache file it has not classified. Missing,
//! empty, stale, and format-versioned-away files regenerate silently; a
//! structurally damaged file produces exactly one diagnostic through the
//! client before regeneration. Nothing in this module returns an error to
//! a query path.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::binary::{self, CacheDefect, FORMAT_VERSION, HEADER_LEN};
use crate::client::{ApiClient, Severity};
use crate::model::{Api, ApiLevel};
use crate::parser::{self, ParseError};

/// Cache file name: a pure function of the source stem, the target
/// platform, and a fingerprint of the canonical source path. Two SDKs on
/// the same machine never collide.
pub fn cache_file_name(source: &Path, platform: ApiLevel) -> String {
    let stem = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("api-versions");
    let fingerprint = xxh3_64(source.to_string_lossy().as_bytes());
    format!("{}-{}-{:016x}.bin", stem, platform, fingerprint)
}

/// Classification of an on-disk cache file.
#[derive(Debug)]
pub enum CacheState {
    /// Validated and decoded
    Valid(Api),
    /// No file, or a zero-length file
    Missing,
    /// Source XML is newer than the cache
    Stale,
    /// Written by a different format version of this crate
    Unsupported { found: u32 },
    /// Written for a different platform level
    WrongPlatform { found: ApiLevel },
    /// Structurally damaged
    Corrupt(CacheDefect),
}

/// Classify a cache file without touching the source XML.
///
/// Order matters: existence and staleness are settled from metadata alone,
/// then the full image is validated (header, length, checksum) before any
/// payload decode.
pub fn inspect(cache_path: &Path, source_path: &Path, platform: ApiLevel) -> CacheState {
    let metadata = match fs::metadata(cache_path) {
        Ok(metadata) => metadata,
        Err(_) => return CacheState::Missing,
    };
    if metadata.len() == 0 {
        return CacheState::Missing;
    }

    if let (Ok(cache_modified), Ok(source_modified)) = (
        metadata.modified(),
        fs::metadata(source_path).and_then(|m| m.modified()),
    ) {
        if source_modified > cache_modified {
            return CacheState::Stale;
        }
    }

    let bytes = match fs::read(cache_path) {
        Ok(bytes) => bytes,
        Err(error) => {
            debug!("Cache {} unreadable: {}", cache_path.display(), error);
            return CacheState::Missing;
        }
    };

    let header = match binary::validate(&bytes) {
        Ok(header) => header,
        Err(defect) => return CacheState::Corrupt(defect),
    };
    if header.format_version != FORMAT_VERSION {
        return CacheState::Unsupported {
            found: header.format_version,
        };
    }
    if header.platform != platform {
        return CacheState::WrongPlatform {
            found: header.platform,
        };
    }

    match binary::decode_payload(&bytes[HEADER_LEN..]) {
        Ok((schema_version, classes)) => CacheState::Valid(Api {
            schema_version,
            classes,
        }),
        Err(defect) => CacheState::Corrupt(defect),
    }
}

/// Result of [`load_or_rebuild`].
pub struct LoadOutcome {
    pub api: Api,
    /// Cache file backing this database, when caching was in play
    pub cache_path: Option<PathBuf>,
    pub loaded_from_cache: bool,
}

/// The construction protocol: use a valid cache, otherwise parse the XML
/// and rewrite the cache. Only a missing/unparseable source is an error;
/// every cache problem recovers.
pub fn load_or_rebuild(
    client: &dyn ApiClient,
    source: &Path,
    platform: ApiLevel,
) -> Result<LoadOutcome, ParseError> {
    let Some(cache_dir) = client.cache_dir() else {
        debug!("No cache directory configured, parsing {}", source.display());
        return Ok(LoadOutcome {
            api: parser::parse_file(source)?,
            cache_path: None,
            loaded_from_cache: false,
        });
    };

    if let Err(error) = fs::create_dir_all(&cache_dir) {
        client.log(
            Severity::Warning,
            Some(&error),
            &format!(
                "failed to create API database cache directory {}",
                cache_dir.display()
            ),
        );
        return Ok(LoadOutcome {
            api: parser::parse_file(source)?,
            cache_path: None,
            loaded_from_cache: false,
        });
    }

    let cache_path = cache_dir.join(cache_file_name(source, platform));
    match inspect(&cache_path, source, platform) {
        CacheState::Valid(api) => {
            debug!("Loaded API database from cache {}", cache_path.display());
            Ok(LoadOutcome {
                api,
                cache_path: Some(cache_path),
                loaded_from_cache: true,
            })
        }
        CacheState::Missing => rebuild(client, source, platform, cache_path),
        CacheState::Stale => {
            debug!("Cache {} is older than its source", cache_path.display());
            rebuild(client, source, platform, cache_path)
        }
        CacheState::Unsupported { found } => {
            debug!(
                "Cache {} uses format v{}, expected v{}",
                cache_path.display(),
                found,
                FORMAT_VERSION
            );
            rebuild(client, source, platform, cache_path)
        }
        CacheState::WrongPlatform { found } => {
            debug!(
                "Cache {} was built for platform {}, expected {}",
                cache_path.display(),
                found,
                platform
            );
            rebuild(client, source, platform, cache_path)
        }
        CacheState::Corrupt(defect) => {
            client.log(
                Severity::Warning,
                None,
                &format!(
                    "API database cache is invalid: {}. Please delete the file and restart the IDE/lint: {}",
                    defect,
                    cache_path.display()
                ),
            );
            rebuild(client, source, platform, cache_path)
        }
    }
}

fn rebuild(
    client: &dyn ApiClient,
    source: &Path,
    platform: ApiLevel,
    cache_path: PathBuf,
) -> Result<LoadOutcome, ParseError> {
    let api = parser::parse_file(source)?;
    write_cache(client, &api, platform, &cache_path);
    Ok(LoadOutcome {
        api,
        cache_path: Some(cache_path),
        loaded_from_cache: false,
    })
}

/// Encode and persist a cache image. A write failure is logged and the
/// in-memory model is used as-is; construction never fails over it.
pub fn write_cache(client: &dyn ApiClient, api: &Api, platform: ApiLevel, cache_path: &Path) -> bool {
    let image = binary::encode(api, platform);
    match write_atomically(cache_path, &image) {
        Ok(()) => {
            debug!(
                "Wrote API database cache {} ({} bytes)",
                cache_path.display(),
                image.len()
            );
            true
        }
        Err(error) => {
            client.log(
                Severity::Warning,
                Some(&error),
                &format!(
                    "failed to write API database cache {}",
                    cache_path.display()
                ),
            );
            false
        }
    }
}

// Racing builders each write their own temp file and rename into place;
// encoding is deterministic, so the loser overwrites with identical bytes.
fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}", std::process::id()));
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}
