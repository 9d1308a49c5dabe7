//! Shared constants used across QR Share crates.

use std::time::Duration;

/// Default API port for QR Share.
pub const DEFAULT_PORT: u16 = 38420;

/// Default maximum publish body size accepted by the API layer.
pub const DEFAULT_MAX_SHARE_SIZE: usize = 5 * 1024 * 1024;

/// How long a share stays resolvable after its first publish, in seconds.
pub const SHARE_TTL_SECONDS: u64 = 60 * 60 * 24 * 7;

/// [`SHARE_TTL_SECONDS`] as a [`Duration`].
pub const SHARE_RETENTION: Duration = Duration::from_secs(SHARE_TTL_SECONDS);

/// Browser cache lifetime for raw share images, in seconds.
pub const SHARE_IMAGE_MAX_AGE_SECONDS: u64 = 60 * 60;

/// Key prefix for raster objects in the blob store.
pub const BLOB_KEY_PREFIX: &str = "qrcode";

/// Content type recorded for every uploaded raster object.
pub const SHARE_IMAGE_CONTENT_TYPE: &str = "image/png";

/// Public path prefix for share links (`<origin>/s/<id>`).
pub const SHARE_PATH_PREFIX: &str = "/s/";

/// File name for the redb database within the configured DB directory.
pub const REDB_FILE_NAME: &str = "data.redb";

/// Directory name for blobs when `BLOB_PATH` is not set.
pub const DEFAULT_BLOB_DIR_NAME: &str = "blobs";
