use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use exn::ResultExt;

use crate::geo::Viewport;

const VIEWPORT_FILE: &str = "viewport.json";

/// Errors returned by [`ViewportStore`] operations.
#[derive(Debug)]
pub struct Error(String);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Error {}

/// File-backed cache of the last viewed map location.
///
/// Stored as `{"center":[lon,lat],"zoom":z}`. Read once at startup, written
/// on every viewport change; the last writer wins.
#[derive(Debug, Clone)]
pub struct ViewportStore {
    path: PathBuf,
}

impl ViewportStore {
    /// Open (and create if needed) the cache directory `dir`.
    pub fn open(dir: &Path) -> exn::Result<Self, Error> {
        fs::create_dir_all(dir)
            .or_raise(|| Error(format!("create data dir {}", dir.display())))?;
        Ok(Self {
            path: dir.join(VIEWPORT_FILE),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The last saved viewport, or [`Viewport::default`] when nothing usable
    /// is stored.
    #[must_use]
    pub fn load(&self) -> Viewport {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Viewport::default(),
            Err(e) => {
                tracing::warn!(%e, path = %self.path.display(), "failed to read last viewport");
                return Viewport::default();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(viewport) => viewport,
            Err(e) => {
                tracing::warn!(%e, path = %self.path.display(), "ignoring unreadable last viewport");
                Viewport::default()
            }
        }
    }

    /// Persist `viewport`, replacing whatever was stored.
    pub fn save(&self, viewport: &Viewport) -> exn::Result<(), Error> {
        let bytes = serde_json::to_vec(viewport).or_raise(|| Error("serialize viewport".into()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).or_raise(|| Error(format!("write {}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .or_raise(|| Error(format!("replace {}", self.path.display())))?;
        tracing::trace!(center = %viewport.center, zoom = viewport.zoom, "viewport saved");
        Ok(())
    }
}
