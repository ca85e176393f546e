//! Download cache.
//!
//! Archives are stored under their URL's file name. An entry that exists is
//! reused as-is; nothing is ever invalidated automatically. Downloads land in
//! a temporary file inside the cache directory and are renamed into place, so
//! an interrupted fetch never leaves a truncated entry behind.

use std::fs;
use std::sync::Arc;

use camino::Utf8PathBuf;
use url::Url;

use crate::error::ProvisionError;
use crate::fetch::Fetcher;

pub struct DownloadCache {
    dir: Utf8PathBuf,
    fetcher: Arc<dyn Fetcher>,
}

impl DownloadCache {
    pub fn new(dir: impl Into<Utf8PathBuf>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            dir: dir.into(),
            fetcher,
        }
    }

    /// Cache path for `url`.
    pub fn entry_path(&self, url: &Url) -> Result<Utf8PathBuf, ProvisionError> {
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                ProvisionError::Validation(format!("url has no file name to cache: {}", url))
            })?;
        Ok(self.dir.join(name))
    }

    /// Returns the cached archive for `url`, downloading it on a miss.
    pub fn get(&self, url: &Url) -> Result<Utf8PathBuf, ProvisionError> {
        let path = self.entry_path(url)?;
        if path.is_file() {
            tracing::debug!("cache hit: {}", path);
            return Ok(path);
        }

        fs::create_dir_all(&self.dir)
            .map_err(|e| ProvisionError::io(format!("failed to create cache: {}", self.dir), e))?;

        tracing::info!("downloading {}", url);
        let mut partial = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| ProvisionError::io(format!("failed to create temp file in {}", self.dir), e))?;
        let bytes = self.fetcher.fetch(url, partial.as_file_mut())?;
        partial
            .persist(&path)
            .map_err(|e| ProvisionError::io(format!("failed to store {}", path), e.error))?;

        tracing::info!("cached {} ({} bytes)", path, bytes);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use camino::Utf8Path;

    use super::*;

    struct CountingFetcher {
        calls: Mutex<usize>,
    }

    impl Fetcher for CountingFetcher {
        fn fetch(&self, _url: &Url, dest: &mut dyn Write) -> Result<u64, ProvisionError> {
            *self.calls.lock().unwrap() += 1;
            dest.write_all(b"payload").unwrap();
            Ok(7)
        }
    }

    struct FailingFetcher;

    impl Fetcher for FailingFetcher {
        fn fetch(&self, url: &Url, _dest: &mut dyn Write) -> Result<u64, ProvisionError> {
            Err(ProvisionError::Download {
                url: url.to_string(),
                status: "404 Not Found".to_string(),
            })
        }
    }

    fn cache_dir(tmp: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8Path::from_path(tmp.path()).unwrap().join("cache")
    }

    #[test]
    fn miss_downloads_then_hit_reuses() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher {
            calls: Mutex::new(0),
        });
        let cache = DownloadCache::new(cache_dir(&tmp), fetcher.clone());
        let url = Url::parse("https://example.com/a/geoserver-2.24.2-war.zip").unwrap();

        let first = cache.get(&url).unwrap();
        let second = cache.get(&url).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.file_name(), Some("geoserver-2.24.2-war.zip"));
        assert_eq!(fs::read(&first).unwrap(), b"payload");
        assert_eq!(*fetcher.calls.lock().unwrap(), 1);
    }

    #[test]
    fn failed_download_leaves_no_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DownloadCache::new(cache_dir(&tmp), Arc::new(FailingFetcher));
        let url = Url::parse("https://example.com/missing.zip").unwrap();

        let err = cache.get(&url).unwrap_err();
        assert!(matches!(err, ProvisionError::Download { .. }));
        assert!(!cache.entry_path(&url).unwrap().exists());
        assert_eq!(fs::read_dir(&cache.dir).unwrap().count(), 0);
    }

    #[test]
    fn url_without_file_name_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DownloadCache::new(cache_dir(&tmp), Arc::new(FailingFetcher));
        let url = Url::parse("https://example.com/dir/").unwrap();
        assert!(matches!(cache.entry_path(&url), Err(ProvisionError::Validation(_))));
    }
}
