use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use once_cell::sync::Lazy;

use super::RandomAccess;

/// Local file source with random access support.
pub struct FileSource {
    file: File,
    size: u64,
    // Non-unix targets have no positional read, so the seek+read pair must
    // be serialized against other readers of the same handle.
    #[cfg(not(unix))]
    cursor: Mutex<()>,
}

impl FileSource {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file,
            size,
            #[cfg(not(unix))]
            cursor: Mutex::new(()),
        })
    }
}

#[async_trait]
impl RandomAccess for FileSource {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file.read_at(buf, offset)
        }

        #[cfg(not(unix))]
        {
            use std::io::{Read, Seek, SeekFrom};
            let _guard = self.cursor.lock().unwrap();
            let mut file = &self.file;
            file.seek(SeekFrom::Start(offset))?;
            file.read(buf)
        }
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// Process-wide table of already-open root files, keyed by canonical path.
///
/// Entries are weak: the table records handles for reuse but never keeps
/// them alive. Once every resolver holding a handle drops it, the file
/// descriptor is closed and the entry becomes dead.
static ROOT_SOURCES: Lazy<Mutex<HashMap<PathBuf, Weak<FileSource>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Open a file source, reusing a live handle if the same physical file was
/// opened before (possibly through a different path spelling).
pub fn open_shared(path: &Path) -> std::io::Result<Arc<FileSource>> {
    let key = path.canonicalize()?;
    let mut cache = ROOT_SOURCES.lock().unwrap();
    if let Some(existing) = cache.get(&key).and_then(Weak::upgrade) {
        return Ok(existing);
    }
    let source = Arc::new(FileSource::open(&key)?);
    cache.retain(|_, weak| weak.strong_count() > 0);
    cache.insert(key, Arc::downgrade(&source));
    Ok(source)
}
