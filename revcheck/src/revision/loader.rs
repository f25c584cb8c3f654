//! Padded file loading
//!
//! Every file taking part in a check is extended to a multiple of 1024
//! bytes with a descending filler (`0xFF`, `0xFE`, ... wrapping through
//! `0x00`). Files already on a 1024-byte boundary, including empty ones,
//! get no padding.

use super::program::{ChecksumPass, Evaluate};
use crate::config::LoadStrategy;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Padding granularity in bytes
pub const PAD_BLOCK: usize = 1024;

/// Number of files hashed by a revision check
pub const FILE_COUNT: usize = 3;

/// Most file sets kept resident by [`LoadStrategy::PreloadRetain`]
pub const MAX_RETAINED_SETS: usize = 4;

/// Reader adaptor that appends the revision check padding at EOF
#[derive(Debug)]
pub struct PaddedReader<R> {
    inner: R,
    consumed: u64,
    padding: Option<usize>,
    filler: u8,
}

impl<R: Read> PaddedReader<R> {
    /// Wrap a reader
    pub fn new(inner: R) -> Self {
        PaddedReader {
            inner,
            consumed: 0,
            padding: None,
            filler: 0xFF,
        }
    }
}

impl<R: Read> Read for PaddedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.padding.is_none() {
            let n = self.inner.read(buf)?;
            if n > 0 {
                self.consumed += n as u64;
                return Ok(n);
            }
            let rem = (self.consumed % PAD_BLOCK as u64) as usize;
            self.padding = Some(if rem == 0 { 0 } else { PAD_BLOCK - rem });
        }

        let remaining = self.padding.get_or_insert(0);
        let n = (*remaining).min(buf.len());
        for byte in &mut buf[..n] {
            *byte = self.filler;
            self.filler = self.filler.wrapping_sub(1);
        }
        *remaining -= n;
        Ok(n)
    }
}

/// Pad a buffer in place
pub fn pad_buffer(data: &mut Vec<u8>) {
    let rem = data.len() % PAD_BLOCK;
    if rem == 0 {
        return;
    }
    let mut filler = 0xFFu8;
    data.extend((rem..PAD_BLOCK).map(|_| {
        let b = filler;
        filler = filler.wrapping_sub(1);
        b
    }));
}

/// Read a whole file and pad it
pub fn read_padded<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut data = Vec::new();
    PaddedReader::new(file)
        .read_to_end(&mut data)
        .map_err(|e| Error::io(path, e))?;
    log::trace!("Loaded {} padded bytes from {}", data.len(), path.display());
    Ok(data)
}

/// Fill `buf` as far as the reader allows, returning the byte count
fn fill_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Stream padded files through a checksum pass without buffering them whole
pub fn stream_padded<P, E>(paths: &[P; FILE_COUNT], pass: &mut ChecksumPass<'_, E>) -> Result<()>
where
    P: AsRef<Path>,
    E: Evaluate + ?Sized,
{
    let mut chunk = [0u8; PAD_BLOCK];

    for path in paths {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut reader = PaddedReader::new(io::BufReader::new(file));

        loop {
            let n = fill_chunk(&mut reader, &mut chunk).map_err(|e| Error::io(path, e))?;
            if n == 0 {
                break;
            }
            pass.feed(&chunk[..n])?;
        }
    }

    Ok(())
}

/// The padded contents of the files of one check, in caller order
#[derive(Debug, Clone)]
pub struct PaddedFileSet {
    files: Vec<Arc<[u8]>>,
}

impl PaddedFileSet {
    /// Build a set from already padded buffers
    pub fn from_padded(files: Vec<Arc<[u8]>>) -> Self {
        PaddedFileSet { files }
    }

    /// Pad raw file contents and build a set
    pub fn from_raw<I, B>(contents: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        let files = contents
            .into_iter()
            .map(|raw| {
                let mut data: Vec<u8> = raw.into();
                pad_buffer(&mut data);
                Arc::from(data)
            })
            .collect();
        PaddedFileSet { files }
    }

    /// Padded bytes of each file
    pub fn files(&self) -> &[Arc<[u8]>] {
        &self.files
    }

    /// Padded length of each file
    pub fn file_lengths(&self) -> Vec<usize> {
        self.files.iter().map(|f| f.len()).collect()
    }

    /// Total padded length
    pub fn len(&self) -> usize {
        self.files.iter().map(|f| f.len()).sum()
    }

    /// Whether the set holds no bytes at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All padded bytes, concatenated
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for file in &self.files {
            out.extend_from_slice(file);
        }
        out
    }

    /// Little-endian words of the concatenated data
    pub fn words(&self) -> impl Iterator<Item = u32> + '_ {
        self.files.iter().flat_map(|file| {
            file.chunks_exact(4)
                .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        })
    }

    /// Feed every file through a checksum pass
    pub fn feed<E: Evaluate + ?Sized>(&self, pass: &mut ChecksumPass<'_, E>) -> Result<()> {
        for file in &self.files {
            pass.feed(file)?;
        }
        Ok(())
    }
}

type RetainedFiles = HashMap<PathBuf, Arc<[u8]>>;

#[derive(Debug, Default)]
struct RetainedSets {
    sets: HashMap<Vec<PathBuf>, RetainedFiles>,
    order: VecDeque<Vec<PathBuf>>,
}

impl RetainedSets {
    fn insert(&mut self, key: Vec<PathBuf>, files: RetainedFiles) {
        if self.sets.insert(key.clone(), files).is_none() {
            self.order.push_back(key);
        }
        while self.sets.len() > MAX_RETAINED_SETS {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.sets.remove(&oldest);
            log::debug!("Dropped retained file set {:?}", oldest);
        }
    }

    fn clear(&mut self) {
        self.sets.clear();
        self.order.clear();
    }
}

/// Loads files according to a [`LoadStrategy`]
///
/// With [`LoadStrategy::PreloadRetain`] padded buffers stay resident,
/// keyed by the sorted set of paths, so repeating a check touches no disk.
/// A set costs as much memory as its padded files; at most
/// [`MAX_RETAINED_SETS`] are kept, the oldest going first.
#[derive(Debug)]
pub struct PaddedFileLoader {
    strategy: LoadStrategy,
    retained: Mutex<RetainedSets>,
}

impl PaddedFileLoader {
    /// Create a loader for a strategy
    pub fn new(strategy: LoadStrategy) -> Self {
        PaddedFileLoader {
            strategy,
            retained: Mutex::new(RetainedSets::default()),
        }
    }

    /// The strategy in use
    pub fn strategy(&self) -> LoadStrategy {
        self.strategy
    }

    /// Load and pad all files into memory
    ///
    /// Retained sets are reused when the strategy allows it.
    pub fn load<P: AsRef<Path>>(&self, paths: &[P; FILE_COUNT]) -> Result<PaddedFileSet> {
        let paths: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();

        if self.strategy != LoadStrategy::PreloadRetain {
            let files = paths
                .iter()
                .map(|p| read_padded(p).map(Arc::<[u8]>::from))
                .collect::<Result<Vec<_>>>()?;
            return Ok(PaddedFileSet::from_padded(files));
        }

        let mut key = paths.clone();
        key.sort();

        if let Some(set) = self.retained.lock().sets.get(&key) {
            if let Some(files) = paths
                .iter()
                .map(|p| set.get(p).cloned())
                .collect::<Option<Vec<_>>>()
            {
                log::debug!("Reusing retained file set {:?}", key);
                return Ok(PaddedFileSet::from_padded(files));
            }
        }

        let mut set = RetainedFiles::new();
        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            let data: Arc<[u8]> = match set.get(path) {
                Some(data) => data.clone(),
                None => Arc::from(read_padded(path)?),
            };
            set.insert(path.clone(), data.clone());
            files.push(data);
        }

        log::debug!("Retaining file set {:?}", key);
        self.retained.lock().insert(key, set);
        Ok(PaddedFileSet::from_padded(files))
    }

    /// Run a checksum pass over the files using the configured strategy
    pub fn run<P, E>(&self, paths: &[P; FILE_COUNT], pass: &mut ChecksumPass<'_, E>) -> Result<()>
    where
        P: AsRef<Path>,
        E: Evaluate + ?Sized,
    {
        match self.strategy {
            LoadStrategy::OnDemand => stream_padded(paths, pass),
            LoadStrategy::Preload | LoadStrategy::PreloadRetain => self.load(paths)?.feed(pass),
        }
    }

    /// Number of retained file sets
    pub fn retained_sets(&self) -> usize {
        self.retained.lock().sets.len()
    }

    /// Drop every retained file set
    pub fn clear_retained(&self) {
        self.retained.lock().clear();
    }
}
