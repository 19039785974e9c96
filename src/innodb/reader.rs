//! Aligned, governed page reads.
//!
//! [`PageReader`] owns the tablespace file handle and delivers whole pages by
//! page number. Reads go to 4 KiB-aligned buffers so the file can be opened
//! with O_DIRECT where the platform supports it, results are cached by page
//! number for the lifetime of the reader, and every uncached read first
//! passes through the I/O governor (rate limiter + iowait brake). During an
//! adaptive pause the reader's file descriptor is closed and reopened with
//! the same flags via [`PauseHooks`].

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::innodb::constants::{IO_ALIGN, SIZE_PAGE_DEFAULT};
use crate::monitor::{IoRateLimiter, IoWaitBrake, PauseHooks};
use crate::UsageError;

/// Byte buffer whose payload starts on an IO_ALIGN boundary.
///
/// Over-allocates by one alignment unit and exposes the sub-slice starting at
/// the next aligned address, which satisfies direct-I/O buffer requirements
/// without unsafe allocation.
pub struct AlignedBuf {
    raw: Vec<u8>,
    start: usize,
    len: usize,
}

impl AlignedBuf {
    pub fn new(len: usize) -> Self {
        let raw = vec![0u8; len + IO_ALIGN];
        let start = raw.as_ptr().align_offset(IO_ALIGN);
        AlignedBuf { raw, start, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shrink the visible payload; the aligned start is unchanged.
    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.raw[self.start..self.start + self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.raw[self.start..self.start + self.len]
    }
}

/// Open a data file read-only, unbuffered where the platform allows.
///
/// Filesystems without O_DIRECT support (tmpfs, some network mounts) reject
/// the flag; those fall back to ordinary buffered reads, where the aligned
/// buffers are merely a no-op safety margin.
fn open_data_file(path: &Path) -> io::Result<File> {
    #[cfg(target_os = "linux")]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if let Ok(file) = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_DIRECT)
            .open(path)
        {
            return Ok(file);
        }
    }
    OpenOptions::new().read(true).open(path)
}

/// The reader's file handle, detachable during an adaptive pause.
struct DataFile {
    path: PathBuf,
    file: Option<File>,
}

impl DataFile {
    fn file_mut(&mut self) -> io::Result<&mut File> {
        self.file.as_mut().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotConnected,
                "data file closed during an I/O pause",
            )
        })
    }
}

impl PauseHooks for DataFile {
    fn on_pause(&mut self) {
        // Drop the descriptor so the kernel pressure attributable to this
        // parse disappears while we wait.
        self.file = None;
    }

    fn on_resume(&mut self) -> io::Result<()> {
        self.file = Some(open_data_file(&self.path)?);
        Ok(())
    }
}

/// Fill `buf` from the current file position, tolerating partial reads.
fn read_full(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn fetch_page(
    data: &mut DataFile,
    limiter: &IoRateLimiter,
    brake: &IoWaitBrake,
    page_size: u64,
    page_no: u32,
) -> Result<AlignedBuf, UsageError> {
    limiter.wait();
    brake.check(data)?;

    let file = data.file_mut()?;
    file.seek(SeekFrom::Start(u64::from(page_no) * page_size))?;

    let mut buf = AlignedBuf::new(page_size as usize);
    let got = read_full(file, buf.as_mut_slice())?;
    if got < page_size as usize {
        return Err(UsageError::ShortRead {
            page: page_no,
            expected: page_size as usize,
            got,
        });
    }
    Ok(buf)
}

/// Cached, governed page reader over one tablespace file.
pub struct PageReader {
    data: DataFile,
    page_size: u64,
    file_size: u64,
    cache: HashMap<u32, AlignedBuf>,
    limiter: IoRateLimiter,
    brake: IoWaitBrake,
    physical_reads: u64,
}

impl PageReader {
    /// Open `path` and stat its size. The page size defaults to 16 KiB until
    /// the caller detects the real one and calls [`PageReader::set_page_size`].
    pub fn open(path: &Path, limiter: IoRateLimiter, brake: IoWaitBrake) -> Result<Self, UsageError> {
        let file = open_data_file(path).map_err(|e| UsageError::FileOpen {
            path: path.display().to_string(),
            source: e,
        })?;
        let file_size = file.metadata()?.len();

        Ok(PageReader {
            data: DataFile {
                path: path.to_path_buf(),
                file: Some(file),
            },
            page_size: u64::from(SIZE_PAGE_DEFAULT),
            file_size,
            cache: HashMap::new(),
            limiter,
            brake,
            physical_reads: 0,
        })
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: u64) {
        self.page_size = page_size;
    }

    /// Number of reads that actually hit the file (cache misses).
    pub fn physical_reads(&self) -> u64 {
        self.physical_reads
    }

    /// Read `len` bytes from the start of the file, bypassing the cache.
    ///
    /// Used for page-size detection, where the page-0 prefix must be read
    /// before the real page size is known.
    pub fn read_prefix(&mut self, len: usize) -> Result<AlignedBuf, UsageError> {
        self.limiter.wait();
        self.brake.check(&mut self.data)?;

        let file = self.data.file_mut()?;
        file.seek(SeekFrom::Start(0))?;

        let mut buf = AlignedBuf::new(len);
        let got = read_full(file, buf.as_mut_slice())?;
        if got < len {
            return Err(UsageError::ShortRead {
                page: 0,
                expected: len,
                got,
            });
        }
        self.physical_reads += 1;
        Ok(buf)
    }

    /// Store a prefix buffer as page 0, avoiding a re-read once the real
    /// page size is known. Ignored when the prefix is shorter than a page.
    pub fn seed_page0(&mut self, mut buf: AlignedBuf) {
        let page_size = self.page_size as usize;
        if buf.len() >= page_size {
            buf.truncate(page_size);
            self.cache.insert(0, buf);
        }
    }

    /// Read one page, from cache when possible.
    pub fn read_page(&mut self, page_no: u32) -> Result<&[u8], UsageError> {
        match self.cache.entry(page_no) {
            Entry::Occupied(entry) => Ok(entry.into_mut().as_slice()),
            Entry::Vacant(entry) => {
                let buf = fetch_page(
                    &mut self.data,
                    &self.limiter,
                    &self.brake,
                    self.page_size,
                    page_no,
                )?;
                self.physical_reads += 1;
                Ok(entry.insert(buf).as_slice())
            }
        }
    }
}
