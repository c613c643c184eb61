//! Lazy, forward-only reader over a delimited `.tbl` file
//!
//! Lines are pulled one at a time through a buffered async reader, so memory
//! stays bounded by the longest line regardless of file size and a slow read
//! only suspends the task that asked for it.

use std::path::{Path, PathBuf};

use futures::Stream;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::error::{LoadError, Result};

/// Field separator used by the dbgen export
pub const DELIMITER: char = '|';

/// One input line split into its raw fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based line number in the source file
    pub line: u64,
    pub fields: Vec<String>,
}

impl RawRecord {
    /// Split a line on [`DELIMITER`]
    ///
    /// dbgen terminates every line with a delimiter; a single trailing `|`
    /// is treated as that terminator rather than as an empty last field.
    pub fn parse(line: u64, text: &str) -> Self {
        let text = text.strip_suffix('\r').unwrap_or(text);
        let text = text.strip_suffix(DELIMITER).unwrap_or(text);

        Self {
            line,
            fields: text.split(DELIMITER).map(str::to_string).collect(),
        }
    }
}

/// Pull-based sequence of [`RawRecord`]s in file order
///
/// Not restartable. A line that is not valid UTF-8 yields a record-level
/// [`LoadError::InvalidEncoding`] and reading continues. After an I/O error
/// the error is yielded once and the sequence ends.
#[derive(Debug)]
pub struct RecordStream<R = BufReader<File>> {
    path: PathBuf,
    reader: R,
    buf: Vec<u8>,
    line: u64,
    finished: bool,
}

impl RecordStream {
    /// Open `path` for streaming
    ///
    /// A missing file yields [`LoadError::NotFound`]; any other open error is
    /// an [`LoadError::IoFailure`] at line 0.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound { path });
            }
            Err(source) => {
                return Err(LoadError::IoFailure {
                    path,
                    line: 0,
                    source,
                });
            }
        };

        Ok(Self::from_reader(path, BufReader::new(file)))
    }
}

impl<R: AsyncBufRead + Unpin> RecordStream<R> {
    /// Stream records from an already open reader; `path` is used for errors
    pub fn from_reader(path: impl Into<PathBuf>, reader: R) -> Self {
        Self {
            path: path.into(),
            reader,
            buf: Vec::new(),
            line: 0,
            finished: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines handed out so far
    pub fn lines_read(&self) -> u64 {
        self.line
    }

    /// Read the next record, or `None` once the file is exhausted
    pub async fn next_record(&mut self) -> Option<Result<RawRecord>> {
        if self.finished {
            return None;
        }

        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf).await {
            Ok(0) => {
                self.finished = true;
                None
            }
            Ok(_) => {
                self.line += 1;
                let bytes = self.buf.strip_suffix(b"\n").unwrap_or(&self.buf);
                Some(match std::str::from_utf8(bytes) {
                    Ok(text) => Ok(RawRecord::parse(self.line, text)),
                    Err(e) => Err(LoadError::InvalidEncoding {
                        line: self.line,
                        valid_up_to: e.valid_up_to(),
                    }),
                })
            }
            Err(source) => {
                self.finished = true;
                Some(Err(LoadError::IoFailure {
                    path: self.path.clone(),
                    line: self.line,
                    source,
                }))
            }
        }
    }

    /// Adapt into a [`futures::Stream`]
    pub fn into_stream(self) -> impl Stream<Item = Result<RawRecord>> {
        futures::stream::unfold(self, |mut records| async move {
            records.next_record().await.map(|item| (item, records))
        })
    }
}
