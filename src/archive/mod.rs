// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Incremental zip assembly
//!
//! Folder downloads and batch downloads are served as zip archives built
//! entry by entry: the assembler pulls each entry's content from its backend
//! (an open file, an object-store get stream, or an in-memory buffer) and
//! pushes compressed chunks to the output as they are produced, so the whole
//! archive is never buffered when the output is a stream. The central
//! directory is written only after the last entry completes; any error while
//! appending aborts the archive and invalidates partially-written output.

use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_zip::tokio::write::ZipFileWriter;
use async_zip::{Compression, ZipEntryBuilder};
use bytes::Bytes;
use futures::io::AsyncWriteExt;
use futures::stream::{self, BoxStream, StreamExt};
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tokio_util::sync::PollSender;
use tracing::debug;

use crate::storage::error::{StorageError, StorageResult};

/// Where one archive entry's content comes from.
pub enum EntryContent {
    /// A file on the local filesystem, opened and streamed lazily
    LocalFile(PathBuf),
    /// An object fetched from a blob store, streamed chunk by chunk
    Object {
        store: Arc<dyn ObjectStore>,
        location: ObjectPath,
    },
    /// Content already materialized in memory
    Bytes(Bytes),
}

/// One entry of an archive under assembly.
pub struct ArchiveEntry {
    /// Entry name inside the archive, forward-slash separated
    pub name: String,
    /// Content source, read when the entry is appended
    pub content: EntryContent,
}

impl ArchiveEntry {
    /// Entry backed by a local file.
    pub fn local_file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            content: EntryContent::LocalFile(path.into()),
        }
    }

    /// Entry backed by a stored object.
    pub fn object(name: impl Into<String>, store: Arc<dyn ObjectStore>, location: ObjectPath) -> Self {
        Self {
            name: name.into(),
            content: EntryContent::Object { store, location },
        }
    }

    /// Entry backed by in-memory bytes.
    pub fn bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: EntryContent::Bytes(data.into()),
        }
    }
}

/// Push-based incremental zip writer.
///
/// Entries are appended one at a time and compressed with Deflate; the
/// central directory is finalized by [`finish`](Self::finish). Dropping the
/// assembler without finishing leaves the output invalid.
pub struct ZipAssembler<W: AsyncWrite + Unpin> {
    inner: ZipFileWriter<W>,
}

impl<W: AsyncWrite + Unpin> ZipAssembler<W> {
    /// Start a new archive on `out`.
    pub fn new(out: W) -> Self {
        Self {
            inner: ZipFileWriter::with_tokio(out),
        }
    }

    /// Append one entry, streaming its content from the backend.
    ///
    /// # Errors
    ///
    /// Any read or write failure aborts the entry and must abort the whole
    /// archive: the output written so far is not a usable zip.
    pub async fn append(&mut self, entry: ArchiveEntry) -> StorageResult<()> {
        debug!("Appending archive entry name={}", entry.name);
        let builder = ZipEntryBuilder::new(entry.name.into(), Compression::Deflate);

        match entry.content {
            EntryContent::Bytes(data) => {
                self.inner.write_entry_whole(builder, &data).await?;
            }
            EntryContent::LocalFile(path) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .map_err(|e| StorageError::from_io(&path, e))?;
                let mut entry_writer = self.inner.write_entry_stream(builder).await?;
                futures::io::copy(file.compat(), &mut entry_writer).await?;
                entry_writer.close().await?;
            }
            EntryContent::Object { store, location } => {
                let mut chunks = store.get(&location).await?.into_stream();
                let mut entry_writer = self.inner.write_entry_stream(builder).await?;
                while let Some(chunk) = chunks.next().await {
                    let chunk = chunk?;
                    entry_writer.write_all(&chunk).await?;
                }
                entry_writer.close().await?;
            }
        }

        Ok(())
    }

    /// Write the central directory and flush the output.
    pub async fn finish(self) -> StorageResult<()> {
        self.inner.close().await?;
        Ok(())
    }
}

/// Assemble a complete archive from `entries` onto `out`.
///
/// # Errors
///
/// Fails fast on the first entry error; the output is then invalid.
pub async fn write_zip<W>(entries: Vec<ArchiveEntry>, out: W) -> StorageResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut assembler = ZipAssembler::new(out);
    for entry in entries {
        assembler.append(entry).await?;
    }
    assembler.finish().await
}

/// Assemble an archive in the background and return its chunk stream.
///
/// The consumer pulls compressed chunks as they are produced. If assembly
/// fails, the error is surfaced as the stream's final item and the output
/// received so far must be discarded. If the consumer disconnects, the
/// writer's next send fails and remaining reads and writes stop.
pub fn zip_stream(entries: Vec<ArchiveEntry>) -> BoxStream<'static, StorageResult<Bytes>> {
    let (tx, rx) = mpsc::channel::<StorageResult<Bytes>>(8);

    tokio::spawn(async move {
        let writer = ChannelWriter::new(PollSender::new(tx.clone()));
        if let Err(e) = write_zip(entries, writer).await {
            // Consumer may already be gone; nothing left to report then.
            let _ = tx.send(Err(e)).await;
        }
    });

    stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    })
    .boxed()
}

/// Adapter presenting a bounded channel as an `AsyncWrite` sink.
struct ChannelWriter {
    tx: PollSender<StorageResult<Bytes>>,
}

impl ChannelWriter {
    fn new(tx: PollSender<StorageResult<Bytes>>) -> Self {
        Self { tx }
    }
}

fn consumer_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "archive consumer disconnected")
}

impl AsyncWrite for ChannelWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match futures::ready!(this.tx.poll_reserve(cx)) {
            Ok(()) => {
                if this.tx.send_item(Ok(Bytes::copy_from_slice(buf))).is_err() {
                    return Poll::Ready(Err(consumer_gone()));
                }
                Poll::Ready(Ok(buf.len()))
            }
            Err(_) => Poll::Ready(Err(consumer_gone())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_zip::base::read::mem::ZipFileReader;
    use std::io::Cursor;

    async fn read_entries(data: Vec<u8>) -> Vec<(String, Vec<u8>)> {
        let reader = ZipFileReader::new(data).await.unwrap();
        let count = reader.file().entries().len();
        let mut out = Vec::new();
        for index in 0..count {
            let name = reader.file().entries()[index]
                .filename()
                .as_str()
                .unwrap()
                .to_string();
            let mut entry_reader = reader.reader_with_entry(index).await.unwrap();
            let mut content = Vec::new();
            entry_reader.read_to_end_checked(&mut content).await.unwrap();
            out.push((name, content));
        }
        out
    }

    #[tokio::test]
    async fn test_write_zip_bytes_entries_round_trip() {
        let entries = vec![
            ArchiveEntry::bytes("a.txt", "alpha".as_bytes().to_vec()),
            ArchiveEntry::bytes("sub/b.txt", "bravo".as_bytes().to_vec()),
        ];

        let mut cursor = Cursor::new(Vec::new());
        write_zip(entries, &mut cursor).await.unwrap();

        let listed = read_entries(cursor.into_inner()).await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], ("a.txt".to_string(), b"alpha".to_vec()));
        assert_eq!(listed[1], ("sub/b.txt".to_string(), b"bravo".to_vec()));
    }

    #[tokio::test]
    async fn test_write_zip_local_file_entry() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("data.bin");
        tokio::fs::write(&file_path, b"local content").await.unwrap();

        let entries = vec![ArchiveEntry::local_file("data.bin", &file_path)];
        let mut cursor = Cursor::new(Vec::new());
        write_zip(entries, &mut cursor).await.unwrap();

        let listed = read_entries(cursor.into_inner()).await;
        assert_eq!(listed, vec![("data.bin".to_string(), b"local content".to_vec())]);
    }

    #[tokio::test]
    async fn test_write_zip_object_entry() {
        let store: Arc<dyn ObjectStore> = Arc::new(object_store::memory::InMemory::new());
        let location = ObjectPath::from("docs/x.txt");
        store
            .put(&location, Bytes::from_static(b"from blob").into())
            .await
            .unwrap();

        let entries = vec![ArchiveEntry::object("docs/x.txt", store, location)];
        let mut cursor = Cursor::new(Vec::new());
        write_zip(entries, &mut cursor).await.unwrap();

        let listed = read_entries(cursor.into_inner()).await;
        assert_eq!(listed, vec![("docs/x.txt".to_string(), b"from blob".to_vec())]);
    }

    #[tokio::test]
    async fn test_zip_stream_round_trip() {
        let entries = vec![ArchiveEntry::bytes("only.txt", "streamed".as_bytes().to_vec())];
        let mut stream = zip_stream(entries);

        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk.unwrap());
        }

        let listed = read_entries(data).await;
        assert_eq!(listed, vec![("only.txt".to_string(), b"streamed".to_vec())]);
    }

    #[tokio::test]
    async fn test_zip_stream_surfaces_entry_error() {
        let entries = vec![
            ArchiveEntry::bytes("ok.txt", "fine".as_bytes().to_vec()),
            ArchiveEntry::local_file("gone.txt", "/nonexistent/definitely/gone.txt"),
        ];
        let mut stream = zip_stream(entries);

        let mut saw_error = false;
        while let Some(chunk) = stream.next().await {
            if let Err(e) = chunk {
                assert!(e.is_not_found(), "unexpected error: {e}");
                saw_error = true;
            }
        }
        assert!(saw_error, "stream completed without surfacing the error");
    }

    #[tokio::test]
    async fn test_empty_archive_is_valid() {
        let mut cursor = Cursor::new(Vec::new());
        write_zip(Vec::new(), &mut cursor).await.unwrap();
        assert!(read_entries(cursor.into_inner()).await.is_empty());
    }
}
