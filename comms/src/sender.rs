use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{LenType, MAX_FRAME_LEN, Serialize, frame_too_long};

/// The sending end of a framed channel.
pub struct OnoSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    body: Vec<u8>,
    max_frame_len: usize,
}

impl<W: AsyncWrite + Unpin> OnoSender<W> {
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            body: Vec::new(),
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    /// Sets the longest body this sender accepts to write.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Writes `msg` as a single frame and flushes the writer.
    ///
    /// The owned part of the serialization is staged in an internal buffer,
    /// the borrowed part (e.g. a loss vector) is written straight from `msg`.
    ///
    /// # Errors
    /// Returns `io::ErrorKind::InvalidData` without writing anything if the
    /// frame is longer than the limit, or the writer's error.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        self.body.clear();
        let borrowed = msg.serialize(&mut self.body).unwrap_or_default();

        let len = self.body.len() + borrowed.len();
        if len > self.max_frame_len {
            return Err(frame_too_long(len, self.max_frame_len));
        }

        self.tx.write_all(&(len as LenType).to_be_bytes()).await?;
        self.tx.write_all(&self.body).await?;
        if !borrowed.is_empty() {
            self.tx.write_all(borrowed).await?;
        }

        self.tx.flush().await
    }
}
