use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Deserialize, LEN_TYPE_SIZE, LenType, MAX_FRAME_LEN, frame_too_long};

/// The receiving end of a framed channel.
pub struct OnoReceiver<R: AsyncRead + Unpin> {
    rx: R,
    max_frame_len: usize,
}

impl<R: AsyncRead + Unpin> OnoReceiver<R> {
    pub(super) fn new(rx: R) -> Self {
        Self {
            rx,
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    /// Sets the longest body this receiver accepts to read.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Waits for the next frame and deserializes it.
    ///
    /// The buffer is made of `u32`s so that numeric payloads placed after the
    /// 4 byte message header stay aligned for zero-copy casting.
    ///
    /// # Arguments
    /// * `buf` - The buffer to read the body into, the returned `T` may
    ///   borrow from it.
    ///
    /// # Errors
    /// Returns `io::ErrorKind::InvalidData` if the announced body is longer
    /// than the limit or does not deserialize, or the reader's error.
    pub async fn recv_into<'buf, T>(&mut self, buf: &'buf mut Vec<u32>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
    {
        let mut len_buf = [0; LEN_TYPE_SIZE];
        self.rx.read_exact(&mut len_buf).await?;

        let len = usize::try_from(LenType::from_be_bytes(len_buf)).unwrap_or(usize::MAX);
        if len > self.max_frame_len {
            return Err(frame_too_long(len, self.max_frame_len));
        }

        buf.clear();
        buf.resize(len.div_ceil(size_of::<u32>()), 0);

        let body = &mut bytemuck::cast_slice_mut::<u32, u8>(buf.as_mut_slice())[..len];
        self.rx.read_exact(body).await?;

        T::deserialize(body)
    }
}
