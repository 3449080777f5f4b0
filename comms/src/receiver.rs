use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    Align4, Deserialize,
    frame::{self, DEFAULT_MAX_FRAME_LEN, PREFIX_SIZE},
};

/// The receiving end handle of the communication.
pub struct OnoReceiver<R: AsyncRead + Unpin> {
    rx: R,
    max_frame_len: usize,
}

impl<R: AsyncRead + Unpin> OnoReceiver<R> {
    pub(super) fn new(rx: R) -> Self {
        Self {
            rx,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Sets the largest frame this receiver accepts, in bytes.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Waits for the next frame and deserializes it out of `buf`.
    ///
    /// `buf` is made of 4 byte aligned words so numeric payloads can be borrowed from it
    /// instead of copied, it's resized to fit every frame.
    ///
    /// # Arguments
    /// * `buf` - The backing storage of the frame, the returned `T` borrows from it.
    ///
    /// # Returns
    /// The message or an `io::Error` if the stream fails, the frame is over the limit or it
    /// doesn't hold a valid `T`.
    pub async fn recv_into<'buf, T, B>(&mut self, buf: &'buf mut Vec<B>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
        B: Align4,
    {
        let mut prefix = [0; PREFIX_SIZE];
        self.rx.read_exact(&mut prefix).await?;
        let len = frame::decode_len(prefix, self.max_frame_len)?;

        buf.clear();
        buf.resize(len.div_ceil(size_of::<B>()), B::zeroed());

        let bytes: &mut [u8] = bytemuck::cast_slice_mut(buf.as_mut_slice());
        let body = &mut bytes[..len];
        self.rx.read_exact(body).await?;

        T::deserialize(body)
    }
}
