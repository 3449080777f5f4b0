use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{
    Serialize,
    frame::{self, PREFIX_SIZE},
};

/// The sending end handle of the communication.
pub struct OnoSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    frame: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> OnoSender<W> {
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            frame: Vec::new(),
        }
    }

    /// Frames `msg` and writes it to the inner writer.
    ///
    /// The owned part of the message is built right after a placeholder prefix which is patched
    /// once the whole length is known, a borrowed trailing payload is written as is after it.
    ///
    /// # Arguments
    /// * `msg` - A serializable object.
    ///
    /// # Returns
    /// An `io::Error` if the message can't be serialized or the writer fails.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        self.frame.clear();
        self.frame.extend_from_slice(&[0; PREFIX_SIZE]);

        let trailer = msg.serialize(&mut self.frame)?.unwrap_or_default();
        let body_len = self.frame.len() - PREFIX_SIZE + trailer.len();
        self.frame[..PREFIX_SIZE].copy_from_slice(&frame::encode_len(body_len));

        self.tx.write_all(&self.frame).await?;
        if !trailer.is_empty() {
            self.tx.write_all(trailer).await?;
        }

        self.tx.flush().await
    }

    /// Shuts down the writing half of the underlying stream.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.tx.shutdown().await
    }
}
