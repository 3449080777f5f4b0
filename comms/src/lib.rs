//! Length prefixed message framing over any async byte stream.

mod align;
mod deserialize;
mod frame;
pub mod msg;
mod receiver;
mod sender;
mod serialize;
pub mod specs;

use tokio::io::{AsyncRead, AsyncWrite};

pub use align::{Align1, Align4};
pub use deserialize::Deserialize;
pub use frame::DEFAULT_MAX_FRAME_LEN;
pub use receiver::OnoReceiver;
pub use sender::OnoSender;
pub use serialize::Serialize;

/// Wraps the two halves of a stream into the ends of a message channel.
///
/// # Arguments
/// * `rx` - The reading half.
/// * `tx` - The writing half.
///
/// # Returns
/// The receiving and sending ends, in that order.
pub fn channel<R, W>(rx: R, tx: W) -> (OnoReceiver<R>, OnoSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (OnoReceiver::new(rx), OnoSender::new(tx))
}
