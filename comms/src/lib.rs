//! Length-prefixed message framing between the ranks of a process group.
//!
//! A frame is a `u64` big endian body length followed by the body. Bodies
//! longer than the endpoint's frame limit are refused on both ends, so a
//! corrupt length prefix cannot make a receiver allocate unbounded memory.

mod deserialize;
pub mod msg;
mod receiver;
mod sender;
mod serialize;

use tokio::io::{AsyncRead, AsyncWrite};

pub use deserialize::Deserialize;
pub use receiver::OnoReceiver;
pub use sender::OnoSender;
pub use serialize::Serialize;

type LenType = u64;
const LEN_TYPE_SIZE: usize = size_of::<LenType>();

/// The default maximum body length of a frame, in bytes.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Creates both ends of a framed channel over a reader and a writer, both
/// using `MAX_FRAME_LEN` as their frame limit.
///
/// # Arguments
/// * `rx` - An async readable.
/// * `tx` - An async writable.
///
/// # Returns
/// The receiving and sending ends of the channel.
pub fn channel<R, W>(rx: R, tx: W) -> (OnoReceiver<R>, OnoSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (OnoReceiver::new(rx), OnoSender::new(tx))
}

fn frame_too_long(len: usize, max: usize) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("frame body of {len} bytes exceeds the limit of {max} bytes"),
    )
}
