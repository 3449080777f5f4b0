use std::io;

/// A message that can be read back from a frame, possibly borrowing from it.
pub trait Deserialize<'a>: Sized {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self>;
}
