use std::io;

/// A message that can be written into a frame.
pub trait Serialize<'a> {
    /// Writes the owned part of the frame into `buf`.
    ///
    /// # Arguments
    /// * `buf` - The buffer holding the frame being built.
    ///
    /// # Returns
    /// A trailing slice to be written right after `buf` without copying, if any.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> io::Result<Option<&'a [u8]>>;
}
