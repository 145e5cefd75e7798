/// Types that can be written into the body of a frame.
pub trait Serialize<'a> {
    /// Writes the owned part of the serialization into `buf`.
    ///
    /// # Returns
    /// An optional borrowed slice that must be written right after `buf`, this
    /// avoids copying large numeric payloads into the intermediate buffer.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}
