//! Binary codec for the external database format and our own formats.

mod digest;
mod reader;
mod writer;

pub use digest::md5_hex;
pub use reader::{BinaryFile, ByteBuffer};
pub use writer::ByteWriter;
