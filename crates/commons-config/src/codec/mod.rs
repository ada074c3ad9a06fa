//! Wire formats for [`Config`](crate::Config).

mod binary;
mod xml;

pub use binary::BinaryCodec;
pub use xml::XmlCodec;
