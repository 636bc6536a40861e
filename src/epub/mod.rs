//! EPUB container and package document handling.

pub mod archive;
mod package;

pub use archive::{extract, find_by_extension, find_epubs, pack};
pub use package::{ManifestItem, PackageDocument, XmlElement, XmlNode};
