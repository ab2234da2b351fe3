use crate::id_generator::generate_source_id;
use image::RgbaImage;
use std::fmt;
use std::sync::Arc;

/// Identity of a decoded pixel source, unique for the process lifetime.
///
/// Snapshot equality compares sources by this id, never by pixel content:
/// two layers share a source only when one was literally derived from the
/// other's handle (duplicate), and every decode/crop/replace mints a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub usize);

impl SourceId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source-{}", self.0)
    }
}

/// A decoded, drawable image: shared pixels plus a stable identity.
///
/// The pixels are immutable once decoded; edits (crop, replace, AI result)
/// produce a fresh `PixelSource` rather than mutating in place, so history
/// snapshots can share handles freely.
#[derive(Clone)]
pub struct PixelSource {
    id: SourceId,
    image: Arc<RgbaImage>,
}

impl PixelSource {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            id: SourceId(generate_source_id()),
            image: Arc::new(image),
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Natural pixel width of the source.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Natural pixel height of the source.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

impl PartialEq for PixelSource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for PixelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelSource")
            .field("id", &self.id)
            .field("size", &(self.image.width(), self.image.height()))
            .field("pixels", &"<rgba>")
            .finish()
    }
}
