use egui::{ColorImage, Context, TextureHandle, TextureId, TextureOptions};
use image::RgbaImage;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TextureError {
    #[error("Rendered image has no pixels")]
    EmptyImage,
}

/// Caches composite renders as GPU textures, keyed by document revision.
///
/// Undo/redo hops land back on revisions rendered moments ago; keeping a few
/// around avoids re-uploading them. Staged gestures mint a revision per
/// frame, so the cache is pruned by last use rather than insertion order.
pub struct TextureCache {
    textures: HashMap<u64, TextureHandle>,
    last_used: HashMap<u64, u64>,
    current_frame: u64,
    max_entries: usize,
}

impl TextureCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            textures: HashMap::new(),
            last_used: HashMap::new(),
            current_frame: 0,
            max_entries,
        }
    }

    /// Advances the LRU clock. Call once at the start of each frame.
    pub fn begin_frame(&mut self) {
        self.current_frame += 1;
    }

    /// Returns the texture for `revision`, running `generator` and uploading
    /// its result only on a cache miss.
    pub fn get_or_upload<F>(
        &mut self,
        revision: u64,
        generator: F,
        ctx: &Context,
    ) -> Result<TextureId, TextureError>
    where
        F: FnOnce() -> Option<ColorImage>,
    {
        if let Some(handle) = self.textures.get(&revision) {
            self.last_used.insert(revision, self.current_frame);
            return Ok(handle.id());
        }

        self.prune_if_needed();

        let image = generator().ok_or(TextureError::EmptyImage)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(TextureError::EmptyImage);
        }

        let name = format!("composite_r{revision}");
        let handle = ctx.load_texture(&name, image, TextureOptions::LINEAR);
        self.textures.insert(revision, handle.clone());
        self.last_used.insert(revision, self.current_frame);
        Ok(handle.id())
    }

    pub fn clear(&mut self) {
        self.textures.clear();
        self.last_used.clear();
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Makes room for one incoming entry: evicts least-recently-used
    /// textures until the cache is below capacity.
    fn prune_if_needed(&mut self) {
        if self.textures.len() < self.max_entries {
            return;
        }

        let mut entries: Vec<(u64, u64)> = self.last_used.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by_key(|(_, frame)| *frame);

        let to_remove = entries.len() + 1 - self.max_entries;
        for (revision, _) in entries.iter().take(to_remove) {
            self.textures.remove(revision);
            self.last_used.remove(revision);
        }
    }

    #[cfg(test)]
    fn get(&self, revision: u64) -> Option<&TextureHandle> {
        self.textures.get(&revision)
    }
}

/// Converts decoded straight-alpha pixels into egui's image format.
pub fn color_image_from_rgba(image: &RgbaImage) -> ColorImage {
    ColorImage::from_rgba_unmultiplied(
        [image.width() as usize, image.height() as usize],
        image.as_raw(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_image() -> Option<ColorImage> {
        Some(ColorImage::new([10, 10], egui::Color32::WHITE))
    }

    #[test]
    fn test_cache_hit_reuses_upload() {
        let ctx = Context::default();
        let mut cache = TextureCache::new(10);

        let first = cache.get_or_upload(1, white_image, &ctx).unwrap();
        let second = cache.get_or_upload(1, white_image, &ctx).unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_eviction_drops_oldest() {
        let ctx = Context::default();
        let mut cache = TextureCache::new(2);

        cache.get_or_upload(1, white_image, &ctx).unwrap();
        cache.begin_frame();
        cache.get_or_upload(2, white_image, &ctx).unwrap();
        cache.begin_frame();
        cache.get_or_upload(3, white_image, &ctx).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_some());
        assert!(cache.get(3).is_some());
    }

    #[test]
    fn test_miss_at_capacity_evicts_before_inserting() {
        let ctx = Context::default();
        let mut cache = TextureCache::new(2);

        for revision in 0..8 {
            cache.get_or_upload(revision, white_image, &ctx).unwrap();
            assert!(cache.len() <= 2, "over capacity at revision {revision}");
            cache.begin_frame();
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get(7).is_some());
    }

    #[test]
    fn test_empty_render_is_rejected() {
        let ctx = Context::default();
        let mut cache = TextureCache::new(4);
        let result = cache.get_or_upload(9, || None, &ctx);
        assert_eq!(result.unwrap_err(), TextureError::EmptyImage);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_empties_cache() {
        let ctx = Context::default();
        let mut cache = TextureCache::new(4);
        cache.get_or_upload(1, white_image, &ctx).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_conversion_preserves_pixels() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        image.put_pixel(1, 0, image::Rgba([0, 0, 255, 128]));

        let color = color_image_from_rgba(&image);
        assert_eq!(color.size, [2, 1]);
        assert_eq!(color.pixels[0], egui::Color32::from_rgba_unmultiplied(255, 0, 0, 255));
        assert_eq!(
            color.pixels[1],
            egui::Color32::from_rgba_unmultiplied(0, 0, 255, 128)
        );
    }
}
