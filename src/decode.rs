use std::sync::Arc;

use eframe::egui;
use image::RgbaImage;
use parking_lot::Mutex;

use crate::document::LayerId;
use crate::error::DecodeError;

/// What a finished decode should become once it reaches the document.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeTarget {
    /// Upload intake: becomes the base image if none is set, otherwise a
    /// new layer.
    Intake,
    /// Swap an existing layer's pixels, keeping its placement.
    ReplaceLayer(LayerId),
}

/// Outcome of one decode job, delivered to the UI thread.
pub enum DecodeEvent {
    Loaded {
        target: DecodeTarget,
        name: String,
        image: RgbaImage,
    },
    Failed {
        name: String,
        error: DecodeError,
    },
}

type Inbox = Arc<Mutex<Vec<DecodeEvent>>>;

/// Accepts image files (picked or dropped), decodes them off the UI thread
/// on native, and queues the results for the next frame.
pub struct ImageIntake {
    inbox: Inbox,
}

impl ImageIntake {
    pub fn new() -> Self {
        Self {
            inbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a decode job. On native the decode runs on a worker thread and
    /// the context is woken when the result lands; on the web the decode is
    /// fast enough to run inline.
    pub fn submit(
        &self,
        ctx: &egui::Context,
        target: DecodeTarget,
        name: String,
        mime: String,
        bytes: Vec<u8>,
    ) {
        log::info!("decoding {name} ({} bytes)", bytes.len());
        let inbox = Arc::clone(&self.inbox);
        let ctx = ctx.clone();
        let job = move || {
            let event = match decode_image_bytes(&name, &mime, &bytes) {
                Ok(image) => DecodeEvent::Loaded {
                    target,
                    name,
                    image,
                },
                Err(error) => {
                    log::warn!("decode of {name} failed: {error}");
                    DecodeEvent::Failed { name, error }
                }
            };
            inbox.lock().push(event);
            ctx.request_repaint();
        };

        #[cfg(not(target_arch = "wasm32"))]
        std::thread::spawn(job);

        #[cfg(target_arch = "wasm32")]
        job();
    }

    /// Take everything that finished since the last frame.
    pub fn poll(&self) -> Vec<DecodeEvent> {
        std::mem::take(&mut *self.inbox.lock())
    }

    /// Pick up files dropped onto the window and queue them as uploads.
    pub fn absorb_dropped_files(&self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());

        for file in dropped {
            let name = if let Some(path) = &file.path {
                path.display().to_string()
            } else if !file.name.is_empty() {
                file.name.clone()
            } else {
                "unknown".to_owned()
            };

            if !is_image_file(&file) {
                log::warn!("dropped file is not a supported type: {name}");
                continue;
            }

            if let Some(bytes) = &file.bytes {
                self.submit(
                    ctx,
                    DecodeTarget::Intake,
                    name,
                    file.mime.clone(),
                    bytes.to_vec(),
                );
            } else if let Some(path) = &file.path {
                #[cfg(not(target_arch = "wasm32"))]
                match std::fs::read(path) {
                    Ok(bytes) => {
                        self.submit(ctx, DecodeTarget::Intake, name, file.mime.clone(), bytes);
                    }
                    Err(source) => {
                        self.inbox.lock().push(DecodeEvent::Failed {
                            name: name.clone(),
                            error: DecodeError::Io {
                                path: path.display().to_string(),
                                source,
                            },
                        });
                    }
                }

                #[cfg(target_arch = "wasm32")]
                log::warn!("file path access not supported on the web: {name}");
            } else {
                log::warn!("dropped file has no accessible data: {name}");
            }
        }
    }

    /// Dim the window and list the hovered files while a drag is in flight.
    pub fn preview_files_being_dropped(&self, ctx: &egui::Context) {
        use egui::{Align2, Color32, Id, LayerId, Order};

        if ctx.input(|i| i.raw.hovered_files.is_empty()) {
            return;
        }

        let text = ctx.input(|i| hover_preview_text(&i.raw.hovered_files));

        let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("file_drop_target")));
        let screen_rect = ctx.screen_rect();
        painter.rect_filled(screen_rect, 0.0, Color32::from_black_alpha(192));
        painter.text(
            screen_rect.center(),
            Align2::CENTER_CENTER,
            text,
            egui::TextStyle::Heading.resolve(&ctx.style()),
            Color32::WHITE,
        );
    }
}

impl Default for ImageIntake {
    fn default() -> Self {
        Self::new()
    }
}

/// Label lines for the hover overlay. Hovered files carry only a path and a
/// mime type (the name arrives with the drop), so the mime stands in when
/// there is no path, as on the web.
fn hover_preview_text(files: &[egui::HoveredFile]) -> String {
    let mut text = "Dropping files:\n".to_owned();
    for file in files {
        if let Some(path) = &file.path {
            text += &format!("\n{}", path.display());
        } else if !file.mime.is_empty() {
            text += &format!("\n{}", file.mime);
        } else {
            text += "\n(path not available)";
        }
    }
    text
}

fn is_image_file(file: &egui::DroppedFile) -> bool {
    if !file.mime.is_empty() {
        return file.mime.starts_with("image/");
    }
    if let Some(path) = &file.path {
        if let Some(ext) = path.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            return matches!(
                ext.as_str(),
                "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "heic" | "heif"
            );
        }
    }
    false
}

/// Encode pixels as PNG, for outgoing remote-edit payloads and browser
/// downloads.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    image.write_to(
        &mut std::io::Cursor::new(&mut bytes),
        image::ImageFormat::Png,
    )?;
    Ok(bytes)
}

/// Decode an encoded image into RGBA pixels.
///
/// HEIC/HEIF is rejected up front with a named error instead of letting the
/// decoder produce a generic one.
pub fn decode_image_bytes(name: &str, mime: &str, bytes: &[u8]) -> Result<RgbaImage, DecodeError> {
    if is_heif(name, mime) {
        let kind = if mime.is_empty() { "HEIC/HEIF" } else { mime };
        return Err(DecodeError::UnsupportedFormat(kind.to_owned()));
    }
    let decoded = image::load_from_memory(bytes)?;
    let rgba = decoded.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(DecodeError::EmptyImage);
    }
    Ok(rgba)
}

fn is_heif(name: &str, mime: &str) -> bool {
    let mime = mime.to_ascii_lowercase();
    if mime.contains("heic") || mime.contains("heif") {
        return true;
    }
    let name = name.to_ascii_lowercase();
    name.ends_with(".heic") || name.ends_with(".heif")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, image::Rgba([10, 200, 30, 255]));
        encode_png(&image).unwrap()
    }

    #[test]
    fn test_decode_accepts_png_bytes() {
        let image = decode_image_bytes("tiny.png", "image/png", &png_bytes(3, 2)).unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
    }

    #[test]
    fn test_encode_round_trips_pixels() {
        let mut image = RgbaImage::new(2, 2);
        image.put_pixel(1, 0, image::Rgba([200, 40, 10, 255]));
        let decoded = decode_image_bytes("x.png", "image/png", &encode_png(&image).unwrap()).unwrap();
        assert_eq!(decoded.get_pixel(1, 0), image.get_pixel(1, 0));
    }

    #[test]
    fn test_decode_rejects_heif_by_name() {
        let result = decode_image_bytes("photo.HEIC", "", &[0u8; 4]);
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_decode_rejects_heif_by_mime() {
        let result = decode_image_bytes("shot.bin", "image/heif", &[0u8; 4]);
        let Err(DecodeError::UnsupportedFormat(kind)) = result else {
            panic!("expected an unsupported-format error");
        };
        assert_eq!(kind, "image/heif");
    }

    #[test]
    fn test_decode_reports_invalid_data() {
        let result = decode_image_bytes("junk.png", "image/png", b"not an image at all");
        assert!(matches!(result, Err(DecodeError::InvalidData(_))));
    }

    #[test]
    fn test_hover_text_uses_path_then_mime() {
        let with_path = egui::HoveredFile {
            path: Some(std::path::PathBuf::from("/tmp/photo.png")),
            mime: "image/png".to_owned(),
        };
        let mime_only = egui::HoveredFile {
            path: None,
            mime: "image/jpeg".to_owned(),
        };
        let bare = egui::HoveredFile::default();

        let text = hover_preview_text(&[with_path, mime_only, bare]);
        assert!(text.contains("/tmp/photo.png"));
        assert!(text.contains("image/jpeg"));
        assert!(text.contains("(path not available)"));
    }

    #[test]
    fn test_submit_delivers_result_to_poll() {
        let intake = ImageIntake::new();
        let ctx = egui::Context::default();
        intake.submit(
            &ctx,
            DecodeTarget::Intake,
            "tiny.png".to_owned(),
            "image/png".to_owned(),
            png_bytes(4, 4),
        );

        let mut events = Vec::new();
        for _ in 0..200 {
            events = intake.poll();
            if !events.is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        assert_eq!(events.len(), 1);
        match &events[0] {
            DecodeEvent::Loaded { target, name, image } => {
                assert_eq!(*target, DecodeTarget::Intake);
                assert_eq!(name, "tiny.png");
                assert_eq!(image.width(), 4);
            }
            DecodeEvent::Failed { error, .. } => panic!("decode failed: {error}"),
        }
    }
}
