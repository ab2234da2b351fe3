#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod compositor;
pub mod decode;
pub mod document;
pub mod error;
pub mod geometry;
pub mod history;
pub mod id_generator;
pub mod interaction;
pub mod panels;
pub mod remote;
pub mod settings;
pub mod source;
pub mod texture_cache;
pub mod util;

pub use app::ComposeApp;
pub use compositor::{render_composite, BlendMode, EditorOverlay};
pub use decode::{DecodeEvent, DecodeTarget, ImageIntake};
pub use document::{Adjustments, BaseImage, Document, Layer, LayerId, Selection};
pub use error::{DecodeError, RemoteEditError};
pub use history::History;
pub use interaction::{CropToggle, GestureSession, InteractionController, PointerState};
pub use remote::{GeminiImageEditor, PendingEdit, RemoteImageEditor};
pub use settings::Preferences;
pub use source::PixelSource;
pub use texture_cache::TextureCache;
