pub mod central_panel;
pub mod layers_panel;
pub mod modals;
pub mod toolbar;

pub use central_panel::central_panel;
pub use layers_panel::layers_panel;
pub use modals::{ai_prompt_modal, settings_modal, upload_modal};
pub use toolbar::toolbar;
