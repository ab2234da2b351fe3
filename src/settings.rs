/// User preferences that survive restarts. Everything else in the app is
/// session state and starts fresh.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct Preferences {
    /// Open the Adjustments section when a selection panel first shows.
    pub default_adjustments_open: bool,
    /// Open the Masking section when a selection panel first shows.
    pub default_masking_open: bool,
    /// Key for the remote edit API. Kept local to this machine.
    pub api_key: String,
    /// Feather applied to AI-edited layers, in tenths of a percent of the
    /// returned image's width.
    pub ai_feather_percent: f32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            default_adjustments_open: false,
            default_masking_open: true,
            api_key: String::new(),
            ai_feather_percent: 5.0,
        }
    }
}

impl Preferences {
    pub fn load(storage: Option<&dyn eframe::Storage>) -> Self {
        storage
            .and_then(|s| eframe::get_value(s, eframe::APP_KEY))
            .unwrap_or_default()
    }

    pub fn store(&self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    /// Feather in pixels for a freshly AI-edited layer of this width.
    pub fn ai_feather_for_width(&self, width: u32) -> f32 {
        width as f32 * (self.ai_feather_percent / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_first_run() {
        let prefs = Preferences::default();
        assert!(!prefs.default_adjustments_open);
        assert!(prefs.default_masking_open);
        assert!(prefs.api_key.is_empty());
        assert_eq!(prefs.ai_feather_percent, 5.0);
    }

    #[test]
    fn test_partial_blob_falls_back_to_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{"api_key":"abc123"}"#).unwrap();
        assert_eq!(prefs.api_key, "abc123");
        assert!(prefs.default_masking_open);
        assert_eq!(prefs.ai_feather_percent, 5.0);
    }

    #[test]
    fn test_round_trip() {
        let mut prefs = Preferences::default();
        prefs.api_key = "k".to_owned();
        prefs.ai_feather_percent = 12.0;
        let json = serde_json::to_string(&prefs).unwrap();
        assert_eq!(serde_json::from_str::<Preferences>(&json).unwrap(), prefs);
    }

    #[test]
    fn test_ai_feather_scales_with_width() {
        let prefs = Preferences::default();
        // Default 5 tenths of a percent: a 1000px image gets a 5px feather.
        assert_eq!(prefs.ai_feather_for_width(1000), 5.0);
        assert_eq!(prefs.ai_feather_for_width(400), 2.0);
    }
}
