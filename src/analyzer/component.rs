//! Component vocabulary.
//!
//! The constructors the analyzer recognizes and the payload datatype each
//! one expects. Anything else is reported as `"Unknown"`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel component type for constructors outside the vocabulary.
pub const UNKNOWN_COMPONENT: &str = "Unknown";

/// Datatype reported for components outside the vocabulary.
pub const UNKNOWN_DATATYPE: &str = "Unknown type";

/// Input components whose payload shape is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    /// `gr.Textbox`
    Textbox,
    /// `gr.Number`
    Number,
    /// `gr.Slider`
    Slider,
    /// `gr.Checkbox`
    Checkbox,
    /// `gr.CheckboxGroup`
    CheckboxGroup,
    /// `gr.Radio`
    Radio,
    /// `gr.Dropdown`
    Dropdown,
    /// `gr.Image`
    Image,
    /// `gr.Video`
    Video,
    /// `gr.Audio`
    Audio,
    /// `gr.ColorPicker`
    ColorPicker,
}

impl ComponentType {
    /// Every member of the vocabulary.
    pub const ALL: [ComponentType; 11] = [
        ComponentType::Textbox,
        ComponentType::Number,
        ComponentType::Slider,
        ComponentType::Checkbox,
        ComponentType::CheckboxGroup,
        ComponentType::Radio,
        ComponentType::Dropdown,
        ComponentType::Image,
        ComponentType::Video,
        ComponentType::Audio,
        ComponentType::ColorPicker,
    ];

    /// Constructor name as written in application source.
    pub fn name(self) -> &'static str {
        match self {
            ComponentType::Textbox => "Textbox",
            ComponentType::Number => "Number",
            ComponentType::Slider => "Slider",
            ComponentType::Checkbox => "Checkbox",
            ComponentType::CheckboxGroup => "CheckboxGroup",
            ComponentType::Radio => "Radio",
            ComponentType::Dropdown => "Dropdown",
            ComponentType::Image => "Image",
            ComponentType::Video => "Video",
            ComponentType::Audio => "Audio",
            ComponentType::ColorPicker => "ColorPicker",
        }
    }

    /// Payload datatype the remote function expects for this component.
    pub fn expected_datatype(self) -> &'static str {
        match self {
            ComponentType::Textbox => "string",
            ComponentType::Number | ComponentType::Slider => "number",
            ComponentType::Checkbox | ComponentType::Radio | ComponentType::Dropdown => "string",
            ComponentType::CheckboxGroup => "list",
            ComponentType::Image => "data: image/jpeg;base64",
            ComponentType::Video => "data: video/mp4;base64",
            ComponentType::Audio => "data: audio/mpeg;base64",
            ComponentType::ColorPicker => "String, Hexadecimal color code",
        }
    }

    /// Whether the constructor takes a `choices` argument.
    pub fn has_choices(self) -> bool {
        matches!(
            self,
            ComponentType::Dropdown | ComponentType::CheckboxGroup | ComponentType::Radio
        )
    }

    /// Exact lookup by constructor name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|component| component.name() == name)
    }

    /// Lookup by the string shortcuts Gradio accepts in place of component
    /// instances (`"text"`, `"image"`, ...); case-insensitive.
    pub fn from_shortcut(shortcut: &str) -> Option<Self> {
        let lowered = shortcut.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "text" | "textarea" => Some(ComponentType::Textbox),
            "checkbox_group" => Some(ComponentType::CheckboxGroup),
            "colorpicker" | "color_picker" => Some(ComponentType::ColorPicker),
            _ => Self::ALL
                .into_iter()
                .find(|component| component.name().eq_ignore_ascii_case(&lowered)),
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Datatype for a component type name, `"Unknown type"` when unrecognised.
pub fn expected_datatype(type_name: &str) -> &'static str {
    ComponentType::from_name(type_name).map_or(UNKNOWN_DATATYPE, ComponentType::expected_datatype)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_lookup() {
        for component in ComponentType::ALL {
            assert_eq!(ComponentType::from_name(component.name()), Some(component));
        }
        assert_eq!(ComponentType::from_name("textbox"), None);
    }

    #[test]
    fn shortcuts_are_case_insensitive() {
        assert_eq!(
            ComponentType::from_shortcut("text"),
            Some(ComponentType::Textbox)
        );
        assert_eq!(
            ComponentType::from_shortcut("IMAGE"),
            Some(ComponentType::Image)
        );
        assert_eq!(ComponentType::from_shortcut("dataframe"), None);
    }

    #[test]
    fn unknown_names_get_unknown_datatype() {
        assert_eq!(expected_datatype("Gallery"), UNKNOWN_DATATYPE);
        assert_eq!(expected_datatype("Slider"), "number");
    }
}
