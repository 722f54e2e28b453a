use crate::config::KeyboardConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Key {
    Space,
    PageUp,
    PageDown,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self { shift: false, ctrl: false, alt: false, meta: false };
    pub const SHIFT: Self = Self { shift: true, ..Self::NONE };

    pub fn any(self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInput {
    pub key: Key,
    #[serde(default)]
    pub modifiers: Modifiers,
    /// An editable form field inside the document has focus
    #[serde(default)]
    pub form_field_focused: bool,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self { key, modifiers: Modifiers::NONE, form_field_focused: false }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn in_form_field(mut self) -> Self {
        self.form_field_focused = true;
        self
    }
}

/// Result reported back to the host's key listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyHandling {
    pub handled: bool,
    pub prevent_default: bool,
}

/// Viewport state a directional key is resolved against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyContext {
    /// Fitting shows whole pages (fit-to-page or fit-to-height)
    pub paged: bool,
    pub presentation_mode: bool,
    pub horizontal_scrollbar: bool,
    pub viewport_height: f64,
    pub smooth_scrolling: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyAction {
    /// Not a directional key for the viewport; the host keeps it.
    Unhandled,
    /// Consumed without moving the viewport.
    Consumed,
    NextPage,
    PreviousPage,
    ScrollBy { dx: f64, dy: f64, smooth: bool },
}

impl KeyAction {
    pub fn handling(self) -> KeyHandling {
        match self {
            Self::Unhandled => KeyHandling { handled: false, prevent_default: false },
            Self::Consumed => KeyHandling { handled: true, prevent_default: false },
            Self::NextPage | Self::PreviousPage | Self::ScrollBy { .. } => {
                KeyHandling { handled: true, prevent_default: true }
            }
        }
    }
}

pub fn resolve_key(input: &KeyInput, context: &KeyContext, config: &KeyboardConfig) -> KeyAction {
    match input.key {
        Key::Space => page_step(input, context, config),
        Key::PageUp | Key::PageDown if input.modifiers.any() => KeyAction::Unhandled,
        Key::PageUp | Key::PageDown => page_step(input, context, config),
        Key::ArrowLeft | Key::ArrowRight => {
            if input.form_field_focused || input.modifiers.any() {
                return KeyAction::Consumed;
            }
            let forward = input.key == Key::ArrowRight;
            if context.paged || !context.horizontal_scrollbar {
                return page_turn(forward);
            }
            let dx = if forward { config.scroll_increment_px } else { -config.scroll_increment_px };
            KeyAction::ScrollBy { dx, dy: 0.0, smooth: context.smooth_scrolling }
        }
        Key::ArrowUp | Key::ArrowDown => {
            if input.form_field_focused || input.modifiers.any() {
                return KeyAction::Consumed;
            }
            let forward = input.key == Key::ArrowDown;
            if context.presentation_mode || context.paged {
                return page_turn(forward);
            }
            let dy = if forward { config.scroll_increment_px } else { -config.scroll_increment_px };
            KeyAction::ScrollBy { dx: 0.0, dy, smooth: false }
        }
        Key::Other => KeyAction::Unhandled,
    }
}

fn page_step(input: &KeyInput, context: &KeyContext, config: &KeyboardConfig) -> KeyAction {
    let is_space = input.key == Key::Space;
    // Typing a space into a form field must reach the field.
    if is_space && input.form_field_focused && !input.modifiers.shift {
        return KeyAction::Consumed;
    }

    let forward = input.key == Key::PageDown || (is_space && !input.modifiers.shift);
    if context.paged {
        return page_turn(forward);
    }
    let step = context.viewport_height * config.page_step_fraction;
    KeyAction::ScrollBy {
        dx: 0.0,
        dy: if forward { step } else { -step },
        smooth: context.smooth_scrolling,
    }
}

fn page_turn(forward: bool) -> KeyAction {
    if forward {
        KeyAction::NextPage
    } else {
        KeyAction::PreviousPage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> KeyContext {
        KeyContext {
            paged: false,
            presentation_mode: false,
            horizontal_scrollbar: true,
            viewport_height: 800.0,
            smooth_scrolling: true,
        }
    }

    fn resolve(input: KeyInput, context: KeyContext) -> KeyAction {
        resolve_key(&input, &context, &KeyboardConfig::default())
    }

    #[test]
    fn page_keys_scroll_most_of_a_screen() {
        assert_eq!(
            resolve(KeyInput::new(Key::PageDown), context()),
            KeyAction::ScrollBy { dx: 0.0, dy: 700.0, smooth: true }
        );
        assert_eq!(
            resolve(KeyInput::new(Key::Space).with_modifiers(Modifiers::SHIFT), context()),
            KeyAction::ScrollBy { dx: 0.0, dy: -700.0, smooth: true }
        );
    }

    #[test]
    fn paged_fitting_turns_pages() {
        let paged = KeyContext { paged: true, ..context() };
        assert_eq!(resolve(KeyInput::new(Key::Space), paged), KeyAction::NextPage);
        assert_eq!(resolve(KeyInput::new(Key::PageUp), paged), KeyAction::PreviousPage);
        assert_eq!(resolve(KeyInput::new(Key::ArrowDown), paged), KeyAction::NextPage);
        assert_eq!(resolve(KeyInput::new(Key::ArrowLeft), paged), KeyAction::PreviousPage);
    }

    #[test]
    fn space_in_form_field_is_left_to_the_field() {
        let action = resolve(KeyInput::new(Key::Space).in_form_field(), context());
        assert_eq!(action, KeyAction::Consumed);
        assert_eq!(action.handling(), KeyHandling { handled: true, prevent_default: false });

        let shifted = KeyInput::new(Key::Space).in_form_field().with_modifiers(Modifiers::SHIFT);
        assert!(matches!(resolve(shifted, context()), KeyAction::ScrollBy { dy, .. } if dy < 0.0));
    }

    #[test]
    fn modified_page_keys_are_not_handled() {
        let ctrl = Modifiers { ctrl: true, ..Modifiers::NONE };
        let action = resolve(KeyInput::new(Key::PageDown).with_modifiers(ctrl), context());
        assert_eq!(action.handling(), KeyHandling::default());
        assert_eq!(resolve(KeyInput::new(Key::Other), context()), KeyAction::Unhandled);
    }

    #[test]
    fn horizontal_arrows_turn_pages_without_horizontal_scrollbar() {
        let narrow = KeyContext { horizontal_scrollbar: false, ..context() };
        assert_eq!(resolve(KeyInput::new(Key::ArrowRight), narrow), KeyAction::NextPage);
        assert_eq!(
            resolve(KeyInput::new(Key::ArrowLeft), context()),
            KeyAction::ScrollBy { dx: -40.0, dy: 0.0, smooth: true }
        );
    }

    #[test]
    fn vertical_arrows() {
        assert_eq!(
            resolve(KeyInput::new(Key::ArrowDown), context()),
            KeyAction::ScrollBy { dx: 0.0, dy: 40.0, smooth: false }
        );
        let presenting = KeyContext { presentation_mode: true, ..context() };
        assert_eq!(resolve(KeyInput::new(Key::ArrowUp), presenting), KeyAction::PreviousPage);
        assert_eq!(resolve(KeyInput::new(Key::ArrowUp).in_form_field(), presenting), KeyAction::Consumed);
    }

    #[test]
    fn key_input_wire_format() {
        let input: KeyInput =
            serde_json::from_str(r#"{"key":"page-down","modifiers":{"shift":true}}"#).unwrap();
        assert_eq!(input.key, Key::PageDown);
        assert!(input.modifiers.shift && !input.modifiers.ctrl);
        assert!(!input.form_field_focused);

        let unknown: KeyInput = serde_json::from_str(r#"{"key":"escape"}"#).unwrap();
        assert_eq!(unknown.key, Key::Other);
    }
}
