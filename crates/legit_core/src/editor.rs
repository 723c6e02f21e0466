//! Draft buffer for the tracked document.

/// The user's draft, gated by the checkout controller.
///
/// `base` is the content the draft was last loaded from or saved as, so
/// `is_dirty` reports unsaved keystrokes. Mutations are ignored while the
/// buffer is read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorState {
    base: String,
    text: String,
    editable: bool,
}

impl EditorState {
    /// An empty, read-only buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both base and draft with `content`.
    pub fn load(&mut self, content: &str, editable: bool) {
        self.base = content.to_string();
        self.text = content.to_string();
        self.editable = editable;
    }

    /// Current draft text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Content the draft was loaded from.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Whether keystrokes are accepted.
    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// Whether the draft differs from its base.
    pub fn is_dirty(&self) -> bool {
        self.text != self.base
    }

    /// Replace the draft. Returns `false` (and changes nothing) when read-only.
    pub fn edit(&mut self, text: &str) -> bool {
        if !self.editable {
            return false;
        }
        self.text = text.to_string();
        true
    }

    /// Append to the draft. Returns `false` (and changes nothing) when read-only.
    pub fn push_str(&mut self, text: &str) -> bool {
        if !self.editable {
            return false;
        }
        self.text.push_str(text);
        true
    }

    /// Move the base to `content` while keeping the draft text.
    pub fn rebase(&mut self, content: &str) {
        self.base = content.to_string();
    }

    pub(crate) fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
    }
}
