/// The outgoing message box of a chat window.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Composer {
    draft: String,
}

impl Composer {
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    /// Takes the trimmed draft for sending and clears the box. Blank drafts
    /// stay where they are and nothing is sent.
    pub fn submit(&mut self) -> Option<String> {
        let text = self.draft.trim();
        if text.is_empty() {
            return None;
        }
        let text = text.to_owned();
        self.draft.clear();
        Some(text)
    }

    /// Puts back text whose send failed, unless something new was typed meanwhile.
    pub fn restore(&mut self, text: String) -> bool {
        if !self.draft.is_empty() {
            return false;
        }
        self.draft = text;
        true
    }
}
