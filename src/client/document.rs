use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Quiet interval before a burst of local edits is sent.
pub const DEBOUNCE: Duration = Duration::from_millis(120);

/// Local buffer content until the room snapshot supplies the shared text.
pub const PLACEHOLDER: &str =
    "# Start coding together!\n# This text will NOT reset on Run or language change.\n";

/// Client copy of a room document.
///
/// Local edits are debounced into a single `code:update`. Remote text is
/// applied only when it differs from the buffer, and the last remote value is
/// remembered so it is never sent back to the room.
#[derive(Debug)]
pub struct DocumentSync {
    room: String,
    text: String,
    inbound: Option<String>,
    deadline: Option<Instant>,
    debounce: Duration,
}

impl DocumentSync {
    pub fn new(room: impl Into<String>, debounce: Duration) -> Self {
        Self {
            room: room.into(),
            text: PLACEHOLDER.to_string(),
            inbound: None,
            deadline: None,
            debounce,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// A change event from the editor. Restarts the quiet interval.
    pub fn local_change(&mut self, text: String, now: Instant) {
        self.text = text;
        if self.is_echo() {
            self.deadline = None;
            return;
        }
        self.deadline = Some(now + self.debounce);
    }

    /// Once the quiet interval has elapsed, the text to send, if any.
    pub fn take_due(&mut self, now: Instant) -> Option<String> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                if self.is_echo() {
                    debug!("Suppressing echo of remote document for room {}", self.room);
                    None
                } else {
                    Some(self.text.clone())
                }
            }
            _ => None,
        }
    }

    /// Applies an authoritative update for `room`. Returns whether the buffer changed.
    pub fn apply_remote(&mut self, room: &str, text: &str) -> bool {
        if room != self.room {
            return false;
        }
        self.inbound = Some(text.to_string());
        if self.text == text {
            return false;
        }
        self.text = text.to_string();
        true
    }

    /// Overwrites the buffer with snapshot text and drops any pending emission.
    pub fn reset(&mut self, text: &str) {
        self.text = text.to_string();
        self.inbound = Some(text.to_string());
        self.deadline = None;
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    fn is_echo(&self) -> bool {
        self.inbound.as_deref() == Some(self.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn starts_with_placeholder_and_nothing_pending() {
        let doc = DocumentSync::new("r1", DEBOUNCE);
        assert_eq!(doc.text(), PLACEHOLDER);
        assert_eq!(doc.deadline(), None);
    }

    #[test]
    fn burst_of_edits_collapses_to_latest_text() {
        let t0 = Instant::now();
        let mut doc = DocumentSync::new("r1", DEBOUNCE);
        doc.local_change("a".into(), t0);
        doc.local_change("ab".into(), t0 + ms(50));
        doc.local_change("abc".into(), t0 + ms(100));

        assert_eq!(doc.take_due(t0 + ms(150)), None);
        assert_eq!(doc.take_due(t0 + ms(220)), Some("abc".to_string()));
        assert_eq!(doc.take_due(t0 + ms(500)), None);
    }

    #[test]
    fn remote_text_is_not_sent_back() {
        let t0 = Instant::now();
        let mut doc = DocumentSync::new("r1", DEBOUNCE);
        assert!(doc.apply_remote("r1", "T"));
        doc.local_change("T".into(), t0);
        assert_eq!(doc.deadline(), None);
        assert_eq!(doc.take_due(t0 + ms(1000)), None);
    }

    #[test]
    fn pending_edit_overtaken_by_remote_is_dropped() {
        let t0 = Instant::now();
        let mut doc = DocumentSync::new("r1", DEBOUNCE);
        doc.local_change("mine".into(), t0);
        assert!(doc.apply_remote("r1", "theirs"));
        assert_eq!(doc.text(), "theirs");
        assert_eq!(doc.take_due(t0 + ms(200)), None);
    }

    #[test]
    fn local_edit_after_remote_is_sent() {
        let t0 = Instant::now();
        let mut doc = DocumentSync::new("r1", DEBOUNCE);
        doc.apply_remote("r1", "T");
        doc.local_change("T2".into(), t0);
        assert_eq!(doc.take_due(t0 + DEBOUNCE), Some("T2".to_string()));
    }

    #[test]
    fn updates_for_other_rooms_are_ignored() {
        let mut doc = DocumentSync::new("r1", DEBOUNCE);
        assert!(!doc.apply_remote("r2", "elsewhere"));
        assert_eq!(doc.text(), PLACEHOLDER);
    }

    #[test]
    fn identical_remote_text_does_not_touch_buffer() {
        let mut doc = DocumentSync::new("r1", DEBOUNCE);
        doc.reset("same");
        assert!(!doc.apply_remote("r1", "same"));
    }
}
