use std::collections::HashMap;

use crate::types::{MessageId, MessageRecord, MessageView, SequenceChange};

/// Ordered, de-duplicated list of message views in arrival order.
///
/// A position index keyed by [`MessageId`] backs identity lookups, so
/// updates and deletes never scan the list.
#[derive(Debug, Clone, Default)]
pub struct LocalSequence {
    items: Vec<MessageView>,
    positions: HashMap<MessageId, usize>,
}

impl LocalSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current views in display order.
    pub fn items(&self) -> &[MessageView] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self, id: &MessageId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn get(&self, id: &MessageId) -> Option<&MessageView> {
        self.position(id).map(|idx| &self.items[idx])
    }

    /// Replace all content with views of `records`, in the given order.
    ///
    /// Repeated ids in the history keep their first occurrence.
    pub fn reset(&mut self, records: &[MessageRecord]) -> &[MessageView] {
        self.items.clear();
        self.positions.clear();
        for record in records {
            if self.positions.contains_key(&record.id) {
                continue;
            }
            self.positions.insert(record.id.clone(), self.items.len());
            self.items.push(MessageView::from_record(record));
        }
        &self.items
    }

    /// Append a view for a newly received record.
    ///
    /// A record whose id is already present is refreshed in place instead,
    /// so one record never maps to two views.
    pub fn push(&mut self, record: &MessageRecord) -> SequenceChange {
        if let Some(change) = self.refresh(record) {
            return change;
        }

        let index = self.items.len();
        let view = MessageView::from_record(record);
        self.positions.insert(record.id.clone(), index);
        self.items.push(view.clone());
        SequenceChange::Inserted { index, view }
    }

    /// Refresh the view wrapping `record` in place. `None` when not present.
    pub fn refresh(&mut self, record: &MessageRecord) -> Option<SequenceChange> {
        let index = self.position(&record.id)?;
        let view = &mut self.items[index];
        view.refresh(record);
        Some(SequenceChange::Updated {
            index,
            view: view.clone(),
        })
    }

    /// Remove the view for `id`. `None` when not present.
    pub fn remove(&mut self, id: &MessageId) -> Option<SequenceChange> {
        let index = self.positions.remove(id)?;
        self.items.remove(index);
        for (offset, view) in self.items[index..].iter().enumerate() {
            self.positions.insert(view.id.clone(), index + offset);
        }
        Some(SequenceChange::Removed {
            index,
            id: id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, text: &str) -> MessageRecord {
        MessageRecord {
            id: MessageId::new(id),
            author: "alice".to_owned(),
            text: text.to_owned(),
            created_at_ms: 1_731_000_000,
            edited_at_ms: None,
        }
    }

    fn texts(sequence: &LocalSequence) -> Vec<&str> {
        sequence.items().iter().map(|v| v.text.as_str()).collect()
    }

    #[test]
    fn applies_seed_receive_update_delete_sequence() {
        let mut sequence = LocalSequence::new();
        sequence.reset(&[record("a", "A"), record("b", "B")]);

        sequence.push(&record("c", "C"));
        assert_eq!(texts(&sequence), ["A", "B", "C"]);

        let change = sequence
            .refresh(&record("b", "B'"))
            .expect("b should be present");
        assert!(matches!(change, SequenceChange::Updated { index: 1, .. }));
        assert_eq!(texts(&sequence), ["A", "B'", "C"]);

        sequence
            .remove(&MessageId::new("a"))
            .expect("a should be present");
        assert_eq!(texts(&sequence), ["B'", "C"]);
        assert_eq!(sequence.position(&MessageId::new("b")), Some(0));
        assert_eq!(sequence.position(&MessageId::new("c")), Some(1));
    }

    #[test]
    fn keeps_arrival_order_for_received_records() {
        let mut sequence = LocalSequence::new();
        sequence.reset(&[record("s1", "seed")]);

        let received = ["r3", "r1", "r2"];
        for id in received {
            sequence.push(&record(id, id));
        }

        assert_eq!(sequence.len(), 1 + received.len());
        assert_eq!(texts(&sequence), ["seed", "r3", "r1", "r2"]);
    }

    #[test]
    fn missing_ids_are_silent_noops() {
        let mut sequence = LocalSequence::new();
        sequence.reset(&[record("a", "A")]);

        assert_eq!(sequence.refresh(&record("zzz", "x")), None);
        assert_eq!(sequence.remove(&MessageId::new("zzz")), None);
        assert_eq!(texts(&sequence), ["A"]);
    }

    #[test]
    fn duplicate_receive_refreshes_instead_of_appending() {
        let mut sequence = LocalSequence::new();
        sequence.push(&record("a", "first"));
        let change = sequence.push(&record("a", "second"));

        assert!(matches!(change, SequenceChange::Updated { index: 0, .. }));
        assert_eq!(sequence.len(), 1);
        assert_eq!(texts(&sequence), ["second"]);
    }

    #[test]
    fn reset_drops_previous_content_and_repeated_history_ids() {
        let mut sequence = LocalSequence::new();
        sequence.push(&record("old", "old"));

        sequence.reset(&[record("a", "A"), record("a", "A again"), record("b", "B")]);
        assert_eq!(texts(&sequence), ["A", "B"]);
        assert!(sequence.get(&MessageId::new("old")).is_none());
    }

    #[test]
    fn update_changes_fields_but_not_position() {
        let mut sequence = LocalSequence::new();
        sequence.reset(&[record("a", "A"), record("b", "B"), record("c", "C")]);

        let mut edited = record("b", "edited");
        edited.edited_at_ms = Some(1_731_000_100);
        sequence.refresh(&edited);

        let view = sequence.get(&MessageId::new("b")).expect("b present");
        assert_eq!(view.text, "edited");
        assert!(view.edited);
        assert_eq!(sequence.position(&MessageId::new("b")), Some(1));
    }
}
