use hush_types::Message;

/// Ordered, append-only log of the active conversation.
///
/// Insertion order is authoritative. Nothing here sorts by timestamp or
/// drops duplicate ids: a message seen both in fetched history and on the
/// live stream is kept twice.
#[derive(Debug, Default, Clone)]
pub struct MessageStore {
    messages: Vec<Message>,
    /// Length of the prefix that came from the last history snapshot.
    history_len: usize,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Swap the history prefix for `snapshot`, keeping everything appended
    /// since the previous snapshot after it. Loading into an empty store is
    /// a plain bulk replace. Entries appended before a load end up after the
    /// snapshot, so `all()` equals the snapshot only when nothing raced it.
    pub fn replace_history(&mut self, snapshot: Vec<Message>) {
        let tail = self.messages.split_off(self.history_len);
        self.history_len = snapshot.len();
        self.messages = snapshot;
        self.messages.extend(tail);
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Entries that arrived after the last history snapshot.
    pub fn live_tail(&self) -> &[Message] {
        &self.messages[self.history_len..]
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn msg(id: &str, sender: &str, secs: i64) -> Message {
        Message {
            id: id.into(),
            sender: sender.into(),
            body: format!("body of {}", id),
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        }
    }

    fn ids(store: &MessageStore) -> Vec<&str> {
        store.all().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn append_preserves_call_order_not_timestamp_order() {
        let mut store = MessageStore::new();
        store.append(msg("late", "friend", 300));
        store.append(msg("early", "Kunal", 0));
        store.append(msg("middle", "friend", 100));

        assert_eq!(ids(&store), ["late", "early", "middle"]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.last().unwrap().id, "middle");
    }

    #[test]
    fn duplicate_ids_are_kept() {
        let mut store = MessageStore::new();
        store.replace_history(vec![msg("m1", "Kunal", 0)]);
        // The live echo of a message already present in history
        store.append(msg("m1", "Kunal", 0));

        assert_eq!(ids(&store), ["m1", "m1"]);
    }

    #[test]
    fn first_history_load_is_exactly_the_snapshot() {
        let mut store = MessageStore::new();
        let snapshot = vec![msg("b", "friend", 5), msg("a", "Kunal", 1)];
        store.replace_history(snapshot.clone());

        assert_eq!(store.all(), snapshot.as_slice());
        assert_eq!(store.history_len(), 2);
        assert!(store.live_tail().is_empty());
    }

    #[test]
    fn history_lands_before_messages_that_raced_it() {
        let mut store = MessageStore::new();
        store.append(msg("live-1", "friend", 50));
        store.replace_history(vec![msg("h1", "Kunal", 0), msg("h2", "friend", 10)]);
        store.append(msg("live-2", "Kunal", 60));

        assert_eq!(ids(&store), ["h1", "h2", "live-1", "live-2"]);
        assert_eq!(store.live_tail().len(), 2);
    }

    #[test]
    fn reloading_history_only_replaces_the_prefix() {
        let mut store = MessageStore::new();
        store.replace_history(vec![msg("h1", "Kunal", 0)]);
        store.append(msg("live", "friend", 5));
        store.replace_history(vec![msg("h1", "Kunal", 0), msg("h2", "Kunal", 1)]);

        assert_eq!(ids(&store), ["h1", "h2", "live"]);
    }

    #[test]
    fn empty_store() {
        let store = MessageStore::new();
        assert!(store.is_empty());
        assert!(store.last().is_none());
        assert!(store.all().is_empty());
    }
}
