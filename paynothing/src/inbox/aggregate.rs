//! Folding a message snapshot into per-counterpart conversation summaries.
//!
//! The fold is a max-by-timestamp for the preview fields and a sum for the
//! unread count, so the result does not depend on snapshot order.

use std::collections::{hash_map::Entry, HashMap};

use log::debug;

use crate::models::{ConversationDraft, ConversationId, Message, MessageId, UserId};

/// Working state for one counterpart.
struct Fold<'a> {
    latest: &'a Message,
    unread: u32,
}

/// Fold every message `me` participates in into one draft per counterpart.
///
/// Records whose conversation key is malformed or does not include `me` are
/// skipped. Copies of one message id are merged first: the message counts as
/// read if any copy is read. Output is ordered newest first; equal timestamps
/// order by counterpart id.
pub fn aggregate<'a, I>(messages: I, me: &UserId) -> Vec<ConversationDraft>
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut folds: HashMap<UserId, Fold<'a>> = HashMap::new();

    for (msg, read) in dedup(messages) {
        let Some(counterpart) = counterpart(msg, me) else {
            debug!(
                "skipping message {} in {:?}: no counterpart for {}",
                msg.id, msg.conversation_id, me
            );
            continue;
        };

        let unread = u32::from(msg.sender_id == counterpart && !read);

        match folds.entry(counterpart) {
            Entry::Vacant(slot) => {
                slot.insert(Fold {
                    latest: msg,
                    unread,
                });
            }
            Entry::Occupied(mut slot) => {
                let fold = slot.get_mut();
                if is_newer(msg, fold.latest) {
                    fold.latest = msg;
                }
                fold.unread += unread;
            }
        }
    }

    let mut drafts: Vec<ConversationDraft> = folds
        .into_iter()
        .map(|(counterpart_id, fold)| ConversationDraft {
            conversation_id: fold.latest.conversation_id.clone(),
            counterpart_id,
            last_message_text: fold.latest.text.clone(),
            last_message_timestamp: fold.latest.timestamp,
            unread_count: fold.unread,
        })
        .collect();

    sort_newest_first(&mut drafts);
    drafts
}

/// The other participant of `msg`, if `me` is a participant at all.
pub fn counterpart(msg: &Message, me: &UserId) -> Option<UserId> {
    if !msg.involves(me) {
        return None;
    }
    msg.conversation_id.counterpart_of(me)
}

/// Merge records sharing a message id, pairing each with its effective read flag.
///
/// The representative copy is the largest by content, so the merge is the same
/// for every arrival order. Records without an id are never merged.
fn dedup<'a, I>(messages: I) -> Vec<(&'a Message, bool)>
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut by_id: HashMap<&'a MessageId, (&'a Message, bool)> = HashMap::new();
    let mut unnamed = Vec::new();

    for msg in messages {
        if msg.id.is_empty() {
            unnamed.push((msg, msg.read));
            continue;
        }
        match by_id.entry(&msg.id) {
            Entry::Vacant(slot) => {
                slot.insert((msg, msg.read));
            }
            Entry::Occupied(mut slot) => {
                debug!("merging repeated message {}", msg.id);
                let (kept, read) = slot.get_mut();
                *read |= msg.read;
                if content_key(msg) > content_key(*kept) {
                    *kept = msg;
                }
            }
        }
    }

    by_id.into_values().chain(unnamed).collect()
}

fn content_key(msg: &Message) -> (i64, &ConversationId, &UserId, &str) {
    (msg.timestamp, &msg.conversation_id, &msg.sender_id, &msg.text)
}

// Strictly later timestamps win; equal timestamps fall back to the message id
// so that the winner is the same for every arrival order.
fn is_newer(candidate: &Message, current: &Message) -> bool {
    (candidate.timestamp, &candidate.id) > (current.timestamp, &current.id)
}

fn sort_newest_first(drafts: &mut [ConversationDraft]) {
    drafts.sort_by(|a, b| {
        b.last_message_timestamp
            .cmp(&a.last_message_timestamp)
            .then_with(|| a.counterpart_id.cmp(&b.counterpart_id))
    });
}

/// Messages of one conversation, oldest first.
pub fn conversation_thread<'a, I>(messages: I, conversation: &ConversationId) -> Vec<Message>
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut thread: Vec<Message> = messages
        .into_iter()
        .filter(|m| m.conversation_id == *conversation)
        .cloned()
        .collect();
    thread.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    thread
}

/// IDs of messages `viewer` received in `conversation` that are still unread.
///
/// These are the messages to flag as read once the viewer opens the thread.
pub fn unread_to_mark<'a, I>(
    messages: I,
    viewer: &UserId,
    conversation: &ConversationId,
) -> Vec<MessageId>
where
    I: IntoIterator<Item = &'a Message>,
{
    messages
        .into_iter()
        .filter(|m| m.conversation_id == *conversation && !m.id.is_empty())
        .filter(|m| m.is_unread_for(viewer))
        .map(|m| m.id.clone())
        .collect()
}

/// Unread messages across all conversations.
pub fn total_unread<'a, I, T>(conversations: I) -> u32
where
    I: IntoIterator<Item = &'a T>,
    T: UnreadCount + 'a,
{
    conversations.into_iter().map(UnreadCount::unread).sum()
}

/// Anything carrying an unread counter.
pub trait UnreadCount {
    fn unread(&self) -> u32;
}

impl UnreadCount for ConversationDraft {
    fn unread(&self) -> u32 {
        self.unread_count
    }
}

impl UnreadCount for crate::models::ConversationSummary {
    fn unread(&self) -> u32 {
        self.unread_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn msg(id: &str, conv: &str, sender: &str, text: &str, ts: i64, read: bool) -> Message {
        let conversation_id = ConversationId::from(conv);
        let participants = conversation_id
            .participants()
            .map(|(a, b)| vec![a, b])
            .unwrap_or_default();
        let receiver_id = participants
            .iter()
            .find(|p| p.as_str() != sender)
            .cloned()
            .unwrap_or_default();
        Message {
            id: id.into(),
            conversation_id,
            sender_id: sender.into(),
            receiver_id,
            participants,
            sender_username: None,
            text: text.into(),
            timestamp: ts,
            read,
        }
    }

    fn draft(conv: &str, who: &str, text: &str, ts: i64, unread: u32) -> ConversationDraft {
        ConversationDraft {
            conversation_id: conv.into(),
            counterpart_id: who.into(),
            last_message_text: text.into(),
            last_message_timestamp: ts,
            unread_count: unread,
        }
    }

    fn permutations(items: &[Message]) -> Vec<Vec<Message>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head.clone());
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn test_inbox_scenario() {
        let me = UserId::from("u1");
        let messages = vec![
            msg("m1", "u1_u2", "u2", "hi", 1000, false),
            msg("m2", "u1_u2", "u1", "hey", 2000, false),
            msg("m3", "u1_u3", "u3", "yo", 1500, true),
        ];

        assert_eq!(
            aggregate(&messages, &me),
            vec![
                draft("u1_u2", "u2", "hey", 2000, 1),
                draft("u1_u3", "u3", "yo", 1500, 0),
            ]
        );
    }

    #[test]
    fn test_unread_ignores_own_messages() {
        let me = UserId::from("a");
        let messages = vec![
            msg("1", "a_b", "b", "one", 10, false),
            msg("2", "a_b", "b", "two", 20, false),
            msg("3", "a_b", "a", "three", 30, false),
        ];

        let drafts = aggregate(&messages, &me);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].unread_count, 2);
        assert_eq!(drafts[0].last_message_text, "three");
    }

    #[test]
    fn test_unread_counts_older_messages() {
        let me = UserId::from("a");
        let messages = vec![
            msg("1", "a_b", "b", "old unread", 10, false),
            msg("2", "a_b", "b", "new read", 20, true),
        ];

        let drafts = aggregate(&messages, &me);
        assert_eq!(drafts[0].unread_count, 1);
        assert_eq!(drafts[0].last_message_text, "new read");
    }

    #[test]
    fn test_last_message_is_max_timestamp() {
        let me = UserId::from("a");
        let messages = vec![
            msg("1", "a_b", "b", "t100", 100, true),
            msg("2", "a_b", "a", "t300", 300, true),
            msg("3", "a_b", "b", "t200", 200, true),
        ];

        for order in permutations(&messages) {
            let drafts = aggregate(&order, &me);
            assert_eq!(drafts[0].last_message_timestamp, 300);
            assert_eq!(drafts[0].last_message_text, "t300");
        }
    }

    #[test]
    fn test_result_is_independent_of_arrival_order() {
        let me = UserId::from("u1");
        let messages = vec![
            msg("m1", "u1_u2", "u2", "first", 100, false),
            msg("m2", "u1_u2", "u2", "tie-a", 500, false),
            msg("m3", "u1_u2", "u1", "tie-b", 500, true),
            msg("m4", "u0_u1", "u0", "other", 500, false),
            msg("m5", "u1_u3", "u1", "mine", 50, false),
        ];

        let expected = aggregate(&messages, &me);
        for order in permutations(&messages) {
            assert_eq!(aggregate(&order, &me), expected);
        }

        // Equal timestamps resolve to the larger message id.
        assert_eq!(expected[1].last_message_text, "tie-b");
    }

    #[test]
    fn test_sort_order() {
        let me = UserId::from("a");
        let messages = vec![
            msg("1", "a_b", "b", "b", 50, true),
            msg("2", "a_c", "c", "c", 900, true),
            msg("3", "a_d", "d", "d", 300, true),
        ];

        let timestamps: Vec<i64> = aggregate(&messages, &me)
            .iter()
            .map(|d| d.last_message_timestamp)
            .collect();
        assert_eq!(timestamps, vec![900, 300, 50]);
    }

    #[test]
    fn test_equal_timestamps_sort_by_counterpart() {
        let me = UserId::from("a");
        let messages = vec![
            msg("1", "a_c", "c", "c", 100, true),
            msg("2", "a_b", "b", "b", 100, true),
        ];

        let order: Vec<String> = aggregate(&messages, &me)
            .into_iter()
            .map(|d| d.counterpart_id.0)
            .collect();
        assert_eq!(order, vec!["b", "c"]);
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let me = UserId::from("u1");
        let mut not_mine = msg("x1", "u2_u3", "u2", "not for me", 10, false);
        let self_talk = msg("x2", "u1_u1", "u1", "note to self", 20, false);
        let bad_key = msg("x3", "u1", "u1", "broken", 30, false);
        let three_way = msg("x4", "u1_u2_u3", "u2", "group", 40, false);

        // Key names me, but the participant list does not.
        let mut spoofed = msg("x5", "u1_u4", "u4", "spoofed", 50, false);
        spoofed.participants = vec!["u4".into(), "u5".into()];

        let good = msg("m1", "u1_u2", "u2", "ok", 5, false);
        not_mine.participants.clear();

        let messages = vec![not_mine, self_talk, bad_key, three_way, spoofed, good];
        assert_eq!(
            aggregate(&messages, &me),
            vec![draft("u1_u2", "u2", "ok", 5, 1)]
        );
    }

    #[test]
    fn test_repeated_message_id_folds_once() {
        let me = UserId::from("a");
        let m = msg("1", "a_b", "b", "dup", 10, false);
        let messages = vec![m.clone(), m];

        assert_eq!(aggregate(&messages, &me)[0].unread_count, 1);
    }

    #[test]
    fn test_conflicting_copies_merge_independent_of_order() {
        let me = UserId::from("a");
        let stale = msg("1", "a_b", "b", "dup", 10, false);
        let fresh = msg("1", "a_b", "b", "dup", 10, true);
        let messages = vec![
            stale,
            fresh,
            msg("2", "a_b", "b", "later", 20, false),
            msg("3", "a_c", "c", "other", 15, false),
        ];

        let expected = aggregate(&messages, &me);
        assert_eq!(expected[0].unread_count, 1);
        assert_eq!(expected[1].unread_count, 1);
        for order in permutations(&messages) {
            assert_eq!(aggregate(&order, &me), expected);
        }
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(aggregate(&Vec::new(), &UserId::from("a")).is_empty());
    }

    #[test]
    fn test_conversation_thread() {
        let conv = ConversationId::from("a_b");
        let messages = vec![
            msg("3", "a_b", "a", "third", 30, false),
            msg("1", "a_b", "b", "first", 10, false),
            msg("9", "a_c", "c", "elsewhere", 20, false),
            msg("2", "a_b", "b", "second", 20, true),
        ];

        let texts: Vec<String> = conversation_thread(&messages, &conv)
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unread_to_mark() {
        let conv = ConversationId::from("a_b");
        let messages = vec![
            msg("1", "a_b", "b", "unread from b", 10, false),
            msg("2", "a_b", "b", "already read", 20, true),
            msg("3", "a_b", "a", "mine", 30, false),
            msg("4", "a_c", "c", "other thread", 40, false),
        ];

        assert_eq!(
            unread_to_mark(&messages, &"a".into(), &conv),
            vec![MessageId::from("1")]
        );
        assert_eq!(
            unread_to_mark(&messages, &"b".into(), &conv),
            vec![MessageId::from("3")]
        );
    }

    #[test]
    fn test_total_unread() {
        let drafts = vec![
            draft("a_b", "b", "x", 2, 3),
            draft("a_c", "c", "y", 1, 4),
        ];
        assert_eq!(total_unread(&drafts), 7);
    }
}
