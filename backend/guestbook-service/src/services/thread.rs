use std::collections::HashMap;

use crate::models::{Message, MessageId, Thread};

/// Attach replies to their roots.
///
/// Roots keep the order they arrive in and replies keep theirs within each
/// thread. A reply whose parent is not among `roots` is dropped: the parent
/// may have been filtered out (rejected, other language, other page) while
/// its replies are still stored.
pub fn aggregate(roots: Vec<Message>, replies: Vec<Message>) -> Vec<Thread> {
    let mut by_parent: HashMap<MessageId, Vec<Message>> = HashMap::new();
    for reply in replies {
        if let Some(parent_id) = reply.parent_id {
            by_parent.entry(parent_id).or_default().push(reply);
        }
    }

    roots
        .into_iter()
        .map(|root| {
            let replies = by_parent.remove(&root.id).unwrap_or_default();
            Thread {
                reply_count: replies.len(),
                message: root,
                replies,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageStatus;
    use chrono::{Duration, TimeZone, Utc};

    fn message(id: MessageId, parent_id: Option<MessageId>, minute: i64) -> Message {
        let at = Utc.with_ymd_and_hms(2025, 10, 1, 10, 0, 0).unwrap() + Duration::minutes(minute);
        Message {
            id,
            name: format!("user{}", id),
            email: None,
            body: format!("message {}", id),
            language: "global".into(),
            parent_id,
            is_admin_reply: false,
            status: MessageStatus::Approved,
            created_at: at,
            updated_at: at,
            ip: None,
        }
    }

    #[test]
    fn test_replies_attach_in_received_order() {
        let roots = vec![message(2, None, 5), message(1, None, 0)];
        let replies = vec![
            message(10, Some(1), 1),
            message(11, Some(2), 6),
            message(12, Some(1), 7),
        ];

        let threads = aggregate(roots, replies);

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].message.id, 2);
        assert_eq!(threads[1].message.id, 1);

        let ids: Vec<_> = threads[1].replies.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![10, 12]);
        assert_eq!(threads[0].replies[0].id, 11);
    }

    #[test]
    fn test_reply_count_matches_replies() {
        let roots = vec![message(1, None, 0), message(2, None, 1), message(3, None, 2)];
        let replies = vec![message(4, Some(1), 3), message(5, Some(1), 4)];

        for thread in aggregate(roots, replies) {
            assert_eq!(thread.reply_count, thread.replies.len());
        }
    }

    #[test]
    fn test_orphan_replies_are_dropped() {
        let roots = vec![message(1, None, 0)];
        let replies = vec![message(7, Some(99), 1), message(8, Some(1), 2)];

        let threads = aggregate(roots, replies);

        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].reply_count, 1);
        assert_eq!(threads[0].replies[0].id, 8);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(vec![], vec![message(3, Some(1), 0)]).is_empty());
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let roots = vec![message(1, None, 0), message(2, None, 1)];
        let replies = vec![message(3, Some(2), 2), message(4, Some(1), 3)];

        let first = aggregate(roots.clone(), replies.clone());
        let second = aggregate(roots, replies);
        assert_eq!(first, second);
    }
}
