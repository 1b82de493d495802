//! Async node operations: run, batch run and merge summaries.
//!
//! All mutations go through a mutex-guarded store so the active-node and
//! no-op-on-missing-id invariants survive concurrent completions. Locks are
//! never held across an await, and every completion handler re-checks that
//! its node still exists before touching it: a node deleted while its
//! request is in flight simply swallows the late update.

use crate::backend::CompletionBackend;
use chatweave_core::node::{ChatMessage, NodeId, Role};
use chatweave_core::store::NodeStore;
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;

/// Store handle shared between the UI and completion tasks.
pub type SharedStore = Arc<Mutex<NodeStore>>;

/// Assistant message appended when a node's completion fails.
pub const APOLOGY_MESSAGE: &str =
    "Sorry, something went wrong while generating a response. Please try again.";
/// Message that replaces a merge placeholder when summary generation fails.
pub const MERGE_FAILURE_MESSAGE: &str =
    "Failed to generate a summary of the merged conversations.";
/// Output word target handed to the summary prompt.
pub const MERGE_SUMMARY_WORD_LIMIT: usize = 75;

/// Run one query against a node: append the user message, request a
/// completion over the full history, append the reply.
///
/// Failures append the fixed apology instead of propagating; the loading
/// flag is always cleared so a node is never left stuck. No-op if the node
/// does not exist (or is deleted before the reply arrives).
pub async fn run_node<B: CompletionBackend>(
    store: &SharedStore,
    backend: &B,
    id: NodeId,
    query: &str,
) {
    let snapshot = {
        let mut guard = store.lock();
        if !guard.contains(id) {
            return;
        }
        guard.push_message(id, ChatMessage::user(query));
        guard.set_loading(id, true);
        guard.get(id).map(|n| (n.messages.clone(), n.model.clone()))
    };
    let Some((messages, model)) = snapshot else {
        return;
    };

    let result = backend.complete(&messages, &model).await;

    let mut guard = store.lock();
    if !guard.contains(id) {
        // Deleted while the request was in flight.
        return;
    }
    match result {
        Ok(reply) => guard.push_message(id, ChatMessage::assistant(reply)),
        Err(err) => {
            log::warn!("completion for node {id} failed: {err}");
            guard.push_message(id, ChatMessage::assistant(APOLOGY_MESSAGE));
        }
    }
    guard.set_loading(id, false);
}

/// Run one query against many nodes concurrently.
///
/// Settles when every per-node run has finished; each node's outcome is
/// independent and there is no rollback on partial failure.
pub async fn run_batch<B: CompletionBackend>(
    store: &SharedStore,
    backend: &B,
    ids: &[NodeId],
    query: &str,
) {
    join_all(ids.iter().map(|&id| run_node(store, backend, id, query))).await;
}

/// Merge two nodes: create the placeholder merge node, then fill it with a
/// generated summary of both parents' histories.
///
/// Returns the merge node's id, or `None` if either parent is missing. The
/// placeholder starts loading; success replaces its messages with one
/// assistant summary, failure with the fixed error message, and the loading
/// flag is cleared either way.
pub async fn merge_nodes<B: CompletionBackend>(
    store: &SharedStore,
    backend: &B,
    source: NodeId,
    target: NodeId,
) -> Option<NodeId> {
    let (merge_id, prompt, model) = {
        let mut guard = store.lock();
        let merge_id = guard.create_merge(source, target)?;
        let source_log = guard.get(source).map(|n| format_transcript(&n.messages))?;
        let target_log = guard.get(target).map(|n| format_transcript(&n.messages))?;
        let model = guard.get(merge_id).map(|n| n.model.clone())?;
        (merge_id, merge_prompt(&source_log, &target_log), model)
    };

    let request = vec![ChatMessage::user(prompt)];
    let result = backend.complete(&request, &model).await;

    let mut guard = store.lock();
    if !guard.contains(merge_id) {
        return Some(merge_id);
    }
    match result {
        Ok(summary) => {
            guard.replace_messages(merge_id, vec![ChatMessage::assistant(summary)]);
        }
        Err(err) => {
            log::warn!("merge summary for node {merge_id} failed: {err}");
            guard.replace_messages(
                merge_id,
                vec![ChatMessage::assistant(MERGE_FAILURE_MESSAGE)],
            );
        }
    }
    guard.set_loading(merge_id, false);
    Some(merge_id)
}

/// Render a conversation as a role-prefixed transcript, one turn per line.
pub fn format_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{role}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The fixed instructional prompt for merge summaries.
pub fn merge_prompt(source_log: &str, target_log: &str) -> String {
    format!(
        "You are merging two related conversations. Summarize the combined \
         key points of both conversations below in at most \
         {MERGE_SUMMARY_WORD_LIMIT} words. Respond with the summary only.\n\n\
         Conversation A:\n{source_log}\n\n\
         Conversation B:\n{target_log}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CompletionError;
    use chatweave_core::store::NodePatch;
    use kurbo::Point;
    use uuid::Uuid;

    /// Echoing backend. Fails for nodes whose model tag contains "fail";
    /// answers merge prompts with a fixed summary.
    struct MockBackend;

    impl CompletionBackend for MockBackend {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            model: &str,
        ) -> Result<String, CompletionError> {
            if model.contains("fail") {
                return Err(CompletionError::Status {
                    status: 500,
                    message: "mock failure".into(),
                });
            }
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            if last.starts_with("You are merging") {
                Ok("summary text".into())
            } else {
                Ok(format!("reply to: {last}"))
            }
        }
    }

    /// Backend that deletes the newest node from the store before replying,
    /// simulating a deletion racing the in-flight request.
    struct DeletingBackend {
        store: SharedStore,
    }

    impl CompletionBackend for DeletingBackend {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _model: &str,
        ) -> Result<String, CompletionError> {
            let mut guard = self.store.lock();
            if let Some(id) = guard.iter().last().map(|n| n.id) {
                guard.delete(id);
            }
            Ok("late reply".into())
        }
    }

    fn shared() -> SharedStore {
        Arc::new(Mutex::new(NodeStore::new()))
    }

    #[tokio::test]
    async fn test_run_node_appends_reply_and_clears_loading() {
        let store = shared();
        let id = store.lock().create_root(Point::ZERO);

        run_node(&store, &MockBackend, id, "ping").await;

        let guard = store.lock();
        let node = guard.get(id).unwrap();
        assert_eq!(node.messages.len(), 2);
        assert_eq!(node.messages[0], ChatMessage::user("ping"));
        assert_eq!(node.messages[1], ChatMessage::assistant("reply to: ping"));
        assert!(!node.is_loading);
    }

    #[tokio::test]
    async fn test_run_node_failure_appends_apology() {
        let store = shared();
        let id = store.lock().create_root(Point::ZERO);
        store.lock().apply_patch(
            id,
            NodePatch {
                model: Some("fail-model".into()),
                ..NodePatch::default()
            },
        );

        run_node(&store, &MockBackend, id, "ping").await;

        let guard = store.lock();
        let node = guard.get(id).unwrap();
        assert_eq!(node.messages.len(), 2);
        assert_eq!(node.messages[1], ChatMessage::assistant(APOLOGY_MESSAGE));
        // Never left stuck loading on error.
        assert!(!node.is_loading);
    }

    #[tokio::test]
    async fn test_run_node_missing_id_is_noop() {
        let store = shared();
        store.lock().create_root(Point::ZERO);

        run_node(&store, &MockBackend, Uuid::new_v4(), "ping").await;

        let guard = store.lock();
        assert_eq!(guard.iter().next().unwrap().messages.len(), 0);
    }

    #[tokio::test]
    async fn test_run_node_deleted_mid_flight_is_noop() {
        let store = shared();
        let (bystander, victim) = {
            let mut guard = store.lock();
            let bystander = guard.create_root(Point::ZERO);
            let victim = guard.create_root(Point::new(600.0, 0.0));
            (bystander, victim)
        };

        let backend = DeletingBackend {
            store: Arc::clone(&store),
        };
        run_node(&store, &backend, victim, "ping").await;

        let guard = store.lock();
        // The reply arrived after the deletion and was swallowed.
        assert!(!guard.contains(victim));
        assert_eq!(guard.len(), 1);
        let other = guard.get(bystander).unwrap();
        assert!(other.messages.is_empty());
        assert!(!other.is_loading);
    }

    #[tokio::test]
    async fn test_batch_outcomes_are_independent() {
        let store = shared();
        let (n1, n2) = {
            let mut guard = store.lock();
            let n1 = guard.create_root(Point::ZERO);
            let n2 = guard.create_root(Point::new(600.0, 0.0));
            guard.apply_patch(
                n1,
                NodePatch {
                    model: Some("fail-model".into()),
                    ..NodePatch::default()
                },
            );
            (n1, n2)
        };

        run_batch(&store, &MockBackend, &[n1, n2], "ping").await;

        let guard = store.lock();
        let first = guard.get(n1).unwrap();
        let second = guard.get(n2).unwrap();
        // Both received the user message.
        assert_eq!(first.messages[0], ChatMessage::user("ping"));
        assert_eq!(second.messages[0], ChatMessage::user("ping"));
        // n1 failed, n2 succeeded, independently.
        assert_eq!(first.messages[1], ChatMessage::assistant(APOLOGY_MESSAGE));
        assert_eq!(second.messages[1], ChatMessage::assistant("reply to: ping"));
        assert!(!first.is_loading);
        assert!(!second.is_loading);
    }

    #[tokio::test]
    async fn test_merge_fills_placeholder_with_summary() {
        let store = shared();
        let (a, b) = {
            let mut guard = store.lock();
            let a = guard.create_root(Point::ZERO);
            let b = guard.create_root(Point::new(800.0, 0.0));
            guard.push_message(a, ChatMessage::user("hi"));
            guard.push_message(b, ChatMessage::user("yo"));
            (a, b)
        };

        let merged = merge_nodes(&store, &MockBackend, a, b).await.unwrap();

        let guard = store.lock();
        let node = guard.get(merged).unwrap();
        assert_eq!(node.parent_ids, vec![a, b]);
        assert_eq!(node.messages, vec![ChatMessage::assistant("summary text")]);
        assert!(!node.is_loading);
    }

    #[tokio::test]
    async fn test_merge_failure_fills_error_message() {
        let store = shared();
        let (a, b) = {
            let mut guard = store.lock();
            let a = guard.create_root(Point::ZERO);
            let b = guard.create_root(Point::new(800.0, 0.0));
            guard.apply_patch(
                a,
                NodePatch {
                    model: Some("fail-model".into()),
                    ..NodePatch::default()
                },
            );
            (a, b)
        };

        let merged = merge_nodes(&store, &MockBackend, a, b).await.unwrap();

        let guard = store.lock();
        let node = guard.get(merged).unwrap();
        assert_eq!(
            node.messages,
            vec![ChatMessage::assistant(MERGE_FAILURE_MESSAGE)]
        );
        assert!(!node.is_loading);
    }

    #[tokio::test]
    async fn test_merge_placeholder_deleted_mid_flight_not_resurrected() {
        let store = shared();
        let (a, b) = {
            let mut guard = store.lock();
            let a = guard.create_root(Point::ZERO);
            let b = guard.create_root(Point::new(800.0, 0.0));
            (a, b)
        };

        // The placeholder is the newest node when the request goes out, so
        // the backend deletes it before the summary comes back.
        let backend = DeletingBackend {
            store: Arc::clone(&store),
        };
        let merged = merge_nodes(&store, &backend, a, b).await.unwrap();

        let guard = store.lock();
        assert!(!guard.contains(merged));
        assert_eq!(guard.len(), 2);
        assert!(guard.contains(a));
        assert!(guard.contains(b));
    }

    #[tokio::test]
    async fn test_merge_missing_parent_is_noop() {
        let store = shared();
        let a = store.lock().create_root(Point::ZERO);

        let merged = merge_nodes(&store, &MockBackend, a, Uuid::new_v4()).await;
        assert!(merged.is_none());
        assert_eq!(store.lock().len(), 1);
    }

    #[test]
    fn test_transcript_is_role_prefixed() {
        let messages = vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello there"),
        ];
        assert_eq!(
            format_transcript(&messages),
            "User: hi\nAssistant: hello there"
        );
    }

    #[test]
    fn test_merge_prompt_carries_word_limit() {
        let prompt = merge_prompt("User: hi", "User: yo");
        assert!(prompt.contains("75 words"));
        assert!(prompt.contains("Conversation A:\nUser: hi"));
        assert!(prompt.contains("Conversation B:\nUser: yo"));
    }
}
