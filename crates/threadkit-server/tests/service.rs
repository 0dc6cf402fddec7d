use std::sync::Arc;
use std::time::Duration;

use threadkit_db::{Database, ErrorKind, ManualClock, StoreOptions};
use threadkit_server::sweeper::spawn_typing_sweeper;
use threadkit_server::{Dispatcher, ServiceError, ThreadService};
use threadkit_types::api::{
    AddCommentRequest, CreateThreadRequest, EditMessageRequest, GetOrCreateZoneRequest,
    ListMessagesRequest, ListThreadsRequest, SetTypingRequest, ToggleReactionRequest,
};
use threadkit_types::events::{OperationDescriptor, OperationType, ThreadEvent};
use threadkit_types::models::SortOrder;
use uuid::Uuid;

fn service() -> (ThreadService, ManualClock) {
    let clock = ManualClock::new(1_700_000_000_000);
    let db = Database::open_in_memory_with(Arc::new(clock.clone()), StoreOptions::default()).unwrap();
    (ThreadService::new(db, Dispatcher::new(64)), clock)
}

async fn thread(svc: &ThreadService) -> (Uuid, Uuid) {
    let zone_id = svc
        .get_or_create_zone(
            "alice",
            GetOrCreateZoneRequest {
                entity_id: "doc-42".into(),
                metadata: None,
            },
        )
        .await
        .unwrap();
    let thread_id = svc
        .create_thread(
            "alice",
            CreateThreadRequest {
                zone_id,
                position: None,
                metadata: None,
            },
        )
        .await
        .unwrap();
    (zone_id, thread_id)
}

fn comment(thread_id: Uuid, body: &str) -> AddCommentRequest {
    AddCommentRequest {
        thread_id,
        body: body.into(),
        attachments: vec![],
    }
}

#[tokio::test]
async fn comment_publishes_message_and_mentions() {
    let (svc, _) = service();
    let (_, thread_id) = thread(&svc).await;
    let mut sub = svc.dispatcher().subscribe_thread(thread_id);

    let res = svc
        .add_comment("alice", comment(thread_id, "@bob @carol take a look"))
        .await
        .unwrap();
    assert_eq!(res.mentions.len(), 2);

    match sub.recv().await.unwrap() {
        ThreadEvent::NewMessage {
            message_id,
            author_id,
            mentions,
            ..
        } => {
            assert_eq!(message_id, res.message_id);
            assert_eq!(author_id, "alice");
            assert_eq!(mentions, res.mentions);
        }
        other => panic!("unexpected {:?}", other),
    }
    for expected in ["bob", "carol"] {
        match sub.recv().await.unwrap() {
            ThreadEvent::Mention {
                mentioned_user_id, ..
            } => assert_eq!(mentioned_user_id, expected),
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[tokio::test]
async fn message_and_reaction_events_carry_thread() {
    let (svc, _) = service();
    let (_, thread_id) = thread(&svc).await;
    let res = svc.add_comment("alice", comment(thread_id, "first")).await.unwrap();
    let mut sub = svc.dispatcher().subscribe_thread(thread_id);

    svc.edit_message(
        "alice",
        EditMessageRequest {
            message_id: res.message_id,
            body: "second".into(),
        },
    )
    .await
    .unwrap();
    svc.add_reaction("bob", res.message_id, "👍").await.unwrap();
    svc.remove_reaction("bob", res.message_id, "👍").await.unwrap();
    svc.delete_message("alice", res.message_id).await.unwrap();

    assert!(matches!(
        sub.recv().await.unwrap(),
        ThreadEvent::MessageEdited { message_id, .. } if message_id == res.message_id
    ));
    assert!(matches!(
        sub.recv().await.unwrap(),
        ThreadEvent::ReactionAdded { ref emoji, .. } if emoji == "👍"
    ));
    assert!(matches!(
        sub.recv().await.unwrap(),
        ThreadEvent::ReactionRemoved { ref user_id, .. } if user_id == "bob"
    ));
    assert!(matches!(
        sub.recv().await.unwrap(),
        ThreadEvent::MessageDeleted { message_id, .. } if message_id == res.message_id
    ));
}

#[tokio::test]
async fn only_the_author_may_edit_or_delete() {
    let (svc, _) = service();
    let (_, thread_id) = thread(&svc).await;
    let res = svc.add_comment("alice", comment(thread_id, "draft")).await.unwrap();

    let err = svc
        .edit_message(
            "bob",
            EditMessageRequest {
                message_id: res.message_id,
                body: "mine now".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::PermissionDenied));

    let err = svc.delete_message("bob", res.message_id).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::PermissionDenied));

    svc.delete_message("alice", res.message_id).await.unwrap();
    let msg = svc.get_message("bob", res.message_id).await.unwrap().unwrap();
    assert!(msg.message.is_deleted);
}

#[tokio::test]
async fn reactions_report_viewer() {
    let (svc, _) = service();
    let (_, thread_id) = thread(&svc).await;
    let res = svc.add_comment("alice", comment(thread_id, "ship it")).await.unwrap();
    let toggle = |emoji: &str| ToggleReactionRequest {
        message_id: res.message_id,
        emoji: emoji.into(),
    };

    assert!(svc.toggle_reaction("bob", toggle("🚀")).await.unwrap().added);
    assert!(svc.add_reaction("carol", res.message_id, "🚀").await.unwrap().is_some());
    assert!(svc.add_reaction("carol", res.message_id, "🚀").await.unwrap().is_none());

    let as_bob = svc.reaction_summary("bob", res.message_id).await.unwrap();
    assert_eq!(as_bob[0].count, 2);
    assert!(as_bob[0].includes_me);
    let as_dave = svc.reaction_summary("dave", res.message_id).await.unwrap();
    assert!(!as_dave[0].includes_me);

    assert!(!svc.toggle_reaction("bob", toggle("🚀")).await.unwrap().added);
    assert!(svc.remove_reaction("carol", res.message_id, "🚀").await.unwrap());
    assert!(svc.reaction_summary("bob", res.message_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn listing_through_the_service() {
    let (svc, clock) = service();
    let (zone_id, thread_id) = thread(&svc).await;
    for i in 0..5 {
        svc.add_comment("alice", comment(thread_id, &format!("#{}", i)))
            .await
            .unwrap();
        clock.advance(Duration::from_millis(10));
    }

    let page = svc
        .list_messages(
            "bob",
            ListMessagesRequest {
                thread_id,
                limit: 3,
                cursor: None,
                order: SortOrder::Desc,
                include_deleted: false,
            },
        )
        .await
        .unwrap();
    assert!(page.has_more);
    assert_eq!(page.messages[0].message.body, "#4");

    let threads = svc
        .list_threads(
            "bob",
            ListThreadsRequest {
                zone_id,
                limit: 10,
                include_resolved: false,
                cursor: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(threads.threads.len(), 1);
    assert_eq!(threads.threads[0].message_count, 5);

    svc.resolve_thread("bob", thread_id).await.unwrap();
    let threads = svc
        .list_threads(
            "bob",
            ListThreadsRequest {
                zone_id,
                limit: 10,
                include_resolved: false,
                cursor: None,
            },
        )
        .await
        .unwrap();
    assert!(threads.threads.is_empty());
}

#[tokio::test]
async fn authorizer_can_refuse() {
    let clock = ManualClock::new(0);
    let db = Database::open_in_memory_with(Arc::new(clock), StoreOptions::default()).unwrap();
    let read_only = |op: &OperationDescriptor, caller: &str| match op.op {
        OperationType::Read => Ok(caller.to_string()),
        _ => Err(ServiceError::Unauthorized(format!("{:?} not allowed", op.op))),
    };
    let svc = ThreadService::with_authorizer(db, Dispatcher::default(), Arc::new(read_only));

    let err = svc
        .get_or_create_zone(
            "alice",
            GetOrCreateZoneRequest {
                entity_id: "doc".into(),
                metadata: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
    assert!(svc.get_zone("alice", "doc").await.unwrap().is_none());
}

#[tokio::test]
async fn typing_hides_caller_and_expires() {
    let (svc, clock) = service();
    let (_, thread_id) = thread(&svc).await;
    for user in ["alice", "bob"] {
        svc.set_typing(
            user,
            SetTypingRequest {
                thread_id,
                is_typing: true,
            },
        )
        .await
        .unwrap();
    }

    let seen: Vec<String> = svc
        .get_typing_users("alice", thread_id)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.user_id)
        .collect();
    assert_eq!(seen, vec!["bob"]);

    clock.advance(Duration::from_secs(6));
    assert!(svc.get_typing_users("carol", thread_id).await.unwrap().is_empty());
    assert_eq!(svc.db().typing_indicators(thread_id).unwrap().len(), 2);

    let sweeper = spawn_typing_sweeper(svc.clone(), Duration::from_millis(5));
    for _ in 0..100 {
        if svc.db().typing_indicators(thread_id).unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    sweeper.abort();
    assert!(svc.db().typing_indicators(thread_id).unwrap().is_empty());
}

#[tokio::test]
async fn redundant_typing_stop_is_silent() {
    let (svc, _) = service();
    let (_, thread_id) = thread(&svc).await;
    let mut sub = svc.dispatcher().subscribe_thread(thread_id);
    let typing = |is_typing| SetTypingRequest {
        thread_id,
        is_typing,
    };

    svc.set_typing("alice", typing(false)).await.unwrap();
    svc.set_typing("alice", typing(true)).await.unwrap();
    svc.set_typing("alice", typing(false)).await.unwrap();
    svc.set_typing("alice", typing(false)).await.unwrap();
    svc.add_comment("alice", comment(thread_id, "marker")).await.unwrap();

    let mut seen = Vec::new();
    loop {
        match sub.recv().await.unwrap() {
            ThreadEvent::TypingChanged { is_typing, .. } => seen.push(is_typing),
            ThreadEvent::NewMessage { .. } => break,
            other => panic!("unexpected {:?}", other),
        }
    }
    assert_eq!(seen, vec![true, false]);
}

#[tokio::test]
async fn zone_delete_cascades() {
    let (svc, _) = service();
    let (zone_id, thread_id) = thread(&svc).await;
    let msg = svc.add_comment("alice", comment(thread_id, "bye")).await.unwrap();
    svc.add_reaction("bob", msg.message_id, "👋").await.unwrap();

    let counts = svc.delete_zone("admin", zone_id).await.unwrap();
    assert_eq!(counts.deleted_threads, 1);
    assert_eq!(counts.deleted_messages, 1);
    assert_eq!(counts.deleted_reactions, 1);

    assert!(svc.get_thread("alice", thread_id).await.unwrap().is_none());
    let err = svc
        .add_comment("alice", comment(thread_id, "too late"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
}
