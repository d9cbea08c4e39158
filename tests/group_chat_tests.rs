mod common;

use agentchat::agent::{Agent, AgentExt};
use agentchat::event::{EventHandler, GroupChatEvent};
use agentchat::group_chat::{send_message_to_agent, GroupChat, GroupChatError};
use agentchat::message::{Message, Role, CLEAR_MESSAGES, TERMINATE};
use agentchat::GroupChatConfig;
use async_trait::async_trait;
use common::{senders, user, BrokenAgent, MockClient, ScriptedAgent, SlowAgent};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn fast(max_round: usize) -> GroupChatConfig {
    GroupChatConfig::default()
        .with_max_round(max_round)
        .with_turn_delay(Duration::ZERO)
}

fn terminate(text: &str) -> String {
    format!("{}: {}", TERMINATE, text)
}

#[derive(Default)]
struct RecordingHandler {
    events: Mutex<Vec<GroupChatEvent>>,
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn on_group_chat_event(&self, event: &GroupChatEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[tokio::test]
async fn test_terminate_reply_stops_run_immediately() {
    let a = ScriptedAgent::new("a", &["working on it", "more work"]);
    let b = ScriptedAgent::new("b", &[terminate("all done").as_str(), "should never be said"]);

    let chat = GroupChat::sequential(vec![a.clone(), b.clone()])
        .unwrap()
        .with_config(fast(10));
    let history = chat.run(Vec::new()).await.unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(senders(history.messages()), vec!["a", "b"]);
    assert!(history.last().unwrap().is_terminate());
    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 1);
}

#[tokio::test]
async fn test_selected_member_terminates_moderated_chat() {
    let client = MockClient::new();
    client.queue_text("From b");

    let a = ScriptedAgent::new("a", &[]);
    let b = ScriptedAgent::new("b", &[terminate("done").as_str()]);
    let c = ScriptedAgent::new("c", &[]);

    let chat = GroupChat::new(client.clone(), a.clone(), vec![b.clone(), c.clone()])
        .unwrap()
        .with_config(fast(10));
    let history = chat.run(vec![user("a", "solve the task")]).await.unwrap();

    assert_eq!(senders(history.messages()), vec!["a", "b"]);
    assert_eq!(
        history.last().unwrap().content(),
        Some("[GROUPCHAT_TERMINATE]: done")
    );
    assert!(history.last().unwrap().is_terminate());
    assert_eq!(client.requests().len(), 1);
    assert_eq!(a.calls(), 0);
    assert_eq!(b.calls(), 1);
    assert_eq!(c.calls(), 0);
}

#[tokio::test]
async fn test_round_robin_from_empty_history() {
    let x = ScriptedAgent::new("x", &[]);
    let y = ScriptedAgent::new("y", &[]);

    let chat = GroupChat::sequential(vec![x, y]).unwrap().with_config(fast(3));
    let history = chat.run(Vec::new()).await.unwrap();

    assert_eq!(senders(history.messages()), vec!["x", "y", "x"]);
}

#[tokio::test]
async fn test_round_robin_continues_after_last_sender() {
    let x = ScriptedAgent::new("x", &[]);
    let y = ScriptedAgent::new("y", &[]);
    let z = ScriptedAgent::new("z", &[]);

    let chat = GroupChat::sequential(vec![x, y, z])
        .unwrap()
        .with_config(fast(2));
    let history = chat.run(vec![user("y", "start")]).await.unwrap();

    assert_eq!(senders(history.messages()), vec!["y", "z", "x"]);
}

#[tokio::test]
async fn test_round_robin_rejects_unknown_last_sender() {
    let chat = GroupChat::sequential(vec![ScriptedAgent::new("x", &[])])
        .unwrap()
        .with_config(fast(3));

    let err = chat.run(vec![user("ghost", "boo")]).await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<GroupChatError>(),
        Some(&GroupChatError::UnknownSpeaker("ghost".to_string()))
    );
}

#[tokio::test]
async fn test_zero_rounds_with_throw_fails() {
    let chat = GroupChat::sequential(vec![ScriptedAgent::new("x", &[])])
        .unwrap()
        .with_config(fast(0).with_throw_on_max_round(true));

    let err = chat.run(vec![user("x", "hi")]).await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<GroupChatError>(),
        Some(&GroupChatError::MaxRoundReached(0))
    );
}

#[tokio::test]
async fn test_zero_rounds_without_throw_returns_input_unchanged() {
    let x = ScriptedAgent::new("x", &[]);
    let chat = GroupChat::sequential(vec![x.clone()])
        .unwrap()
        .with_config(fast(0));

    let input = vec![user("x", "hi"), user("x", "again")];
    let history = chat.run(input.clone()).await.unwrap();

    assert_eq!(history.messages(), input.as_slice());
    assert_eq!(x.calls(), 0);
}

#[tokio::test]
async fn test_exhausted_budget_with_throw_fails_after_running_turns() {
    let x = ScriptedAgent::new("x", &[]);
    let chat = GroupChat::sequential(vec![x.clone()])
        .unwrap()
        .with_config(fast(2).with_throw_on_max_round(true));

    let err = chat.run(Vec::new()).await.unwrap_err();
    assert!(err.to_string().contains("Max round reached"));
    assert_eq!(x.calls(), 2);
}

#[tokio::test]
async fn test_history_grows_by_one_message_per_turn() {
    let chat = GroupChat::sequential(vec![
        ScriptedAgent::new("a", &[]),
        ScriptedAgent::new("b", &[]),
    ])
    .unwrap()
    .with_config(fast(4));

    let history = chat
        .run(vec![user("a", "first"), user("b", "second")])
        .await
        .unwrap();

    assert_eq!(history.len(), 2 + 4);
}

#[tokio::test]
async fn test_appended_messages_are_tagged_with_the_speaker() {
    let impostor = ScriptedAgent::with_messages(
        "honest",
        vec![Message::new(Role::Assistant, "hi").with_sender("someone else")],
    );
    let chat = GroupChat::sequential(vec![impostor])
        .unwrap()
        .with_config(fast(3));

    let history = chat.run(Vec::new()).await.unwrap();

    assert_eq!(history.len(), 3);
    for message in history.iter() {
        assert_eq!(message.sender.as_deref(), Some("honest"));
    }
}

#[tokio::test]
async fn test_garbled_selector_answer_falls_back_to_admin() {
    let client = MockClient::new();
    client.queue_text("I think the coder should go next");

    let coder = ScriptedAgent::new("coder", &["print('hi')"]);
    let admin = ScriptedAgent::new("admin", &[terminate("thanks").as_str()]);
    let handler = Arc::new(RecordingHandler::default());

    let chat = GroupChat::new(client.clone(), admin.clone(), vec![coder.clone()])
        .unwrap()
        .with_config(fast(5))
        .with_event_handler(handler.clone());

    let history = chat.run(vec![user("admin", "write hello world")]).await.unwrap();

    assert_eq!(senders(history.messages()), vec!["admin", "admin"]);
    assert_eq!(coder.calls(), 0);
    assert_eq!(admin.calls(), 1);

    let fell_back = handler.events.lock().unwrap().iter().any(|e| {
        matches!(e, GroupChatEvent::SpeakerSelected { speaker, fallback: true, .. } if speaker == "admin")
    });
    assert!(fell_back);
}

#[tokio::test]
async fn test_selector_answer_naming_unknown_agent_falls_back_to_admin() {
    let client = MockClient::new();
    client.queue_text("From ghost");

    let coder = ScriptedAgent::new("coder", &[]);
    let admin = ScriptedAgent::new("admin", &[terminate("bye").as_str()]);
    let chat = GroupChat::new(client, admin.clone(), vec![coder.clone()])
        .unwrap()
        .with_config(fast(5));

    chat.run(Vec::new()).await.unwrap();

    assert_eq!(coder.calls(), 0);
    assert_eq!(admin.calls(), 1);
}

#[tokio::test]
async fn test_selector_matches_names_case_insensitively() {
    let client = MockClient::new();
    client.queue_text("From CODER");
    client.queue_text("From admin");

    let coder = ScriptedAgent::new("coder", &["print(1)"]);
    let admin = ScriptedAgent::new("admin", &[terminate("ok").as_str()]);
    let chat = GroupChat::new(client.clone(), admin, vec![coder])
        .unwrap()
        .with_config(fast(5));

    let history = chat.run(vec![user("admin", "task")]).await.unwrap();

    assert_eq!(senders(history.messages()), vec!["admin", "coder", "admin"]);
}

#[tokio::test]
async fn test_role_play_request_shape() {
    let client = MockClient::new();
    client.queue_text("From admin");

    let coder = ScriptedAgent::new("coder", &[]);
    let admin = ScriptedAgent::new("admin", &[terminate("done").as_str()]);
    let chat = GroupChat::new(client.clone(), admin, vec![coder])
        .unwrap()
        .with_config(fast(5))
        .with_initialization_messages(vec![user("admin", "welcome")]);

    chat.run(vec![user("admin", "task")]).await.unwrap();

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    let (messages, options) = &requests[0];

    assert_eq!(options.temperature, Some(0.0));
    assert_eq!(options.stop, vec![":".to_string()]);
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[0].content().unwrap().contains("coder,admin"));
    assert_eq!(
        messages[1].content(),
        Some("From admin:\nwelcome\n<eof_msg>\nround # 0")
    );
    assert_eq!(
        messages[2].content(),
        Some("From admin:\ntask\n<eof_msg>\nround # 1")
    );
}

#[tokio::test]
async fn test_initialization_messages_are_prepended_to_every_turn() {
    let x = ScriptedAgent::new("x", &[]);
    let y = ScriptedAgent::new("y", &[]);
    let mut chat = GroupChat::sequential(vec![x.clone(), y.clone()])
        .unwrap()
        .with_config(fast(2));
    y.add_initialization_message("you are all reviewers", &mut chat);

    chat.run(Vec::new()).await.unwrap();

    let first = &x.contexts()[0];
    assert_eq!(first.len(), 1);
    assert_eq!(
        first[0].content(),
        Some("you are all reviewers\n<eof_msg>\nFrom y\nround # 0")
    );

    let second = &y.contexts()[0];
    assert_eq!(second.len(), 2);
    assert_eq!(second[0].role, Role::Assistant);
    assert_eq!(
        second[0].content(),
        Some("you are all reviewers\n<eof_msg>\nround # 0")
    );
    assert_eq!(second[1].role, Role::User);
}

#[tokio::test]
async fn test_compaction_hides_history_before_clear_sentinel() {
    let a = ScriptedAgent::new("a", &[]);
    let chat = GroupChat::sequential(vec![a.clone()])
        .unwrap()
        .with_config(fast(1));

    let summary = format!("we agreed on the plan\n{}", CLEAR_MESSAGES);
    let input = vec![
        user("a", "long discussion"),
        user("a", &summary),
        user("a", "next step"),
    ];
    let history = chat.run(input).await.unwrap();

    // full history is kept
    assert_eq!(history.len(), 4);

    let context = &a.contexts()[0];
    assert_eq!(context.len(), 2);
    assert!(context[0].content().unwrap().contains(CLEAR_MESSAGES));
}

#[tokio::test]
async fn test_agent_error_aborts_run() {
    let chat = GroupChat::sequential(vec![
        ScriptedAgent::new("ok", &[]) as Arc<dyn Agent>,
        Arc::new(BrokenAgent("broken")),
    ])
    .unwrap()
    .with_config(fast(5));

    let err = chat.run(Vec::new()).await.unwrap_err();
    assert_eq!(err.to_string(), "agent exploded");
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_aborts_in_flight_turn() {
    let slow: Arc<dyn Agent> = Arc::new(SlowAgent {
        name: "slow".to_string(),
        delay: Duration::from_secs(60),
    });
    let handler = Arc::new(RecordingHandler::default());
    let chat = GroupChat::sequential(vec![slow])
        .unwrap()
        .with_config(fast(3))
        .with_event_handler(handler.clone());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let err = chat
        .run_with_cancellation(vec![user("slow", "go")], &cancel)
        .await
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<GroupChatError>(),
        Some(&GroupChatError::Cancelled)
    );

    let appended = handler
        .events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, GroupChatEvent::MessageAppended { .. }))
        .count();
    assert_eq!(appended, 0);
}

/// Records appended senders, then stalls for a minute.
#[derive(Default)]
struct StallingHandler {
    appended: Mutex<Vec<String>>,
    finished: Mutex<usize>,
}

#[async_trait]
impl EventHandler for StallingHandler {
    async fn on_group_chat_event(&self, event: &GroupChatEvent) {
        if let GroupChatEvent::MessageAppended { sender, .. } = event {
            self.appended.lock().unwrap().push(sender.clone());
            tokio::time::sleep(Duration::from_secs(60)).await;
            *self.finished.lock().unwrap() += 1;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_event_delivery_keeps_completed_turn() {
    let a = ScriptedAgent::new("a", &["first"]);
    let handler = Arc::new(StallingHandler::default());
    let chat = GroupChat::sequential(vec![a.clone()])
        .unwrap()
        .with_config(fast(3))
        .with_event_handler(handler.clone());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let err = chat
        .run_with_cancellation(Vec::new(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<GroupChatError>(),
        Some(&GroupChatError::Cancelled)
    );

    // delivery of an appended message is not interrupted
    assert_eq!(*handler.appended.lock().unwrap(), vec!["a".to_string()]);
    assert_eq!(*handler.finished.lock().unwrap(), 1);
    assert_eq!(a.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_turn_delay_is_applied_before_each_turn() {
    let chat = GroupChat::sequential(vec![ScriptedAgent::new("x", &[])])
        .unwrap()
        .with_config(GroupChatConfig::default().with_max_round(3));

    let started = tokio::time::Instant::now();
    chat.run(Vec::new()).await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(3));
}

#[test]
fn test_duplicate_names_are_rejected() {
    let err = GroupChat::sequential(vec![
        ScriptedAgent::new("twin", &[]),
        ScriptedAgent::new("twin", &[]),
    ])
    .err();
    assert_eq!(err, Some(GroupChatError::DuplicateAgent("twin".to_string())));

    let client = MockClient::new();
    let err = GroupChat::new(
        client,
        ScriptedAgent::new("admin", &[]),
        vec![ScriptedAgent::new("admin", &[])],
    )
    .err();
    assert_eq!(err, Some(GroupChatError::DuplicateAgent("admin".to_string())));
}

#[test]
fn test_empty_roster_is_rejected() {
    assert_eq!(
        GroupChat::sequential(Vec::new()).err(),
        Some(GroupChatError::NoParticipants)
    );
}

#[tokio::test]
async fn test_send_message_to_agent_lets_receiver_answer_first() {
    let tutor = ScriptedAgent::new("tutor", &[terminate("correct").as_str()]);
    let pupil = ScriptedAgent::new("pupil", &["2"]);

    let history = send_message_to_agent(tutor.clone(), pupil.clone(), "1 + 1?", fast(5))
        .await
        .unwrap();

    assert_eq!(
        senders(history.messages()),
        vec!["tutor", "pupil", "tutor"]
    );
    assert_eq!(history[0].content(), Some("1 + 1?"));
}

#[tokio::test]
async fn test_send_to_group_requires_matching_sender() {
    let a = ScriptedAgent::new("a", &[terminate("done").as_str()]);
    let chat = GroupChat::sequential(vec![a.clone()])
        .unwrap()
        .with_config(fast(2));

    let err = a
        .send_to_group(&chat, user("b", "not mine"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GroupChatError>(),
        Some(GroupChatError::SenderMismatch { .. })
    ));
    assert_eq!(a.calls(), 0);

    let history = a.say_to_group(&chat, "mine").await.unwrap();
    assert_eq!(senders(history.messages()), vec!["a", "a"]);
}

#[tokio::test]
async fn test_events_bracket_the_run() {
    let handler = Arc::new(RecordingHandler::default());
    let chat = GroupChat::sequential(vec![ScriptedAgent::new("x", &[terminate("done").as_str()])])
        .unwrap()
        .with_id("chat-1")
        .with_config(fast(5))
        .with_event_handler(handler.clone());

    chat.run(Vec::new()).await.unwrap();

    let events = handler.events.lock().unwrap();
    assert!(matches!(
        events.first(),
        Some(GroupChatEvent::RunStarted { chat_id, max_round: 5, .. }) if chat_id == "chat-1"
    ));
    assert!(matches!(
        events.last(),
        Some(GroupChatEvent::Terminated { rounds: 1, .. })
    ));
    assert!(events
        .iter()
        .any(|e| matches!(e, GroupChatEvent::MessageAppended { sender, .. } if sender == "x")));
}
