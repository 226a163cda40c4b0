//! Assistant chat round trips against an in-memory page


use fake_page::{FakeDom, FakeElement, FakePage};
use std::time::Duration;
use tokio::time::Instant;
use ui_e2e::error::BrowserError;
use ui_e2e::{AssistantChat, ChatLocators, PollOptions, PollOutcome};

/// Closed panel, enabled input and two earlier answers
fn chat_page() -> FakePage {
    let page = FakePage::new();
    let l = ChatLocators::default();
    page.with_dom(|dom| {
        dom.set(&l.toggle, FakeElement::shown());
        dom.set(&l.panel, FakeElement::shown().hidden());
        dom.set(&l.input, FakeElement::shown());
        dom.set(&l.send, FakeElement::shown());
        dom.set(&l.replies, FakeElement::list(&["Hello!", "Macro 'Weekly' saved."]));
    });

    let panel = l.panel.clone();
    page.on_click(&l.toggle, move |dom| {
        if let Some(el) = dom.get_mut(&panel) {
            el.visible = true;
        }
    });
    page
}

/// The assistant shows a typing indicator and an empty bubble after
/// `typing_at`, then fills the bubble and hides the indicator at `done_at`
fn answer_on_send(page: &FakePage, answer: &'static str, typing_at: u64, done_at: u64) {
    let l = ChatLocators::default();
    let send = l.send.clone();
    page.on_click(&send, move |dom: &mut FakeDom| {
        let (replies, typing) = (l.replies.clone(), l.typing.clone());
        dom.after(Duration::from_millis(typing_at), move |dom| {
            dom.set(&typing, FakeElement::shown());
            dom.get_mut(&replies).unwrap().texts.push(String::new());
        });

        let (replies, typing) = (l.replies.clone(), l.typing.clone());
        dom.after(Duration::from_millis(done_at), move |dom| {
            dom.remove(&typing);
            if let Some(last) = dom.get_mut(&replies).unwrap().texts.last_mut() {
                *last = answer.to_string();
            }
        });
    });
}

fn llm_options(timeout_secs: u64) -> PollOptions {
    PollOptions::llm_round_trip("assistant reply").with_timeout(Duration::from_secs(timeout_secs))
}

#[tokio::test(start_paused = true)]
async fn test_ask_waits_for_indicator_to_clear() {
    let page = chat_page();
    answer_on_send(&page, "Branch 'North' created.", 2_000, 4_000);
    let chat = AssistantChat::new(&page);

    let start = Instant::now();
    let outcome = chat
        .ask("Create a branch called North", &llm_options(60))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        PollOutcome::Succeeded("Branch 'North' created.".to_string())
    );
    assert_eq!(start.elapsed(), Duration::from_millis(4_000));
    assert_eq!(chat.reply_count().await.unwrap(), 3);

    page.with_dom(|dom| {
        assert_eq!(
            dom.fills,
            vec![(
                "#chat-input".to_string(),
                "Create a branch called North".to_string()
            )]
        );
        assert_eq!(dom.clicks, vec!["#chat-toggle", "#chat-send"]);
    });
}

#[tokio::test(start_paused = true)]
async fn test_open_is_idempotent() {
    let page = chat_page();
    let chat = AssistantChat::new(&page);

    assert!(!chat.is_open().await.unwrap());
    chat.open().await.unwrap();
    chat.open().await.unwrap();

    assert!(chat.is_open().await.unwrap());
    page.with_dom(|dom| assert_eq!(dom.clicks.len(), 1));
}

#[tokio::test(start_paused = true)]
async fn test_disabled_input_is_recovered_by_reload_and_reopen() {
    let page = chat_page();
    answer_on_send(&page, "Done.", 1_000, 1_500);
    let l = ChatLocators::default();
    page.with_dom(|dom| dom.get_mut(&l.input).unwrap().enabled = false);

    let (input, panel) = (l.input.clone(), l.panel.clone());
    page.on_reload(move |dom| {
        dom.get_mut(&input).unwrap().enabled = true;
        dom.get_mut(&panel).unwrap().visible = false;
    });

    let chat = AssistantChat::new(&page);
    let outcome = chat.ask("List all macros", &llm_options(60)).await.unwrap();

    assert_eq!(outcome.success(), Some("Done.".to_string()));
    assert_eq!(page.reloads(), 1);
    page.with_dom(|dom| {
        assert_eq!(
            dom.clicks,
            vec!["#chat-toggle", "#chat-toggle", "#chat-send"]
        )
    });
}

#[tokio::test(start_paused = true)]
async fn test_reload_that_drops_history_still_sees_the_reply() {
    let page = chat_page();
    let l = ChatLocators::default();
    page.with_dom(|dom| dom.get_mut(&l.input).unwrap().enabled = false);

    let (input, panel, replies) = (l.input.clone(), l.panel.clone(), l.replies.clone());
    page.on_reload(move |dom| {
        dom.get_mut(&input).unwrap().enabled = true;
        dom.get_mut(&panel).unwrap().visible = false;
        dom.remove(&replies);
    });

    let replies = l.replies.clone();
    page.on_click(&l.send, move |dom| {
        let replies = replies.clone();
        dom.after(Duration::from_millis(500), move |dom| {
            dom.set(&replies, FakeElement::list(&["Done."]))
        });
    });

    let chat = AssistantChat::new(&page);
    let outcome = chat.ask("hi", &llm_options(10)).await.unwrap();

    assert_eq!(outcome.success(), Some("Done.".to_string()));
    assert_eq!(page.reloads(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_input_that_never_enables_is_reported_without_sending() {
    let page = chat_page();
    let l = ChatLocators::default();
    page.with_dom(|dom| dom.get_mut(&l.input).unwrap().enabled = false);

    let chat = AssistantChat::new(&page);
    let outcome = chat.ask("Hello", &llm_options(60)).await.unwrap();

    match outcome {
        PollOutcome::RecoveryExhausted(report) => {
            assert!(report.description.contains("remained disabled"));
            assert_eq!(report.recoveries, 2);
        }
        other => panic!("expected RecoveryExhausted, got {:?}", other),
    }
    page.with_dom(|dom| {
        assert!(dom.fills.is_empty());
        assert!(!dom.clicks.iter().any(|c| c == "#chat-send"));
    });
}

#[tokio::test(start_paused = true)]
async fn test_stuck_typing_indicator_times_out() {
    let page = chat_page();
    // Indicator and bubble appear, but the answer never finishes streaming
    answer_on_send(&page, "never shown", 1_000, 3_600_000);

    let chat = AssistantChat::new(&page);
    let outcome = chat.ask("Delete macro Weekly", &llm_options(10)).await.unwrap();

    let report = match outcome {
        PollOutcome::TimedOut(report) => report,
        other => panic!("expected TimedOut, got {:?}", other),
    };
    assert_eq!(report.description, "assistant reply");
    assert_eq!(report.elapsed, Duration::from_secs(10));
    assert_eq!(report.ticks, 20);
}

#[tokio::test(start_paused = true)]
async fn test_blank_message_is_rejected() {
    let page = chat_page();
    let chat = AssistantChat::new(&page);

    let err = chat.send("   ").await.unwrap_err();
    assert!(matches!(err, BrowserError::Other(_)));
    page.with_dom(|dom| assert!(dom.clicks.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn test_custom_locators() {
    let page = FakePage::new();
    let locators = ChatLocators {
        replies: ui_e2e::Locator::css(".assistant-bubble"),
        ..ChatLocators::default()
    };
    page.with_dom(|dom| dom.set(&locators.replies, FakeElement::list(&["a", "b", "c"])));

    let chat = AssistantChat::with_locators(&page, locators);
    assert_eq!(chat.reply_count().await.unwrap(), 3);
    assert_eq!(chat.locators().input.to_string(), "#chat-input");
}
