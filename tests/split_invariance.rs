//! The events of a response do not depend on how the transport chunks it.

use askstream::cancel::CancelHandle;
use askstream::model::Event;
use askstream::parser::FrameParser;
use askstream::session::StreamSession;
use proptest::prelude::*;

const RESPONSE: &str = concat!(
    "data: {\"type\":\"id\",\"id\":\"c-17\"}\n",
    "data: {\"answer\":\"Grüße, \"}\r\n",
    "\n",
    "data: {\"answer\":\"日本語 🦀 \"}\n",
    "garbage that is not json\n",
    "{\"type\":\"source\",\"metadata\":{\"title\":\"guides/über.md\"},\"doc\":\"ß and ü\"}\n",
    "data: {\"answer\":\"done\"}",
);

/// A response closed by an explicit end frame, with a straggler after it.
const ENDED_RESPONSE: &str = concat!(
    "data: {\"type\":\"id\",\"id\":\"c-17\"}\n",
    "data: {\"answer\":\"Grüße, \"}\r\n",
    "garbage that is not json\n",
    "data: {\"type\":\"end\"}\n",
    "data: {\"answer\":\"late\"}",
);

fn run(chunks: &[&[u8]]) -> Vec<Event> {
    let mut session = StreamSession::new(FrameParser::default(), CancelHandle::new());
    session.begin_request();
    session.begin_streaming();

    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(session.process_delivery(chunk));
    }
    events.extend(session.finish_input());
    events
}

fn split_at(bytes: &[u8], mut cuts: Vec<usize>) -> Vec<&[u8]> {
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for cut in cuts {
        chunks.push(&bytes[start..cut]);
        start = cut;
    }
    chunks.push(&bytes[start..]);
    chunks
}

#[test]
fn whole_response_in_one_delivery() {
    let events = run(&[RESPONSE.as_bytes()]);
    assert_eq!(
        events,
        vec![
            Event::ConversationId {
                id: "c-17".to_string()
            },
            Event::Token {
                text: "Grüße, ".to_string()
            },
            Event::Token {
                text: "日本語 🦀 ".to_string()
            },
            Event::Source {
                title: "über.md".to_string(),
                body: "ß and ü".to_string(),
            },
            Event::Token {
                text: "done".to_string()
            },
        ]
    );
}

#[test]
fn one_byte_per_delivery() {
    let bytes = RESPONSE.as_bytes();
    let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
    assert_eq!(run(&chunks), run(&[bytes]));
}

#[test]
fn empty_deliveries_change_nothing() {
    let bytes = RESPONSE.as_bytes();
    let (head, tail) = bytes.split_at(40);
    assert_eq!(run(&[b"", head, b"", b"", tail, b""]), run(&[bytes]));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_events_independent_of_chunking(
        cuts in proptest::collection::vec(0..=RESPONSE.len(), 0..12)
    ) {
        let bytes = RESPONSE.as_bytes();
        let expected = run(&[bytes]);
        let chunks = split_at(bytes, cuts);
        prop_assert_eq!(run(&chunks), expected);
    }

    #[test]
    fn prop_terminal_event_is_last_and_unique(
        cuts in proptest::collection::vec(0..=ENDED_RESPONSE.len(), 0..12)
    ) {
        let chunks = split_at(ENDED_RESPONSE.as_bytes(), cuts);
        let events = run(&chunks);
        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        prop_assert_eq!(terminals, 1);
        prop_assert_eq!(events.last(), Some(&Event::End));
    }

    #[test]
    fn prop_closed_response_has_no_terminal_event(
        cuts in proptest::collection::vec(0..=RESPONSE.len(), 0..12)
    ) {
        let chunks = split_at(RESPONSE.as_bytes(), cuts);
        prop_assert!(run(&chunks).iter().all(|e| !e.is_terminal()));
    }
}
