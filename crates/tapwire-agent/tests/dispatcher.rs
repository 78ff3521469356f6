//! End-to-end dispatcher sessions over in-memory streams with mock devices.

use tokio::io::BufReader;

use tapwire_agent::{AgentContext, Config, Dispatcher};
use tapwire_input::mock::{
    KeyCall, MockKeyboard, MockKeyboardHandle, MockPointer, MockPointerHandle, MockRecorder,
    MockRecorderHandle, MockTouch, MockTouchHandle, PointerCall, RecorderCall, TouchCall,
};
use tapwire_protocol::{encode_value, parse_response};
use tapwire_types::key::key_code;
use tapwire_types::{RecordedEvent, Value};

struct Handles {
    touch: MockTouchHandle,
    pointer: MockPointerHandle,
    keyboard: MockKeyboardHandle,
    recorder: MockRecorderHandle,
}

fn context_with_mocks() -> (AgentContext, Handles) {
    let mut config = Config::default();
    config.agent.type_delay_ms = 0;
    let mut ctx = AgentContext::new(config);
    ctx.privileged = true;

    let touch = MockTouch::new();
    let pointer = MockPointer::new();
    let keyboard = MockKeyboard::new();
    let recorder = MockRecorder::new();
    let handles = Handles {
        touch: touch.handle(),
        pointer: pointer.handle(),
        keyboard: keyboard.handle(),
        recorder: recorder.handle(),
    };
    ctx.touch = Some(Box::new(touch));
    ctx.pointer = Some(Box::new(pointer));
    ctx.keyboard = Some(Box::new(keyboard));
    ctx.recorder = Some(Box::new(recorder));
    (ctx, handles)
}

async fn run_session(ctx: AgentContext, input: &str) -> Vec<(bool, Value)> {
    let mut dispatcher = Dispatcher::new(ctx);
    let reader = BufReader::new(input.as_bytes());
    let mut output = Vec::new();
    dispatcher.run(reader, &mut output).await.unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| parse_response(line).unwrap())
        .collect()
}

fn map_get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
        _ => None,
    }
}

#[tokio::test]
async fn greeting_first_then_responses_in_request_order() {
    let (ctx, handles) = context_with_mocks();
    let responses = run_session(ctx, "tt 10 20 1\ntm 5 6\nquit\n").await;

    assert_eq!(responses.len(), 4);
    let (ok, greeting) = &responses[0];
    assert!(ok);
    assert_eq!(map_get(greeting, "agent"), Some(&Value::from("tapwire")));
    assert!(matches!(map_get(greeting, "devices"), Some(Value::List(d)) if d.len() == 3));

    assert_eq!(responses[1], (true, Value::None));
    assert_eq!(responses[2], (true, Value::None));
    assert_eq!(responses[3], (true, Value::Bool(true)));

    assert_eq!(
        handles.touch.calls(),
        vec![TouchCall::Tap(10, 20), TouchCall::MoveTo(5, 6)]
    );
}

#[tokio::test]
async fn unknown_command_reports_the_full_line() {
    let (ctx, _) = context_with_mocks();
    let responses = run_session(ctx, "zzz 1 2\nquit\n").await;
    assert_eq!(
        responses[1],
        (false, Value::Str("Unknown command: \"zzz 1 2\"".to_string()))
    );
    // The session keeps going after an unknown command.
    assert_eq!(responses[2], (true, Value::Bool(true)));
}

#[tokio::test]
async fn blank_line_ends_the_session() {
    let (ctx, handles) = context_with_mocks();
    let responses = run_session(ctx, "tm 1 2\n\ntt 3 4 1\n").await;
    assert_eq!(responses.len(), 2);
    assert_eq!(handles.touch.calls(), vec![TouchCall::MoveTo(1, 2)]);
}

#[tokio::test]
async fn nothing_is_served_after_quit() {
    let (ctx, handles) = context_with_mocks();
    let responses = run_session(ctx, "quit\ntm 1 2\n").await;
    assert_eq!(responses.len(), 2);
    assert!(handles.touch.calls().is_empty());
}

#[tokio::test]
async fn keyboard_verbs_resolve_names_to_codes() {
    let (ctx, handles) = context_with_mocks();
    let responses = run_session(ctx, "kd POWER\nku POWER\nkp HOME\nquit\n").await;
    assert!(responses[1..4].iter().all(|(ok, _)| *ok));

    let power = key_code("POWER").unwrap();
    let home = key_code("HOME").unwrap();
    assert_eq!(
        handles.keyboard.calls(),
        vec![
            KeyCall::Press(power),
            KeyCall::Release(power),
            KeyCall::Tap(home)
        ]
    );
}

#[tokio::test]
async fn unresolvable_key_name_is_an_error_response() {
    let (ctx, handles) = context_with_mocks();
    let responses = run_session(ctx, "kd NOT_A_KEY\nquit\n").await;
    let (ok, payload) = &responses[1];
    assert!(!ok);
    assert!(matches!(payload, Value::Str(s) if s.contains("NOT_A_KEY")));
    assert!(handles.keyboard.calls().is_empty());
}

#[tokio::test]
async fn key_listing_contains_known_names() {
    let (ctx, _) = context_with_mocks();
    let responses = run_session(ctx, "kn\nquit\n").await;
    let (ok, payload) = &responses[1];
    assert!(ok);
    let Value::List(names) = payload else {
        panic!("expected list, got {payload:?}");
    };
    assert!(names.contains(&Value::from("ENTER")));
    assert!(names.contains(&Value::from("POWER")));
}

#[tokio::test]
async fn typing_presses_shift_chords() {
    let (ctx, handles) = context_with_mocks();
    let blob = encode_value(&Value::Str("aB".to_string())).unwrap();
    let responses = run_session(ctx, &format!("kt {blob}\nquit\n")).await;
    assert_eq!(responses[1], (true, Value::List(vec![])));

    let a = key_code("A").unwrap();
    let b = key_code("B").unwrap();
    let shift = key_code("LEFTSHIFT").unwrap();
    assert_eq!(
        handles.keyboard.calls(),
        vec![
            KeyCall::Tap(a),
            KeyCall::Press(shift),
            KeyCall::Tap(b),
            KeyCall::Release(shift)
        ]
    );
}

#[tokio::test]
async fn untypeable_characters_are_reported_not_fatal() {
    let (ctx, _) = context_with_mocks();
    let blob = encode_value(&Value::Str("a\u{e9}b".to_string())).unwrap();
    let responses = run_session(ctx, &format!("kt {blob}\nquit\n")).await;
    let (ok, payload) = &responses[1];
    assert!(!ok);
    assert_eq!(
        payload,
        &Value::List(vec![Value::Str("\u{e9}".to_string())])
    );
}

#[tokio::test]
async fn tap_falls_back_to_pointer_without_touch() {
    let (mut ctx, handles) = context_with_mocks();
    ctx.touch = None;
    let responses = run_session(ctx, "tt 10 20 1\ntr 3 -4\nquit\n").await;
    assert!(responses[1].0);
    assert!(responses[2].0);
    // Protocol buttons are 1-based, device buttons 0-based.
    assert_eq!(
        handles.pointer.calls(),
        vec![PointerCall::Tap(10, 20, 0), PointerCall::MoveRel(3, -4)]
    );
}

#[tokio::test]
async fn missing_devices_answer_with_errors_but_keep_serving() {
    let mut ctx = AgentContext::new(Config::default());
    ctx.privileged = true;
    let responses = run_session(ctx, "tt 1 2 1\nkd A\nquit\n").await;
    assert_eq!(
        responses[1],
        (false, Value::Str("no touch or pointer device".to_string()))
    );
    assert_eq!(
        responses[2],
        (false, Value::Str("no keyboard device".to_string()))
    );
    assert_eq!(responses[3], (true, Value::Bool(true)));
}

#[tokio::test]
async fn linear_gesture_drives_the_slot_table() {
    let (ctx, handles) = context_with_mocks();
    let point = |x: i64, y: i64| Value::List(vec![Value::Int(x), Value::Int(y)]);
    let gesture = Value::List(vec![
        Value::List(vec![Value::List(vec![point(0, 0), point(100, 0)])]),
        Value::Int(0),
        Value::Int(2),
        Value::Int(0),
        Value::Int(0),
    ]);
    let blob = encode_value(&gesture).unwrap();
    let responses = run_session(ctx, &format!("ml {blob}\nquit\n")).await;
    assert_eq!(responses[1], (true, Value::None));
    // down + 2 moves + up
    assert_eq!(handles.touch.frames().len(), 4);
}

#[tokio::test]
async fn screen_size_updates_touch_and_reports_absence() {
    let (mut ctx, handles) = context_with_mocks();
    ctx.touch = None;
    let responses = run_session(ctx, "sd 1080 1920\nquit\n").await;
    assert_eq!(
        responses[1],
        (true, Value::Str("no touch device".to_string()))
    );
    assert!(handles.touch.calls().is_empty());

    let (ctx, handles) = context_with_mocks();
    let responses = run_session(ctx, "sd 1080 1920\nsa 90\nquit\n").await;
    assert_eq!(responses[1], (true, Value::None));
    assert_eq!(responses[2], (true, Value::None));
    assert_eq!(
        handles.touch.calls(),
        vec![
            TouchCall::SetScreenSize(1080, 1920),
            TouchCall::SetScreenAngle(-90)
        ]
    );
}

#[tokio::test]
async fn recorder_captures_between_start_and_fetch() {
    let (ctx, handles) = context_with_mocks();
    let mut dispatcher = Dispatcher::new(ctx);

    let filter = Value::Map(vec![(
        "types".to_string(),
        Value::List(vec![Value::from("key")]),
    )]);
    let start_line = format!("er start {}\n", encode_value(&filter).unwrap());
    let mut output = Vec::new();
    dispatcher
        .run(BufReader::new(start_line.as_bytes()), &mut output)
        .await
        .unwrap();
    assert!(handles.recorder.is_recording());

    // A device produces an event while the recorder runs.
    handles.recorder.push_event(RecordedEvent {
        timestamp_us: 7,
        device: "/dev/input/event3".to_string(),
        event_type: 1,
        code: 116,
        value: 1,
    });

    let mut output = Vec::new();
    dispatcher
        .run(
            BufReader::new(&b"er fetch\ner fetch\ner stop\nquit\n"[..]),
            &mut output,
        )
        .await
        .unwrap();
    let responses: Vec<(bool, Value)> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| parse_response(line).unwrap())
        .collect();

    let (ok, payload) = &responses[1];
    assert!(ok);
    assert_eq!(
        payload,
        &Value::List(vec![Value::List(vec![
            Value::Int(7),
            Value::Str("/dev/input/event3".to_string()),
            Value::Int(1),
            Value::Int(116),
            Value::Int(1),
        ])])
    );
    // Fetching drains the queue.
    assert_eq!(responses[2], (true, Value::List(vec![])));
    assert_eq!(responses[3], (true, Value::None));
    assert!(!handles.recorder.is_recording());

    let calls = handles.recorder.calls();
    assert!(matches!(&calls[0], RecorderCall::Start(f) if f.types == vec!["key".to_string()]));
    assert_eq!(&calls[1..], &[
        RecorderCall::Fetch,
        RecorderCall::Fetch,
        RecorderCall::Stop
    ]);
}

#[tokio::test]
async fn recorder_commands_without_a_recorder_are_errors() {
    let (mut ctx, _) = context_with_mocks();
    ctx.recorder = None;
    let responses = run_session(ctx, "er start\ner fetch\nquit\n").await;
    assert_eq!(
        responses[1],
        (false, Value::Str("no recorder device".to_string()))
    );
    assert_eq!(
        responses[2],
        (false, Value::Str("no recorder device".to_string()))
    );
    assert_eq!(responses[3], (true, Value::Bool(true)));
}

#[tokio::test]
async fn shell_command_runs_synchronously() {
    let (ctx, _) = context_with_mocks();
    let request = Value::List(vec![
        Value::from("echo hello"),
        Value::from(""),
        Value::from(""),
        Value::None,
        Value::None,
        Value::None,
        Value::Bool(false),
    ]);
    let blob = encode_value(&request).unwrap();
    let responses = run_session(ctx, &format!("es {blob}\nquit\n")).await;
    let (ok, payload) = &responses[1];
    assert!(ok);
    let Value::List(parts) = payload else {
        panic!("expected list, got {payload:?}");
    };
    assert_eq!(parts[0], Value::Int(0));
    assert_eq!(parts[1], Value::Str("hello\n".to_string()));
}
