//! Privilege-bridge tests against scripted fake sub-agents on a pty.

use tapwire_agent::bridge::SubAgentBridge;
use tapwire_agent::config::BridgeConfig;
use tapwire_agent::{AgentContext, Config, Dispatcher};
use tapwire_protocol::{encode_value, parse_response};
use tapwire_types::Value;
use tokio::io::BufReader;

fn bridge_config(script: &str, timeout_ms: u64) -> BridgeConfig {
    BridgeConfig {
        username: "tester".to_string(),
        password: "hunter2".to_string(),
        handshake_timeout_ms: timeout_ms,
        agent_command: Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            script.to_string(),
        ]),
    }
}

/// A fake agent: greets, then answers every line with the same response.
fn fake_agent_script(greeting: &Value, response: &Value) -> String {
    let greeting = encode_value(greeting).unwrap();
    let response = encode_value(response).unwrap();
    format!(
        "echo \"FMBTAGENT OK {greeting}\"; \
         while read line; do \
           case \"$line\" in quit*) exit 0;; esac; \
           echo \"FMBTAGENT OK {response}\"; \
         done"
    )
}

#[tokio::test]
async fn silent_sub_agent_times_out_and_is_retried() {
    let config = bridge_config("sleep 30", 300);
    let mut bridge = SubAgentBridge::new(&config);

    let (ok, payload) = bridge.forward("tester", "hunter2", "tm 1 2").await;
    assert!(!ok);
    let Value::List(parts) = &payload else {
        panic!("expected list payload, got {payload:?}");
    };
    assert_eq!(parts[0], Value::Int(-1));
    // Nothing cached; the next request starts a fresh handshake.
    assert!(!bridge.has_agent("tester"));
}

#[tokio::test]
async fn greeting_handshake_then_forwarding() {
    let config = bridge_config(
        &fake_agent_script(&Value::Str("hi".to_string()), &Value::Int(42)),
        5000,
    );
    let mut bridge = SubAgentBridge::new(&config);

    let (ok, payload) = bridge.forward("tester", "hunter2", "tm 1 2").await;
    assert!(ok);
    assert_eq!(payload, Value::Int(42));
    assert!(bridge.has_agent("tester"));

    // Reuses the same sub-agent.
    let (ok, payload) = bridge.forward("tester", "hunter2", "kp POWER").await;
    assert!(ok);
    assert_eq!(payload, Value::Int(42));

    bridge.close_all().await;
    assert!(!bridge.has_agent("tester"));
}

#[tokio::test]
async fn password_prompt_is_answered_before_the_greeting() {
    let response = encode_value(&Value::Bool(true)).unwrap();
    let script = format!(
        "printf 'Password: '; read pw; \
         if [ \"$pw\" != hunter2 ]; then echo 'su: authentication failure'; exit 1; fi; \
         echo \"FMBTAGENT OK {response}\"; \
         while read line; do echo \"FMBTAGENT OK {response}\"; done"
    );
    let config = bridge_config(&script, 5000);
    let mut bridge = SubAgentBridge::new(&config);

    let (ok, payload) = bridge.forward("tester", "hunter2", "tm 1 2").await;
    assert!(ok, "unexpected payload: {payload:?}");
    assert_eq!(payload, Value::Bool(true));
}

#[tokio::test]
async fn wrong_password_surfaces_the_terminal_output() {
    let script = "printf 'Password: '; read pw; echo 'su: authentication failure'; sleep 30";
    let config = bridge_config(script, 500);
    let mut bridge = SubAgentBridge::new(&config);

    let (ok, payload) = bridge.forward("tester", "wrong", "tm 1 2").await;
    assert!(!ok);
    let Value::List(parts) = &payload else {
        panic!("expected list payload, got {payload:?}");
    };
    assert_eq!(parts[0], Value::Int(-1));
    assert!(matches!(&parts[1], Value::Str(out) if out.contains("authentication failure")));
}

#[tokio::test]
async fn unprivileged_dispatcher_forwards_device_commands() {
    let mut config = Config::default();
    config.bridge = bridge_config(
        &fake_agent_script(&Value::None, &Value::Str("forwarded".to_string())),
        5000,
    );
    let mut ctx = AgentContext::new(config);
    ctx.privileged = false;

    let mut dispatcher = Dispatcher::new(ctx);
    let input = "tm 1 2\nquit\n";
    let mut output = Vec::new();
    dispatcher
        .run(BufReader::new(input.as_bytes()), &mut output)
        .await
        .unwrap();

    let responses: Vec<(bool, Value)> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| parse_response(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[1], (true, Value::Str("forwarded".to_string())));
    // quit is answered locally.
    assert_eq!(responses[2], (true, Value::Bool(true)));
}
