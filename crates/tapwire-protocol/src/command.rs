//! Command parsing.
//!
//! One parser turns a request line into a tagged [`Command`]; handlers match
//! the enum exhaustively. Verbs are compared as whole tokens, never as
//! prefixes, so short verbs (`kn`) cannot shadow longer ones (`kd`).

use tapwire_types::{GestureSpec, RecorderFilter, ShellRequest};

use crate::codec::decode_value;
use crate::error::ProtocolError;

/// A parsed control-channel command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `tm x y` — move the touch contact (or pointer) to an absolute position.
    TouchMove { x: i32, y: i32 },
    /// `tr dx dy` — relative pointer move.
    RelativeMove { dx: i32, dy: i32 },
    /// `tt x y button` — tap.
    Tap { x: i32, y: i32, button: u16 },
    /// `td x y button` — finger/button down.
    TouchDown { x: i32, y: i32, button: u16 },
    /// `tu x y button` — finger/button up.
    TouchUp { x: i32, y: i32, button: u16 },
    /// `kd name` — key down.
    KeyDown { name: String },
    /// `kp name` — key press (down + up).
    KeyPress { name: String },
    /// `ku name` — key up.
    KeyUp { name: String },
    /// `kn` — list known key names.
    ListKeys,
    /// `kt <blob>` — type a string on the keyboard.
    TypeText { text: String },
    /// `ml <blob>` — play a multitouch linear gesture.
    LinearGesture(GestureSpec),
    /// `sd width height` — set logical screen dimensions.
    SetScreenSize { width: i32, height: i32 },
    /// `sa degrees` — set screen rotation angle.
    SetScreenAngle { degrees: i32 },
    /// `er start <blob>` — begin capturing input events through a filter.
    RecorderStart(RecorderFilter),
    /// `er stop` — stop capturing; queued events stay fetchable.
    RecorderStop,
    /// `er fetch` — drain and return the queued events.
    RecorderFetch,
    /// `es <blob>` — execute a shell command.
    Shell(ShellRequest),
    /// `quit` — final response, then stop the loop.
    Quit,
}

fn bad_args(verb: &str, detail: impl ToString) -> ProtocolError {
    ProtocolError::BadArguments {
        verb: verb.to_string(),
        detail: detail.to_string(),
    }
}

fn parse_int<T: std::str::FromStr>(verb: &str, token: &str) -> Result<T, ProtocolError>
where
    T::Err: std::fmt::Display,
{
    token.parse().map_err(|e| bad_args(verb, e))
}

fn two_ints(verb: &str, rest: &str) -> Result<(i32, i32), ProtocolError> {
    let mut tokens = rest.split_whitespace();
    let a = tokens.next().ok_or_else(|| bad_args(verb, "missing x"))?;
    let b = tokens.next().ok_or_else(|| bad_args(verb, "missing y"))?;
    if tokens.next().is_some() {
        return Err(bad_args(verb, "trailing tokens"));
    }
    Ok((parse_int(verb, a)?, parse_int(verb, b)?))
}

fn point_and_button(verb: &str, rest: &str) -> Result<(i32, i32, u16), ProtocolError> {
    let mut tokens = rest.split_whitespace();
    let x = tokens.next().ok_or_else(|| bad_args(verb, "missing x"))?;
    let y = tokens.next().ok_or_else(|| bad_args(verb, "missing y"))?;
    let b = tokens
        .next()
        .ok_or_else(|| bad_args(verb, "missing button"))?;
    if tokens.next().is_some() {
        return Err(bad_args(verb, "trailing tokens"));
    }
    Ok((parse_int(verb, x)?, parse_int(verb, y)?, parse_int(verb, b)?))
}

fn key_name(verb: &str, rest: &str) -> Result<String, ProtocolError> {
    let name = rest.trim();
    if name.is_empty() {
        return Err(bad_args(verb, "missing key name"));
    }
    Ok(name.to_string())
}

impl Command {
    /// Parse one request line.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest),
            None => (line, ""),
        };

        match verb {
            "tm" => {
                let (x, y) = two_ints(verb, rest)?;
                Ok(Command::TouchMove { x, y })
            }
            "tr" => {
                let (dx, dy) = two_ints(verb, rest)?;
                Ok(Command::RelativeMove { dx, dy })
            }
            "tt" => {
                let (x, y, button) = point_and_button(verb, rest)?;
                Ok(Command::Tap { x, y, button })
            }
            "td" => {
                let (x, y, button) = point_and_button(verb, rest)?;
                Ok(Command::TouchDown { x, y, button })
            }
            "tu" => {
                let (x, y, button) = point_and_button(verb, rest)?;
                Ok(Command::TouchUp { x, y, button })
            }
            "kd" => Ok(Command::KeyDown {
                name: key_name(verb, rest)?,
            }),
            "kp" => Ok(Command::KeyPress {
                name: key_name(verb, rest)?,
            }),
            "ku" => Ok(Command::KeyUp {
                name: key_name(verb, rest)?,
            }),
            "kn" => Ok(Command::ListKeys),
            "kt" => {
                let value = decode_value(rest.trim())?;
                let text = value
                    .as_str()
                    .map_err(|e| bad_args(verb, e))?
                    .to_string();
                Ok(Command::TypeText { text })
            }
            "ml" => {
                let value = decode_value(rest.trim())?;
                let spec = GestureSpec::from_value(&value).map_err(|e| bad_args(verb, e))?;
                Ok(Command::LinearGesture(spec))
            }
            "sd" => {
                let (width, height) = two_ints(verb, rest)?;
                Ok(Command::SetScreenSize { width, height })
            }
            "sa" => {
                let degrees = parse_int(verb, rest.trim())?;
                Ok(Command::SetScreenAngle { degrees })
            }
            "er" => match rest.trim() {
                "stop" => Ok(Command::RecorderStop),
                "fetch" => Ok(Command::RecorderFetch),
                "start" => Ok(Command::RecorderStart(RecorderFilter::default())),
                action => {
                    let blob = action
                        .strip_prefix("start ")
                        .ok_or_else(|| bad_args(verb, "expected start, stop or fetch"))?;
                    let value = decode_value(blob.trim())?;
                    let filter =
                        RecorderFilter::from_value(&value).map_err(|e| bad_args(verb, e))?;
                    Ok(Command::RecorderStart(filter))
                }
            },
            "es" => {
                let value = decode_value(rest.trim())?;
                let req = ShellRequest::from_value(&value).map_err(|e| bad_args(verb, e))?;
                Ok(Command::Shell(req))
            }
            "quit" => Ok(Command::Quit),
            _ => Err(ProtocolError::UnknownCommand(line.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_value;
    use tapwire_types::Value;

    #[test]
    fn plain_token_verbs() {
        assert_eq!(
            Command::parse("tm 120 240").unwrap(),
            Command::TouchMove { x: 120, y: 240 }
        );
        assert_eq!(
            Command::parse("tt 10 20 1").unwrap(),
            Command::Tap {
                x: 10,
                y: 20,
                button: 1
            }
        );
        assert_eq!(
            Command::parse("kd POWER").unwrap(),
            Command::KeyDown {
                name: "POWER".to_string()
            }
        );
        assert_eq!(Command::parse("quit\n").unwrap(), Command::Quit);
    }

    #[test]
    fn kn_does_not_shadow_kd() {
        assert_eq!(Command::parse("kn").unwrap(), Command::ListKeys);
        // "knx" is a distinct, unknown verb, not a prefix match on "kn".
        assert!(matches!(
            Command::parse("knx"),
            Err(ProtocolError::UnknownCommand(_))
        ));
    }

    #[test]
    fn unknown_command_carries_full_line() {
        match Command::parse("zzz 1 2 3") {
            Err(ProtocolError::UnknownCommand(line)) => assert_eq!(line, "zzz 1 2 3"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn negative_coordinates_accepted() {
        assert_eq!(
            Command::parse("tr -5 -9").unwrap(),
            Command::RelativeMove { dx: -5, dy: -9 }
        );
    }

    #[test]
    fn bad_arguments_reported() {
        assert!(matches!(
            Command::parse("tm 1"),
            Err(ProtocolError::BadArguments { .. })
        ));
        assert!(matches!(
            Command::parse("tt 1 2 notabutton"),
            Err(ProtocolError::BadArguments { .. })
        ));
    }

    #[test]
    fn type_text_blob() {
        let blob = encode_value(&Value::Str("Hello!".to_string())).unwrap();
        assert_eq!(
            Command::parse(&format!("kt {blob}")).unwrap(),
            Command::TypeText {
                text: "Hello!".to_string()
            }
        );
    }

    #[test]
    fn gesture_blob() {
        let point = |x: i64, y: i64| Value::List(vec![Value::Int(x), Value::Int(y)]);
        let value = Value::List(vec![
            Value::List(vec![Value::List(vec![point(0, 0), point(100, 0)])]),
            Value::Int(100),
            Value::Int(4),
            Value::Int(0),
            Value::Int(0),
        ]);
        let blob = encode_value(&value).unwrap();
        match Command::parse(&format!("ml {blob}")).unwrap() {
            Command::LinearGesture(spec) => {
                assert_eq!(spec.fingers.len(), 1);
                assert_eq!(spec.steps, 4);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn recorder_actions() {
        assert_eq!(Command::parse("er stop").unwrap(), Command::RecorderStop);
        assert_eq!(Command::parse("er fetch").unwrap(), Command::RecorderFetch);

        let filter = Value::Map(vec![(
            "types".to_string(),
            Value::List(vec![Value::Str("key".to_string())]),
        )]);
        let blob = encode_value(&filter).unwrap();
        match Command::parse(&format!("er start {blob}")).unwrap() {
            Command::RecorderStart(filter) => {
                assert!(filter.accepts_type("key"));
                assert!(!filter.accepts_type("abs"));
            }
            other => panic!("unexpected: {other:?}"),
        }

        assert!(matches!(
            Command::parse("er rewind"),
            Err(ProtocolError::BadArguments { .. })
        ));
    }

    #[test]
    fn malformed_blob_is_decode_error() {
        assert!(matches!(
            Command::parse("ml %%%"),
            Err(ProtocolError::Decode(_))
        ));
    }
}
