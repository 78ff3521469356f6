//! Multitouch gesture specifications.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueError};

/// A screen coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One finger's straight-line path, start to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct FingerPath {
    pub start: Point,
    pub end: Point,
}

/// A time-interpolated multi-finger gesture.
///
/// This is the single playback primitive: taps, drags, pinches and
/// multi-finger swipes are all expressed as a finger list plus timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct GestureSpec {
    pub fingers: Vec<FingerPath>,
    pub duration_ms: i64,
    pub steps: i64,
    pub pre_delay_ms: i64,
    pub post_delay_ms: i64,
}

fn point_from_value(value: &Value) -> Result<Point, ValueError> {
    let pair = value.as_tuple(2)?;
    Ok(Point {
        x: i32::try_from(pair[0].as_int()?).unwrap_or(i32::MAX),
        y: i32::try_from(pair[1].as_int()?).unwrap_or(i32::MAX),
    })
}

impl GestureSpec {
    /// Decode the `ml` command payload:
    /// `([[ (sx, sy), (ex, ey) ], ...], duration_ms, steps, pre_ms, post_ms)`.
    pub fn from_value(value: &Value) -> Result<Self, ValueError> {
        let parts = value.as_tuple(5)?;
        let mut fingers = Vec::new();
        for start_end in parts[0].as_list()? {
            let pair = start_end.as_tuple(2)?;
            fingers.push(FingerPath {
                start: point_from_value(&pair[0])?,
                end: point_from_value(&pair[1])?,
            });
        }
        Ok(Self {
            fingers,
            duration_ms: parts[1].as_int()?,
            steps: parts[2].as_int()?,
            pre_delay_ms: parts[3].as_int()?,
            post_delay_ms: parts[4].as_int()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: i64, y: i64) -> Value {
        Value::List(vec![Value::Int(x), Value::Int(y)])
    }

    #[test]
    fn decode_two_finger_gesture() {
        let value = Value::List(vec![
            Value::List(vec![
                Value::List(vec![point(0, 0), point(100, 0)]),
                Value::List(vec![point(50, 50), point(50, 150)]),
            ]),
            Value::Int(250),
            Value::Int(10),
            Value::Int(0),
            Value::Int(20),
        ]);
        let spec = GestureSpec::from_value(&value).unwrap();
        assert_eq!(spec.fingers.len(), 2);
        assert_eq!(spec.fingers[0].end, Point::new(100, 0));
        assert_eq!(spec.fingers[1].start, Point::new(50, 50));
        assert_eq!(spec.duration_ms, 250);
        assert_eq!(spec.steps, 10);
        assert_eq!(spec.post_delay_ms, 20);
    }

    #[test]
    fn reject_wrong_arity() {
        let value = Value::List(vec![Value::List(vec![]), Value::Int(100)]);
        assert!(GestureSpec::from_value(&value).is_err());
    }

    #[test]
    fn reject_non_numeric_point() {
        let value = Value::List(vec![
            Value::List(vec![Value::List(vec![
                Value::List(vec![Value::Str("x".to_string()), Value::Int(0)]),
                point(1, 1),
            ])]),
            Value::Int(100),
            Value::Int(1),
            Value::Int(0),
            Value::Int(0),
        ]);
        assert!(GestureSpec::from_value(&value).is_err());
    }
}
