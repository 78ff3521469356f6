//! Shell execution requests.

use crate::value::{Value, ValueError};

/// A decoded `es` (execute shell) request.
///
/// `username`/`password` route the command through the privilege bridge when
/// the username is non-empty. Any of the three file fields switches the run
/// to detached mode: the response is immediate and the exit status is
/// appended to `status_file` when the command finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellRequest {
    pub command: String,
    pub username: String,
    pub password: String,
    pub status_file: Option<String>,
    pub out_file: Option<String>,
    pub err_file: Option<String>,
    pub use_pty: bool,
}

impl ShellRequest {
    /// Decode the `es` payload:
    /// `(cmd, username, password, status_file, out_file, err_file, use_pty)`
    /// where the file entries are strings or `None`.
    pub fn from_value(value: &Value) -> Result<Self, ValueError> {
        let parts = value.as_tuple(7)?;
        let use_pty = match &parts[6] {
            Value::Bool(b) => *b,
            other => {
                return Err(ValueError::Shape {
                    expected: "bool",
                    got: other.kind(),
                })
            }
        };
        Ok(Self {
            command: parts[0].as_str()?.to_string(),
            username: parts[1].as_str()?.to_string(),
            password: parts[2].as_str()?.to_string(),
            status_file: parts[3].as_opt_str()?.map(str::to_string),
            out_file: parts[4].as_opt_str()?.map(str::to_string),
            err_file: parts[5].as_opt_str()?.map(str::to_string),
            use_pty,
        })
    }

    /// Re-encode as a payload value, used when forwarding to a sub-agent
    /// with the credentials cleared.
    pub fn to_value(&self) -> Value {
        Value::List(vec![
            Value::from(self.command.as_str()),
            Value::from(self.username.as_str()),
            Value::from(self.password.as_str()),
            Value::from(self.status_file.clone()),
            Value::from(self.out_file.clone()),
            Value::from(self.err_file.clone()),
            Value::Bool(self.use_pty),
        ])
    }

    /// Whether the command should run detached from the request cycle.
    pub fn detached(&self) -> bool {
        self.status_file.is_some() || self.out_file.is_some() || self.err_file.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_value() {
        let req = ShellRequest {
            command: "ls /tmp".to_string(),
            username: String::new(),
            password: String::new(),
            status_file: Some("/tmp/status".to_string()),
            out_file: None,
            err_file: None,
            use_pty: false,
        };
        let decoded = ShellRequest::from_value(&req.to_value()).unwrap();
        assert_eq!(req, decoded);
        assert!(decoded.detached());
    }

    #[test]
    fn synchronous_when_no_files() {
        let req = ShellRequest {
            command: "true".to_string(),
            username: String::new(),
            password: String::new(),
            status_file: None,
            out_file: None,
            err_file: None,
            use_pty: true,
        };
        assert!(!req.detached());
        let decoded = ShellRequest::from_value(&req.to_value()).unwrap();
        assert!(decoded.use_pty);
    }
}
