//! Input-key name table.
//!
//! Key names known to Linux input devices, see `linux/input-event-codes.h`
//! or <http://www.usb.org/developers/hidpage>. The order is significant:
//! the keycode of a name is its index in the table.

/// Key names in keycode order.
pub const INPUT_KEYS: &[&str] = &[
    "RESERVED", "ESC", "1", "2", "3", "4", "5", "6", "7", "8", "9", "0",
    "MINUS", "EQUAL", "BACKSPACE", "TAB",
    "Q", "W", "E", "R", "T", "Y", "U", "I", "O", "P",
    "LEFTBRACE", "RIGHTBRACE", "ENTER", "LEFTCTRL",
    "A", "S", "D", "F", "G", "H", "J", "K", "L",
    "SEMICOLON", "APOSTROPHE", "GRAVE", "LEFTSHIFT", "BACKSLASH",
    "Z", "X", "C", "V", "B", "N", "M",
    "COMMA", "DOT", "SLASH", "RIGHTSHIFT", "KPASTERISK", "LEFTALT",
    "SPACE", "CAPSLOCK",
    "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10",
    "NUMLOCK", "SCROLLLOCK",
    "KP7", "KP8", "KP9", "KPMINUS",
    "KP4", "KP5", "KP6", "KPPLUS",
    "KP1", "KP2", "KP3", "KP0", "KPDOT",
    "undefined0",
    "ZENKAKUHANKAKU", "102ND", "F11", "F12", "RO",
    "KATAKANA", "HIRAGANA", "HENKAN", "KATAKANAHIRAGANA", "MUHENKAN",
    "KPJPCOMMA", "KPENTER", "RIGHTCTRL", "KPSLASH", "SYSRQ", "RIGHTALT",
    "LINEFEED", "HOME", "UP", "PAGEUP", "LEFT", "RIGHT", "END", "DOWN",
    "PAGEDOWN", "INSERT", "DELETE", "MACRO",
    "MUTE", "VOLUMEDOWN", "VOLUMEUP",
    "POWER",
    "KPEQUAL", "KPPLUSMINUS", "PAUSE", "SCALE", "KPCOMMA", "HANGEUL",
    "HANGUEL", "HANJA", "YEN", "LEFTMETA", "RIGHTMETA", "COMPOSE",
];

/// Resolve a key name to its keycode.
///
/// Case-insensitive; an optional `KEY_` prefix is accepted, so `"KEY_A"`,
/// `"key_a"` and `"A"` all resolve to the same code.
pub fn key_code(name: &str) -> Option<u16> {
    let name = name.to_ascii_uppercase();
    let name = name.strip_prefix("KEY_").unwrap_or(&name);
    INPUT_KEYS
        .iter()
        .position(|&k| k == name)
        .and_then(|idx| u16::try_from(idx).ok())
}

/// All key names, sorted, for capability listing.
pub fn key_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = INPUT_KEYS.to_vec();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_input_h() {
        // Spot checks against linux/input-event-codes.h values.
        assert_eq!(key_code("ESC"), Some(1));
        assert_eq!(key_code("A"), Some(30));
        assert_eq!(key_code("SPACE"), Some(57));
        assert_eq!(key_code("ENTER"), Some(28));
        assert_eq!(key_code("LEFTSHIFT"), Some(42));
        assert_eq!(key_code("VOLUMEUP"), Some(115));
    }

    #[test]
    fn prefix_and_case_insensitive() {
        assert_eq!(key_code("KEY_HOME"), key_code("home"));
        assert_eq!(key_code("key_enter"), Some(28));
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(key_code("NO_SUCH_KEY"), None);
    }

    #[test]
    fn names_are_sorted() {
        let names = key_names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), INPUT_KEYS.len());
    }
}
