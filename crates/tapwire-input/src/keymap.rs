//! US-layout mapping from characters to key chords.
//!
//! Used when typing text through a hardware-level keyboard: each character
//! becomes a keycode plus the modifiers needed to produce it on a US layout.

use tapwire_types::key::key_code;

/// A key plus the modifiers held around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    pub modifiers: Vec<u16>,
    pub code: u16,
}

fn chord(names: &[&str]) -> Option<KeyChord> {
    let (key, mods) = names.split_last()?;
    let code = key_code(key)?;
    let mut modifiers = Vec::with_capacity(mods.len());
    for name in mods {
        modifiers.push(key_code(name)?);
    }
    Some(KeyChord { modifiers, code })
}

/// Map a character to the chord that types it, or `None` for characters the
/// layout cannot produce.
pub fn char_to_chord(c: char) -> Option<KeyChord> {
    let shifted = |key: &str| chord(&["LEFTSHIFT", key]);
    match c {
        '\n' => chord(&["ENTER"]),
        '\t' => chord(&["TAB"]),
        ' ' => chord(&["SPACE"]),
        '`' => chord(&["GRAVE"]),
        '~' => shifted("GRAVE"),
        '!' => shifted("1"),
        '@' => shifted("2"),
        '#' => shifted("3"),
        '$' => shifted("4"),
        '%' => shifted("5"),
        '^' => shifted("6"),
        '&' => shifted("7"),
        '*' => shifted("8"),
        '(' => shifted("9"),
        ')' => shifted("0"),
        '-' => chord(&["MINUS"]),
        '_' => shifted("MINUS"),
        '=' => chord(&["EQUAL"]),
        '+' => shifted("EQUAL"),
        '[' => chord(&["LEFTBRACE"]),
        '{' => shifted("LEFTBRACE"),
        ']' => chord(&["RIGHTBRACE"]),
        '}' => shifted("RIGHTBRACE"),
        ';' => chord(&["SEMICOLON"]),
        ':' => shifted("SEMICOLON"),
        '\'' => chord(&["APOSTROPHE"]),
        '"' => shifted("APOSTROPHE"),
        '\\' => chord(&["BACKSLASH"]),
        '|' => shifted("BACKSLASH"),
        ',' => chord(&["COMMA"]),
        '<' => shifted("COMMA"),
        '.' => chord(&["DOT"]),
        '>' => shifted("DOT"),
        '/' => chord(&["SLASH"]),
        '?' => shifted("SLASH"),
        'a'..='z' | '0'..='9' => chord(&[&c.to_ascii_uppercase().to_string()]),
        'A'..='Z' => shifted(&c.to_string()),
        _ => None,
    }
}
