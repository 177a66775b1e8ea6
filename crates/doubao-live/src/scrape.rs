//! Field lookup over the minimal JSON subset the dialogue server sends.
//!
//! A key is found by its quoted name and its string value runs to the next
//! quote. Escaped quotes inside values are not handled. Absent or malformed
//! fields yield `None`, never an error, so extra fields are always tolerated.

pub fn string_field<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let rest = value_start(text, key)?.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(&rest[..end])
}

pub fn bool_field(text: &str, key: &str) -> Option<bool> {
    let rest = value_start(text, key)?;
    if rest.starts_with("true") {
        Some(true)
    } else if rest.starts_with("false") {
        Some(false)
    } else {
        None
    }
}

/// The first of `keys` that holds a string value.
pub fn first_string_field<'a>(text: &'a str, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| string_field(text, key))
}

fn value_start<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("\"{key}\"");
    let mut search = text;
    // A key name may also appear as a value; keep looking for one followed by a colon.
    loop {
        let at = search.find(&needle)?;
        let rest = search[at + needle.len()..].trim_start();
        if let Some(value) = rest.strip_prefix(':') {
            return Some(value.trim_start());
        }
        search = &search[at + needle.len()..];
    }
}
