//! Post-processing of emitted YAML for YAML 1.1 consumers.
//!
//! The emitter follows YAML 1.2 and leaves strings such as `on` or `yes`
//! unquoted. YAML 1.1 parsers, kubectl among them, read those as booleans.

use std::borrow::Cow;

/// Plain scalars that are strings in YAML 1.2 but booleans in YAML 1.1.
/// `true`/`false` and the null forms are already quoted by the emitter.
pub const YAML11_BOOLEANS: &[&str] = &[
    "y", "Y", "yes", "Yes", "YES", "n", "N", "no", "No", "NO", "on", "On", "ON", "off", "Off",
    "OFF",
];

/// Single-quotes every plain key or value in `yaml` that a YAML 1.1 reader
/// would take for a boolean. Block scalar content is left alone.
///
/// Expects block-style output as produced by `serde_yaml`.
pub fn quote_ambiguous_scalars(yaml: &str) -> String {
    let mut out = String::with_capacity(yaml.len());
    // Column that block scalar content is indented past.
    let mut block_parent: Option<usize> = None;

    for line in yaml.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        let indent = body.len() - body.trim_start_matches(' ').len();

        if let Some(parent) = block_parent {
            if body.trim().is_empty() || indent > parent {
                out.push_str(line);
                continue;
            }
            block_parent = None;
        }

        let (rewritten, opens_block) = rewrite_line(body, indent);
        block_parent = opens_block;
        out.push_str(&rewritten);
        out.push_str(newline);
    }
    out
}

/// Rewrites one line. Also returns the parent column when the line opens a
/// block scalar.
fn rewrite_line(body: &str, indent: usize) -> (Cow<'_, str>, Option<usize>) {
    let mut rest = &body[indent..];
    let mut column = indent;
    let mut dashes = 0;
    while let Some(r) = rest.strip_prefix("- ") {
        rest = r;
        column += 2;
        dashes += 1;
    }
    let head = &body[..column];

    match split_entry(rest) {
        Some((key, value)) => {
            let opens = is_block_header(value).then_some(column);
            let key_out = quote(key);
            let value_out = quote(value);
            if matches!((&key_out, &value_out), (Cow::Borrowed(_), Cow::Borrowed(_))) {
                return (Cow::Borrowed(body), opens);
            }
            let mut line = format!("{}{}:", head, key_out);
            if !value.is_empty() {
                line.push(' ');
                line.push_str(&value_out);
            }
            (Cow::Owned(line), opens)
        }
        None => {
            let opens = if is_block_header(rest) {
                Some(if dashes > 0 { column - 2 } else { indent })
            } else {
                None
            };
            match quote(rest) {
                Cow::Borrowed(_) => (Cow::Borrowed(body), opens),
                Cow::Owned(scalar) => (Cow::Owned(format!("{}{}", head, scalar)), opens),
            }
        }
    }
}

/// Splits `key: value` (or `key:`) into key and value text.
fn split_entry(rest: &str) -> Option<(&str, &str)> {
    let key_end = match rest.as_bytes().first()? {
        b'\'' => quoted_end(rest, b'\'')?,
        b'"' => quoted_end(rest, b'"')?,
        _ => {
            if let Some(pos) = rest.find(": ") {
                return Some((&rest[..pos], &rest[pos + 2..]));
            }
            return rest.strip_suffix(':').map(|key| (key, ""));
        }
    };
    let after = &rest[key_end..];
    if after == ":" {
        Some((&rest[..key_end], ""))
    } else {
        after.strip_prefix(": ").map(|value| (&rest[..key_end], value))
    }
}

/// Returns the byte offset just past a quoted scalar starting at offset 0.
fn quoted_end(s: &str, quote: u8) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'"' => i += 2,
            b'\'' if quote == b'\'' && bytes.get(i + 1) == Some(&b'\'') => i += 2,
            b if b == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn is_block_header(value: &str) -> bool {
    value.starts_with('|') || value.starts_with('>')
}

fn quote(scalar: &str) -> Cow<'_, str> {
    if YAML11_BOOLEANS.contains(&scalar) {
        Cow::Owned(format!("'{}'", scalar))
    } else {
        Cow::Borrowed(scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quotes_keys_values_and_items() {
        let input = "\
data:
  a: on
  'b': yes
  c: 'off'
  enabled: true
  script: |-
    on
    - yes
    key: no
  when: y
items:
- on
- - No
- name: ON
  value: n
- |-
  off
- plain
on: x
";
        let expected = "\
data:
  a: 'on'
  'b': 'yes'
  c: 'off'
  enabled: true
  script: |-
    on
    - yes
    key: no
  when: 'y'
items:
- 'on'
- - 'No'
- name: 'ON'
  value: 'n'
- |-
  off
- plain
'on': x
";
        assert_eq!(quote_ambiguous_scalars(input), expected);
    }

    #[test]
    fn test_block_in_sequence_mapping_ends_at_sibling_key() {
        let input = "\
- command: |
    off
  name: off
";
        let expected = "\
- command: |
    off
  name: 'off'
";
        assert_eq!(quote_ambiguous_scalars(input), expected);
    }

    #[test]
    fn test_leaves_other_text_alone() {
        let input = "url: http://on\nempty: {}\nlist: []\nkey:\n  nested: 'no'\nnote: \"y\"\n";
        assert_eq!(quote_ambiguous_scalars(input), input);
    }

    #[test]
    fn test_rendered_strings_round_trip() {
        let value = crate::value::from_yaml(
            "a: \"on\"\nb: \"yes\"\nc: \"y\"\nd: \"off\"\ne: \"no\"\nf: true\n",
        )
        .unwrap();
        let yaml = quote_ambiguous_scalars(&crate::value::to_yaml(&value).unwrap());
        for key in ["a", "b", "c", "d", "e"] {
            let line = yaml.lines().find(|l| l.starts_with(key)).unwrap();
            assert!(line.ends_with('\''), "{}", line);
        }
        assert!(yaml.contains("f: true\n"));
        assert_eq!(crate::value::from_yaml(&yaml).unwrap(), value);
    }
}
