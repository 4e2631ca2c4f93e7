//! Three-tier JSON-only extraction for LLM chat output: balanced-brace scan, then
//! fenced-code-block, then a generic brace-matching regex fallback.

use serde_json::Value;

/// Tier 1: scan for the outermost balanced `{...}` respecting string escapes, and
/// parse it. Returns `None` if no balanced object is found or it doesn't parse.
pub fn find_outermost_json(s: &str) -> Option<Value> {
    let bytes: Vec<char> = s.chars().collect();
    let start = bytes.iter().position(|&c| c == '{')?;

    let mut depth = 0i32;
    let mut in_str = false;
    let mut esc = false;
    let mut end = None;
    for (i, &c) in bytes.iter().enumerate().skip(start) {
        if in_str {
            if esc {
                esc = false;
            } else if c == '\\' {
                esc = true;
            } else if c == '"' {
                in_str = false;
            }
            continue;
        }
        match c {
            '"' => in_str = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let end = end?;
    let candidate: String = bytes[start..=end].iter().collect();
    serde_json::from_str(&candidate).ok()
}

/// Tier 2: a fenced ```` ```json ... ``` ```` (or bare ```` ``` ... ``` ````) block.
pub fn extract_json_from_markdown(s: &str) -> Option<Value> {
    let tagged = extract_fenced(s, "```json");
    if let Some(v) = tagged {
        return Some(v);
    }
    extract_fenced(s, "```")
}

fn extract_fenced(s: &str, open_tag: &str) -> Option<Value> {
    let start = s.find(open_tag)? + open_tag.len();
    let rest = &s[start..];
    let end = rest.find("```")?;
    let body = rest[..end].trim();
    let brace_start = body.find('{')?;
    let brace_end = body.rfind('}')?;
    if brace_end < brace_start {
        return None;
    }
    serde_json::from_str(&body[brace_start..=brace_end]).ok()
}

/// Tier 3: a generic brace-matched-group regex fallback (single level of nesting),
/// trying each match until one parses.
pub fn extract_json_regex_fallback(s: &str) -> Option<Value> {
    // Hand-rolled equivalent of `\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}` without pulling in
    // the `regex` crate for one pattern: find every top-or-one-level brace group.
    let chars: Vec<char> = s.chars().collect();
    for i in 0..chars.len() {
        if chars[i] == '{' {
            if let Some(value) = try_parse_group(&chars, i) {
                return Some(value);
            }
        }
    }
    None
}

fn try_parse_group(chars: &[char], start: usize) -> Option<Value> {
    let mut depth = 0i32;
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate: String = chars[start..=i].iter().collect();
                    return serde_json::from_str(&candidate).ok();
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Runs all three tiers in order, returning the first successful parse.
pub fn extract_json(raw: &str) -> Option<Value> {
    find_outermost_json(raw)
        .or_else(|| extract_json_from_markdown(raw))
        .or_else(|| extract_json_regex_fallback(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_trailing_chatter() {
        let raw = r#"Sure, here: {"a":1} and some trailing text."#;
        let v = extract_json(raw).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn extracts_fenced_json_block() {
        let raw = "Here you go:\n```json\n{\"a\": 2}\n```\nthanks";
        let v = extract_json(raw).unwrap();
        assert_eq!(v["a"], 2);
    }

    #[test]
    fn returns_none_for_non_json() {
        assert!(extract_json("not json at all").is_none());
    }

    #[test]
    fn handles_escaped_quotes_in_strings() {
        let raw = r#"{"note": "she said \"hi\""}"#;
        let v = extract_json(raw).unwrap();
        assert_eq!(v["note"], "she said \"hi\"");
    }
}
