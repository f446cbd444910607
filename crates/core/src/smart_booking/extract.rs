//! Pulls a JSON object out of free-form model output.

use serde_json::{Deserializer, Map, Value};

/// Returns the first complete JSON object in `raw`.
///
/// Models often wrap the object in prose or a fenced code block. Every `{`
/// is tried as a starting point, and the first one that parses as a whole
/// object wins; anything after it is ignored.
#[must_use]
pub fn first_json_object(raw: &str) -> Option<Map<String, Value>> {
    raw.char_indices()
        .filter(|(_, c)| *c == '{')
        .find_map(|(start, _)| {
            let mut stream = Deserializer::from_str(&raw[start..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(Value::Object(map))) => Some(map),
                _ => None,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"amount": 35}"#)]
    #[case("```json\n{\"amount\": 35}\n```")]
    #[case(r#"好的，结果如下：{"amount": 35} 希望有帮助"#)]
    #[case(r#"{broken {"amount": 35}"#)]
    fn test_finds_object(#[case] raw: &str) {
        let map = first_json_object(raw).unwrap();
        assert_eq!(map.get("amount"), Some(&Value::from(35)));
    }

    #[test]
    fn test_nested_object_returned_whole() {
        let map = first_json_object(r#"x {"a": {"b": 1}, "c": 2} y {"d": 3}"#).unwrap();
        assert!(map.contains_key("a"));
        assert!(map.contains_key("c"));
        assert!(!map.contains_key("d"));
    }

    #[rstest]
    #[case("")]
    #[case("no json here")]
    #[case("[1, 2, 3]")]
    #[case(r#"{"unterminated": "#)]
    fn test_no_object(#[case] raw: &str) {
        assert!(first_json_object(raw).is_none());
    }
}
