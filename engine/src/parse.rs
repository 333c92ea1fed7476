/// Characters `encodeURIComponent` leaves untouched besides ASCII alphanumerics
const UNRESERVED_MARKS: &[u8] = b"-_.!~*'()";

/// Ordered query-string parameters.
///
/// Assigning an existing key keeps its position, new keys are appended, so
/// rendering the same sequence of edits always yields the same string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `key`, treating an empty value as absent
    pub fn get_nonempty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.pairs.iter().position(|(k, _)| k == key)?;
        Some(self.pairs.remove(pos).1)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Parse a query string (with or without the leading `?`) into parameters.
///
/// Values are kept exactly as they appear; decoding is left to the caller.
/// Segments without a key are dropped, a repeated key keeps its last value.
pub fn parse(query: &str) -> QueryParams {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut params = QueryParams::new();

    for segment in query.split('&').filter(|s| !s.is_empty()) {
        let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
        if key.is_empty() {
            continue;
        }
        params.set(key, value);
    }

    params
}

/// Render parameters as a query string without the leading `?`.
/// Keys with empty values are omitted.
pub fn serialize(params: &QueryParams) -> String {
    params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Render parameters as a location search string (`?a=b`, or empty)
pub fn to_search(params: &QueryParams) -> String {
    let query = serialize(params);
    if query.is_empty() {
        query
    } else {
        format!("?{}", query)
    }
}

/// Percent-encode a URL component the way browsers' `encodeURIComponent` does
pub fn encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || UNRESERVED_MARKS.contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Decode `%XX` escapes. Invalid escapes are kept as-is and invalid UTF-8
/// is replaced, so decoding never fails.
pub fn decode_component(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hi = char::from(bytes[i + 1]).to_digit(16);
            let lo = char::from(bytes[i + 2]).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Split a comma-joined list parameter into its (still encoded) entries
pub fn split_list(value: &str) -> Vec<&str> {
    if value.is_empty() {
        Vec::new()
    } else {
        value.split(',').collect()
    }
}

/// Join list entries back into a comma-joined parameter value
pub fn join_list<S: AsRef<str>>(entries: &[S]) -> String {
    entries
        .iter()
        .map(|e| e.as_ref())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let params = parse("?q=data&sort=dateD&p=2");
        assert_eq!(params.get("q"), Some("data"));
        assert_eq!(params.get("sort"), Some("dateD"));
        assert_eq!(params.get("p"), Some("2"));
        assert_eq!(params.get("keys"), None);
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        assert!(parse("").is_empty());
        assert!(parse("?").is_empty());
        let params = parse("&&=x&flag&p=");
        assert_eq!(params.get("flag"), Some(""));
        assert_eq!(params.get_nonempty("p"), None);
        assert_eq!(params.iter().count(), 2);
    }

    #[test]
    fn test_serialize_keeps_order_and_skips_empty() {
        let mut params = QueryParams::new();
        params.set("keys", "a");
        params.set("terms", "");
        params.set("p", "1");
        params.set("keys", "b");
        assert_eq!(serialize(&params), "keys=b&p=1");
        assert_eq!(to_search(&params), "?keys=b&p=1");
        assert_eq!(to_search(&QueryParams::new()), "");
    }

    #[test]
    fn test_encode_component() {
        assert_eq!(encode_component("open_access"), "open_access");
        assert_eq!(encode_component("a,b c"), "a%2Cb%20c");
        assert_eq!(encode_component("Ympäristö"), "Ymp%C3%A4rist%C3%B6");
        assert_eq!(encode_component("x=y&z"), "x%3Dy%26z");
    }

    #[test]
    fn test_decode_component() {
        assert_eq!(decode_component("a%2Cb%20c"), "a,b c");
        assert_eq!(decode_component("Ymp%C3%A4rist%C3%B6"), "Ympäristö");
        assert_eq!(decode_component("100%"), "100%");
        assert_eq!(decode_component("%ZZ"), "%ZZ");
        assert_eq!(decode_component("a+b"), "a+b");
    }

    #[test]
    fn test_lists() {
        assert!(split_list("").is_empty());
        assert_eq!(split_list("a,b%2Cc"), vec!["a", "b%2Cc"]);
        assert_eq!(join_list(&["a", "b"]), "a,b");
        assert_eq!(join_list::<&str>(&[]), "");
    }
}
