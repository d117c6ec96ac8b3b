//! Minimal ordered header bag used for upstream requests/responses, so this
//! crate doesn't need to depend on a concrete HTTP client's header type.

pub type Headers = Vec<(String, String)>;

pub fn header_get<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

pub fn header_set(headers: &mut Headers, name: &str, value: impl Into<String>) {
    header_remove(headers, name);
    headers.push((name.to_string(), value.into()));
}

pub fn header_remove(headers: &mut Headers, name: &str) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_existing_case_insensitively() {
        let mut headers: Headers = vec![("Content-Type".into(), "text/plain".into())];
        header_set(&mut headers, "content-type", "application/json");
        assert_eq!(headers.len(), 1);
        assert_eq!(header_get(&headers, "Content-Type"), Some("application/json"));
    }
}
