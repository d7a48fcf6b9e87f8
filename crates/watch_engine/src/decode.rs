use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    pub text: String,
    pub encoding_label: &'static str,
    /// True when malformed sequences were replaced with U+FFFD.
    pub had_errors: bool,
}

/// Decode a response body to UTF-8: BOM -> Content-Type charset -> chardetng guess.
/// Never fails; malformed input is decoded with replacement characters.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> DecodedBody {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(encoding) = content_type
        .and_then(charset_param)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, encoding);
    }

    if bytes.is_empty() {
        return decode_with(bytes, UTF_8);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches(['"', '\'']).to_string())
        } else {
            None
        }
    })
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> DecodedBody {
    let (text, used, had_errors) = encoding.decode(bytes);
    DecodedBody {
        text: text.into_owned(),
        encoding_label: used.name(),
        had_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::decode_body;

    #[test]
    fn charset_header_is_respected() {
        let decoded = decode_body(b"Universit\xe0", Some("text/html; Charset=\"ISO-8859-1\""));
        assert_eq!(decoded.text, "Università");
        assert_eq!(decoded.encoding_label, "windows-1252");
        assert!(!decoded.had_errors);
    }

    #[test]
    fn utf8_bom_wins_over_header() {
        let decoded = decode_body(b"\xEF\xBB\xBFhello", Some("text/html; charset=iso-8859-1"));
        assert_eq!(decoded.text, "hello");
        assert_eq!(decoded.encoding_label, "UTF-8");
    }

    #[test]
    fn malformed_bytes_are_replaced_not_rejected() {
        let decoded = decode_body(b"ok \xff\xfe\xfd", Some("text/html; charset=utf-8"));
        assert!(decoded.text.starts_with("ok "));
        assert!(decoded.had_errors);
    }

    #[test]
    fn plain_utf8_without_hints_is_detected() {
        let decoded = decode_body("<p>Caffè</p>".as_bytes(), None);
        assert_eq!(decoded.text, "<p>Caffè</p>");
    }
}
