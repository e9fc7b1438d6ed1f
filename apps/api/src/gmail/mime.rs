//! Minimal RFC 5322 message builder for HTML outreach mail.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

use crate::outreach::compose::SenderIdentity;

const BODY_LINE_LEN: usize = 76;
/// Raw bytes per encoded-word; 45 bytes encode to 60 base64 chars, 72 with the delimiters.
const ENCODED_WORD_BYTES: usize = 45;

/// Removes CR/LF so a value cannot open a new header.
fn header_safe(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, '\r' | '\n')).collect()
}

/// RFC 2047 encoding for non-ASCII header text; ASCII passes through.
///
/// Long values become several encoded-words of at most 75 characters, split on
/// character boundaries and folded onto continuation lines.
pub fn encode_header(value: &str) -> String {
    let value = header_safe(value);
    if value.is_ascii() {
        return value;
    }

    let mut words = Vec::new();
    let mut start = 0;
    for (i, c) in value.char_indices() {
        if i + c.len_utf8() - start > ENCODED_WORD_BYTES {
            words.push(&value[start..i]);
            start = i;
        }
    }
    words.push(&value[start..]);

    words
        .iter()
        .map(|word| format!("=?UTF-8?B?{}?=", STANDARD.encode(word.as_bytes())))
        .collect::<Vec<_>>()
        .join("\r\n ")
}

fn mailbox(name: &str, email: &str) -> String {
    let email = header_safe(email);
    if name.trim().is_empty() {
        return email;
    }
    let name = encode_header(name.trim());
    if name.starts_with("=?") {
        format!("{name} <{email}>")
    } else {
        format!("\"{}\" <{email}>", name.replace('"', ""))
    }
}

pub fn build_message(from: &SenderIdentity, to: &str, subject: &str, html_body: &str) -> String {
    let encoded = STANDARD.encode(html_body.as_bytes());
    let body = encoded
        .as_bytes()
        .chunks(BODY_LINE_LEN)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n");

    [
        format!("From: {}", mailbox(&from.name, &from.email)),
        format!("To: {}", header_safe(to)),
        format!("Subject: {}", encode_header(subject)),
        "MIME-Version: 1.0".to_string(),
        "Content-Type: text/html; charset=\"UTF-8\"".to_string(),
        "Content-Transfer-Encoding: base64".to_string(),
        String::new(),
        body,
    ]
    .join("\r\n")
}

/// The `raw` field Gmail expects: base64url without padding.
pub fn encode_raw(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(name: &str) -> SenderIdentity {
        SenderIdentity {
            name: name.to_string(),
            email: "sam@example.com".to_string(),
        }
    }

    #[test]
    fn test_ascii_subject_is_unchanged() {
        assert_eq!(encode_header("Quick question"), "Quick question");
    }

    #[test]
    fn test_non_ascii_subject_is_encoded_word() {
        let encoded = encode_header("Café role");
        assert!(encoded.starts_with("=?UTF-8?B?"));
        let inner = encoded.trim_start_matches("=?UTF-8?B?").trim_end_matches("?=");
        assert_eq!(STANDARD.decode(inner).unwrap(), "Café role".as_bytes());
    }

    #[test]
    fn test_long_subject_is_split_into_short_words() {
        let subject = "Candidature spontanée pour le poste de développeur senior à l'équipe données";
        let encoded = encode_header(subject);

        let words: Vec<&str> = encoded.split("\r\n ").collect();
        assert!(words.len() > 1);
        let mut decoded = Vec::new();
        for word in &words {
            assert!(word.len() <= 75, "encoded-word too long: {word}");
            let inner = word
                .strip_prefix("=?UTF-8?B?")
                .and_then(|w| w.strip_suffix("?="))
                .unwrap();
            decoded.extend(STANDARD.decode(inner).unwrap());
        }
        assert_eq!(String::from_utf8(decoded).unwrap(), subject);
    }

    #[test]
    fn test_header_injection_is_stripped() {
        let message = build_message(&sender("Sam"), "a@b.com\r\nBcc: evil@x.com", "Hi", "<p>x</p>");
        assert!(!message.contains("\r\nBcc:"));
    }

    #[test]
    fn test_message_layout_and_body_round_trip() {
        let message = build_message(&sender("Sam Lee"), "ann@example.com", "Hello", "<p>Hi Ann</p>");
        let (headers, body) = message.split_once("\r\n\r\n").unwrap();

        assert!(headers.starts_with("From: \"Sam Lee\" <sam@example.com>\r\n"));
        assert!(headers.contains("To: ann@example.com"));
        assert!(headers.contains("Content-Type: text/html; charset=\"UTF-8\""));
        let decoded = STANDARD.decode(body.replace("\r\n", "")).unwrap();
        assert_eq!(decoded, b"<p>Hi Ann</p>");
    }

    #[test]
    fn test_raw_is_url_safe_without_padding() {
        let raw = encode_raw("subject??>>\r\n\r\nbody");
        assert!(!raw.contains('='));
        assert!(!raw.contains('+'));
        assert!(!raw.contains('/'));
        assert_eq!(URL_SAFE_NO_PAD.decode(&raw).unwrap(), b"subject??>>\r\n\r\nbody");
    }
}
