//! Byte-to-text decoding with a Windows-1252 retry, plus the folding used
//! for header matching.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// Decoded file text and how much we trust the decode.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static str,
    /// 1.0 for a clean decode, lower as unresolved markers remain.
    pub confidence: f32,
    /// Set when the first-choice decode was rejected for another encoding.
    pub fallback_from: Option<&'static str>,
}

/// UTF-8 first (or whatever a BOM announces). When the result shows
/// replacement characters or `?` substitutions, the original bytes are
/// decoded again as Windows-1252 and the cleaner of the two is kept.
pub fn decode(bytes: &[u8]) -> Decoded {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        let markers = count_markers(&text);
        if encoding != UTF_8 || markers == 0 {
            return Decoded {
                text: text.into_owned(),
                encoding: encoding.name(),
                confidence: confidence(markers),
                fallback_from: None,
            };
        }
    }

    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let (utf8, _) = UTF_8.decode_without_bom_handling(body);
    let utf8_markers = count_markers(&utf8);
    if utf8_markers == 0 {
        return Decoded {
            text: utf8.into_owned(),
            encoding: UTF_8.name(),
            confidence: 1.0,
            fallback_from: None,
        };
    }

    let (legacy, _) = WINDOWS_1252.decode_without_bom_handling(body);
    let legacy_markers = count_markers(&legacy);
    if legacy_markers < utf8_markers {
        Decoded {
            text: legacy.into_owned(),
            encoding: WINDOWS_1252.name(),
            confidence: confidence(legacy_markers),
            fallback_from: Some(UTF_8.name()),
        }
    } else {
        Decoded {
            text: utf8.into_owned(),
            encoding: UTF_8.name(),
            confidence: confidence(utf8_markers),
            fallback_from: None,
        }
    }
}

fn confidence(markers: usize) -> f32 {
    1.0 / (1.0 + markers as f32)
}

/// Replacement characters, `?` wedged between two letters, and UTF-8 read
/// as Windows-1252: the two-byte pairs (`Ã¶`, `Ã¤`, ...) and the three-byte
/// punctuation runs (`â€“`, `â€™`, `â‚¬`, ...).
fn count_markers(text: &str) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let mut count = 0;
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '\u{FFFD}' => count += 1,
            '?' if i > 0 && i + 1 < chars.len() => {
                if chars[i - 1].is_alphabetic() && chars[i + 1].is_alphabetic() {
                    count += 1;
                }
            }
            'Ã' | 'Â' if chars.get(i + 1).is_some_and(|&n| is_continuation_glyph(n)) => {
                count += 1;
            }
            'â' if chars.get(i + 1).is_some_and(|&n| is_continuation_glyph(n))
                && chars.get(i + 2).is_some_and(|&n| is_continuation_glyph(n)) =>
            {
                count += 1;
            }
            _ => {}
        }
    }
    count
}

/// What a UTF-8 continuation byte looks like once read as Windows-1252.
fn is_continuation_glyph(c: char) -> bool {
    ('\u{A0}'..='\u{BF}').contains(&c) || "€‚ƒ„…†‡ˆ‰Š‹ŒŽ‘’“”•–—˜™š›œžŸ".contains(c)
}

/// Known mangled spellings of "för" seen in Swedish bank headers.
const CORRUPTED_FOR: &[&str] = &["fã¶r", "f\u{FFFD}\u{FFFD}r", "f\u{FFFD}r", "f?r", "f”r"];

/// ASCII-safe key for header matching only. Stored data never goes through
/// this.
pub fn fold_for_matching(s: &str) -> String {
    let mut lower = s.to_lowercase();
    for bad in CORRUPTED_FOR {
        if lower.contains(bad) {
            lower = lower.replace(bad, "for");
        }
    }
    let lower = lower
        .replace("ã¥", "a")
        .replace("ã¤", "a")
        .replace("ã¶", "o")
        .replace("ã©", "e");

    lower
        .chars()
        .map(|c| match c {
            'å' | 'ä' | 'à' | 'á' | 'â' => 'a',
            'ö' | 'ø' | 'ó' | 'ò' | 'ô' => 'o',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'ü' | 'ú' => 'u',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_utf8_kept() {
        let d = decode("Datum;Belopp;Beskrivning\n2024-01-15;-1,00;Kök".as_bytes());
        assert_eq!(d.encoding, "UTF-8");
        assert_eq!(d.confidence, 1.0);
        assert!(d.fallback_from.is_none());
        assert!(d.text.ends_with("Kök"));
    }

    #[test]
    fn utf8_bom_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"Datum");
        let d = decode(&bytes);
        assert_eq!(d.text, "Datum");
    }

    #[test]
    fn utf16_bom_honored() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "Belopp".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let d = decode(&bytes);
        assert_eq!(d.encoding, "UTF-16LE");
        assert_eq!(d.text, "Belopp");
    }

    #[test]
    fn windows_1252_recovered() {
        // "Bokföringsdag;Belopp" with ö as the single byte 0xF6
        let bytes = b"Bokf\xF6ringsdag;Belopp;K\xF6p";
        let d = decode(bytes);
        assert_eq!(d.encoding, "windows-1252");
        assert_eq!(d.fallback_from, Some("UTF-8"));
        assert_eq!(d.text, "Bokföringsdag;Belopp;Köp");
        assert_eq!(d.confidence, 1.0);
    }

    #[test]
    fn question_mark_between_letters_counts() {
        assert_eq!(count_markers("Bokf?ringsdag"), 1);
        assert_eq!(count_markers("Is it? Yes"), 0);
    }

    #[test]
    fn mojibake_pairs_count() {
        assert_eq!(count_markers("BokfÃ¶ringsdag"), 1);
    }

    #[test]
    fn mojibake_punctuation_counts() {
        assert_eq!(count_markers("Kaffe â€“ Barâ€™s"), 2);
        assert_eq!(count_markers("Pris 5 â‚¬"), 1);
        assert_eq!(count_markers("Crème brûlée, château"), 0);
    }

    #[test]
    fn stray_byte_does_not_mangle_utf8_punctuation() {
        let mut bytes = "Datum;Belopp;Beskrivning\n2024-01-15;-1,00;Kaffe – Bar’s\n"
            .as_bytes()
            .to_vec();
        bytes.extend_from_slice(b"2024-01-16;-2,00;Caf\xE9\n");
        let d = decode(&bytes);
        assert_eq!(d.encoding, "UTF-8");
        assert!(d.fallback_from.is_none());
        assert!(d.text.contains("Kaffe – Bar’s"));
        assert!(d.confidence < 1.0);
    }

    #[test]
    fn fold_diacritics() {
        assert_eq!(fold_for_matching("Bokföringsdag"), "bokforingsdag");
        assert_eq!(fold_for_matching("Marknadsvärde"), "marknadsvarde");
    }

    #[test]
    fn fold_corrupted_for() {
        assert_eq!(fold_for_matching("Bokf?ringsdag"), "bokforingsdag");
        assert_eq!(fold_for_matching("Bokf\u{FFFD}ringsdag"), "bokforingsdag");
        assert_eq!(fold_for_matching("BokfÃ¶ringsdag"), "bokforingsdag");
    }
}
