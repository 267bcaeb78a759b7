// ── Compiled regex cache ─────────────────────────────────────────────────────

/// Declares a function returning a lazily compiled, process-wide regex.
macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static regex::Regex {
            static R: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
            R.get_or_init(|| regex::Regex::new($pat).expect("invalid regex"))
        }
    };
}

pub(crate) use re;

/// Case-insensitive ASCII substring test without allocating a lowered copy
/// of `haystack`.
pub fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.as_bytes();
    if needle.is_empty() {
        return true;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    re!(re_digits, r"^\d+$");

    #[test]
    fn cached_regex_is_reused() {
        assert!(std::ptr::eq(re_digits(), re_digits()));
        assert!(re_digits().is_match("2024"));
    }

    #[test]
    fn contains_ignores_case() {
        assert!(contains_ignore_ascii_case("xx<ofx>yy", "<OFX>"));
        assert!(!contains_ignore_ascii_case("Datum;Belopp", "<OFX>"));
        assert!(contains_ignore_ascii_case("anything", ""));
    }
}
