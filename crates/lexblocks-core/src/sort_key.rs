//! Sort key normalisation for German statutory citations.
//!
//! Converts paragraph numbers as they appear in block metadata ("29", "§ 35a",
//! "Art. 3") plus optional Absatz and Satz numbers into lexicographically
//! sortable strings, so that listing blocks by key recovers statutory order.
//!
//! # German numbering conventions
//!
//! - Plain numeric: § 1, § 2, ..., § 10
//! - Letter suffix (inserted by amendment): § 35a between § 35 and § 36
//! - Absatz (subsection) and Satz (sentence) are plain integers

/// Normalise a paragraph number into a sortable `NNNN.SS` string.
///
/// Numbers above 9999 are clamped to 9999.
///
/// Input: "29", "§ 35a", "§§ 35b", "Art. 3"
/// Output: "0029.00", "0035.01", "0035.02", "0003.00"
///
/// Leading "§", "§§" or "Art." and whitespace are ignored. The first letter
/// after the digits becomes the suffix (a=01 .. z=26); anything after that is
/// ignored.
pub fn normalize_paragraph(s: &str) -> String {
    let s = s.trim();
    let s = s.trim_start_matches('§');
    let s = s
        .trim_start()
        .strip_prefix("Art.")
        .unwrap_or(s.trim_start())
        .trim();

    let lower = s.to_lowercase();
    let digit_end = lower
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(lower.len());
    // Digits too long for u64 saturate like any other number above 9999.
    let digits = &lower[..digit_end];
    let base: u64 = if digits.is_empty() {
        0
    } else {
        digits.parse().unwrap_or(u64::MAX)
    };

    let suffix = lower[digit_end..]
        .trim_start()
        .bytes()
        .next()
        .filter(u8::is_ascii_lowercase)
        .map(|b| (b - b'a') as u32 + 1)
        .unwrap_or(0);

    format!("{:04}.{:02}", base.min(9999), suffix)
}

/// Full sort key for a citation: paragraph, then Absatz, then Satz.
///
/// Missing parts sort first: a block for the whole paragraph precedes its
/// Absätze, and an Absatz precedes its Sätze.
pub fn citation_sort_key(paragraph: Option<&str>, absatz: Option<u32>, satz: Option<u32>) -> String {
    let para = paragraph.map(normalize_paragraph).unwrap_or_else(|| "0000.00".to_string());
    format!(
        "{}.{:03}.{:03}",
        para,
        absatz.unwrap_or(0).min(999),
        satz.unwrap_or(0).min(999)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: assert a list of citations produces keys in strictly ascending order.
    fn assert_sorted_order(inputs: &[(&str, Option<u32>, Option<u32>)]) {
        let keys: Vec<String> = inputs
            .iter()
            .map(|(p, a, s)| citation_sort_key(Some(p), *a, *s))
            .collect();
        for i in 1..keys.len() {
            assert!(
                keys[i - 1] < keys[i],
                "Expected {:?} ({}) < {:?} ({})",
                inputs[i - 1],
                keys[i - 1],
                inputs[i],
                keys[i],
            );
        }
    }

    #[test]
    fn plain_numeric_sequence() {
        assert_sorted_order(&[
            ("1", None, None),
            ("2", None, None),
            ("10", None, None),
            ("100", None, None),
        ]);
    }

    #[test]
    fn letter_suffix_insertion() {
        assert_sorted_order(&[
            ("35", None, None),
            ("35a", None, None),
            ("35b", None, None),
            ("36", None, None),
        ]);
    }

    #[test]
    fn absatz_and_satz_nest_under_paragraph() {
        assert_sorted_order(&[
            ("29", None, None),
            ("29", Some(1), None),
            ("29", Some(1), Some(1)),
            ("29", Some(1), Some(2)),
            ("29", Some(2), None),
            ("29a", None, None),
        ]);
    }

    #[test]
    fn exact_values() {
        assert_eq!(normalize_paragraph("29"), "0029.00");
        assert_eq!(normalize_paragraph("§ 29"), "0029.00");
        assert_eq!(normalize_paragraph("§29"), "0029.00");
        assert_eq!(normalize_paragraph("§§ 35a"), "0035.01");
        assert_eq!(normalize_paragraph("35 b"), "0035.02");
        assert_eq!(normalize_paragraph("Art. 3"), "0003.00");
        assert_eq!(citation_sort_key(Some("29"), Some(2), Some(1)), "0029.00.002.001");
    }

    #[test]
    fn empty_and_missing() {
        assert_eq!(normalize_paragraph(""), "0000.00");
        assert_eq!(citation_sort_key(None, None, None), "0000.00.000.000");
    }

    #[test]
    fn uppercase_normalised() {
        assert_eq!(normalize_paragraph("35A"), normalize_paragraph("35a"));
    }

    #[test]
    fn whitespace_trimmed() {
        assert_eq!(normalize_paragraph("  § 5  "), normalize_paragraph("5"));
    }

    #[test]
    fn oversized_numbers_clamp_to_the_end() {
        assert_eq!(normalize_paragraph("12345"), "9999.00");
        assert_eq!(normalize_paragraph("12345678901"), "9999.00");
        assert_eq!(normalize_paragraph("123456789012345678901234567890b"), "9999.02");
        assert!(normalize_paragraph("12345678901") > normalize_paragraph("2"));
    }
}
