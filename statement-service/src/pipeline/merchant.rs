/// Cache key for a description: lowercase letters and spaces only, first
/// two words, single-space joined. `"STARBUCKS #1234 SEATTLE"` becomes
/// `"starbucks seattle"`.
pub fn merchant_key(description: &str) -> String {
    let letters: String = description
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect();

    letters.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_digits_and_punctuation() {
        assert_eq!(merchant_key("STARBUCKS #1234 SEATTLE WA"), "starbucks seattle");
        assert_eq!(merchant_key("UNKNOWN MERCHANT XYZ"), "unknown merchant");
    }

    #[test]
    fn same_merchant_different_store_numbers_share_a_key() {
        assert_eq!(
            merchant_key("Blue Bottle 0042 Oakland"),
            merchant_key("BLUE BOTTLE #17 SF")
        );
    }

    #[test]
    fn accented_letters_are_kept() {
        assert_eq!(merchant_key("Café Rouge #12"), "café rouge");
        assert_eq!(merchant_key("CAFÉ ROUGE 0099"), merchant_key("café rouge"));
    }

    #[test]
    fn short_and_empty_descriptions() {
        assert_eq!(merchant_key("Netflix"), "netflix");
        assert_eq!(merchant_key("12345 ###"), "");
        assert_eq!(merchant_key(""), "");
    }
}
