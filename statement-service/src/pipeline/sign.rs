//! Final sign correction from description phrases, applied after
//! categorization regardless of the sign extraction produced.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

static FORCE_NEGATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)credit card payment|payment thank you|\b(?:purchases?|withdrawals?|fees?|pos|atm)\b",
    )
    .expect("negative sign pattern is valid")
});

static FORCE_POSITIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:salary|deposits?|refunds?|interest)\b")
        .expect("positive sign pattern is valid")
});

/// Apply the sign overrides and round to cents. Negative phrases take
/// precedence when both kinds appear.
pub fn apply_sign_rules(description: &str, amount: Decimal) -> Decimal {
    let signed = if FORCE_NEGATIVE.is_match(description) {
        -amount.abs()
    } else if FORCE_POSITIVE.is_match(description) {
        amount.abs()
    } else {
        amount
    };

    signed.round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn payment_thank_you_is_always_negative() {
        assert_eq!(apply_sign_rules("Payment Thank You", dec("250.00")), dec("-250.00"));
        assert_eq!(apply_sign_rules("PAYMENT THANK YOU", dec("-250.00")), dec("-250.00"));
    }

    #[test]
    fn spending_phrases_force_negative() {
        assert_eq!(apply_sign_rules("Card Purchase Target", dec("30.10")), dec("-30.10"));
        assert_eq!(apply_sign_rules("ATM Withdrawal", dec("60.00")), dec("-60.00"));
        assert_eq!(apply_sign_rules("Monthly Service Fee", dec("12.00")), dec("-12.00"));
        assert_eq!(apply_sign_rules("POS Debit Shell", dec("40.00")), dec("-40.00"));
    }

    #[test]
    fn income_phrases_force_positive() {
        assert_eq!(apply_sign_rules("ACME Salary", dec("-3000.00")), dec("3000.00"));
        assert_eq!(apply_sign_rules("Mobile Deposit", dec("-20.00")), dec("20.00"));
        assert_eq!(apply_sign_rules("Amazon Refund", dec("-15.99")), dec("15.99"));
        assert_eq!(apply_sign_rules("Interest Paid", dec("-0.42")), dec("0.42"));
    }

    #[test]
    fn deposit_is_not_mistaken_for_pos() {
        assert_eq!(apply_sign_rules("Direct Deposit", dec("100.00")), dec("100.00"));
    }

    #[test]
    fn negative_phrase_wins_over_positive() {
        assert_eq!(apply_sign_rules("Refund Fee", dec("5.00")), dec("-5.00"));
    }

    #[test]
    fn neutral_descriptions_keep_sign_and_round() {
        assert_eq!(apply_sign_rules("Zelle From John", dec("4835.814")), dec("4835.81"));
        assert_eq!(apply_sign_rules("Netflix", dec("-15.49")), dec("-15.49"));
    }
}
