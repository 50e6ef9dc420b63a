//! Wire types for the bank data feed.

use serde::Deserialize;
use serde_json::Number;

/// One element of the account resource. Only the balance matters; extra
/// fields are ignored. Amounts stay as [`Number`] so they render exactly as
/// the wire carried them.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRecord {
    pub value: Number,
}

/// One element of the transactions resource.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRecord {
    pub date: String,
    pub amount: Number,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_value_keeps_wire_precision() {
        let records: Vec<AccountRecord> = serde_json::from_str(r#"[{"value": 523.10}]"#).unwrap();
        assert_eq!(records[0].value.to_string(), "523.10");
    }

    #[test]
    fn integer_amounts_stay_integers() {
        let records: Vec<TransactionRecord> =
            serde_json::from_str(r#"[{"date":"2024-01-02","amount":42,"description":"Coffee"}]"#).unwrap();
        assert_eq!(records[0].amount.to_string(), "42");
    }

    #[test]
    fn extra_account_fields_are_ignored() {
        let records: Vec<AccountRecord> =
            serde_json::from_str(r#"[{"id": 7, "value": 10.5, "currency": "USD"}]"#).unwrap();
        assert_eq!(records[0].value.to_string(), "10.5");
    }
}
