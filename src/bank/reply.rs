//! Spoken replies for fetched data and failures.
//!
//! Everything here is pure string formatting; amounts render exactly as the
//! wire carried them.

use super::client::BankError;
use super::models::{AccountRecord, TransactionRecord};
use crate::command::Intent;

/// Reply for the account resource. An empty feed gets an explicit no-data
/// reply instead of indexing a missing record.
pub fn balance_reply(records: &[AccountRecord]) -> String {
    match records.first() {
        Some(account) => format!("Your bank balance is ${}", account.value),
        None => "No account information is available".to_string(),
    }
}

/// Reply for the transactions resource, one line per record in feed order.
pub fn transactions_reply(records: &[TransactionRecord]) -> String {
    let mut reply = String::from("Your recent transactions are: ");
    for tx in records {
        reply.push('\n');
        reply.push_str(&format!("{}: ${} - {}", tx.date, tx.amount, tx.description));
    }
    reply
}

/// Reply when an utterance matches no command.
pub fn not_recognized() -> String {
    "Command not recognized".to_string()
}

/// Reply for a failed fetch. Transport failures surface the underlying
/// cause; the feed answering badly gets the generic per-intent phrase.
pub fn failure_reply(intent: Intent, error: &BankError) -> String {
    match error {
        BankError::Transport(cause) => format!("Error: {cause}"),
        BankError::Status(_) | BankError::Decode(_) => match intent {
            Intent::BankBalance => "Failed to fetch bank balance".to_string(),
            Intent::TransactionHistory => "Failed to fetch transaction history".to_string(),
            Intent::Unrecognized => not_recognized(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn account(json: &str) -> Vec<AccountRecord> {
        serde_json::from_str(json).unwrap()
    }

    fn transactions(json: &str) -> Vec<TransactionRecord> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn balance_uses_the_first_record_verbatim() {
        let records = account(r#"[{"value": 523.10}]"#);
        assert_eq!(balance_reply(&records), "Your bank balance is $523.10");
    }

    #[test]
    fn balance_ignores_later_records() {
        let records = account(r#"[{"value": 100}, {"value": 200}]"#);
        assert_eq!(balance_reply(&records), "Your bank balance is $100");
    }

    #[test]
    fn empty_account_feed_has_a_spoken_reply() {
        assert_eq!(balance_reply(&[]), "No account information is available");
    }

    #[test]
    fn transactions_list_one_line_per_record() {
        let records = transactions(r#"[{"date":"2024-01-02","amount":42,"description":"Coffee"}]"#);
        assert_eq!(transactions_reply(&records), "Your recent transactions are: \n2024-01-02: $42 - Coffee");
    }

    #[test]
    fn transactions_preserve_feed_order() {
        let records = transactions(
            r#"[{"date":"2024-01-02","amount":42,"description":"Coffee"},
                {"date":"2024-01-01","amount":9.99,"description":"Book"}]"#,
        );
        assert_eq!(
            transactions_reply(&records),
            "Your recent transactions are: \n2024-01-02: $42 - Coffee\n2024-01-01: $9.99 - Book"
        );
    }

    #[test]
    fn no_transactions_is_just_the_prefix() {
        assert_eq!(transactions_reply(&[]), "Your recent transactions are: ");
    }

    #[test]
    fn formatting_is_idempotent() {
        let records = transactions(r#"[{"date":"2024-01-02","amount":42,"description":"Coffee"}]"#);
        assert_eq!(transactions_reply(&records), transactions_reply(&records));

        let accounts = account(r#"[{"value": 523.10}]"#);
        assert_eq!(balance_reply(&accounts), balance_reply(&accounts));
    }

    #[test]
    fn feed_failures_speak_the_per_intent_phrase() {
        let error = BankError::Status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure_reply(Intent::BankBalance, &error), "Failed to fetch bank balance");
        assert_eq!(failure_reply(Intent::TransactionHistory, &error), "Failed to fetch transaction history");
    }
}
