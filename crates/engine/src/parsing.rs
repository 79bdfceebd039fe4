use std::{str::FromStr, sync::LazyLock};

use regex::Regex;
use rust_decimal::Decimal;
use unicode_normalization::UnicodeNormalization;

use crate::{ParseError, transaction::TransactionInput};

// The patterns are constant, so compiling them cannot fail at runtime.
#[allow(clippy::expect_used)]
static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(?:[.,][0-9]*)?$").expect("amount pattern"));
#[allow(clippy::expect_used)]
static CATEGORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+").expect("category pattern"));
#[allow(clippy::expect_used)]
static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\(([\w, ]*)\)").expect("tags pattern"));

/// Parses a chat message into a transaction input.
///
/// Grammar: `<amount> <category> [(<tag>, <tag>, ...)] [comment]`, e.g.
/// `9,5 lunch (grenka, dumplings) I need food!`.
///
/// - amount: digits with an optional `.` or `,` decimal part;
/// - category: one word, lower-cased;
/// - tags: optional, lower-cased, empty entries dropped;
/// - comment: whatever is left, trimmed.
///
/// Either the whole message parses or nothing does: a bad amount or a missing
/// category fails the parse, missing tags or comment do not.
pub fn parse_transaction_input(text: &str) -> Result<TransactionInput, ParseError> {
    let result = parse(text.trim());
    match &result {
        Ok(input) => tracing::debug!(?input, text, "parsed transaction input"),
        Err(err) => tracing::info!(%err, text, "failed to parse transaction input"),
    }
    result
}

fn parse(text: &str) -> Result<TransactionInput, ParseError> {
    if !text.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ParseError::MissingAmount);
    }

    let (token, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    let amount = parse_amount(token)?;

    let rest = rest.trim_start();
    let category = CATEGORY.find(rest).ok_or(ParseError::MissingCategory)?;
    let rest = &rest[category.end()..];

    let (tags, rest) = match TAGS.captures(rest) {
        Some(caps) => {
            let group_end = caps.get(0).map_or(0, |m| m.end());
            let tags = caps.get(1).and_then(|m| parse_tags(m.as_str()));
            (tags, &rest[group_end..])
        }
        None => (None, rest),
    };

    let comment = rest.trim();
    Ok(TransactionInput {
        amount,
        category: normalize_word(category.as_str()),
        tags,
        comment: (!comment.is_empty()).then(|| comment.to_string()),
    })
}

fn parse_amount(token: &str) -> Result<Decimal, ParseError> {
    let invalid = || ParseError::InvalidAmountFormat(token.to_string());

    if !AMOUNT.is_match(token) {
        return Err(invalid());
    }
    let normalized = token.replace(',', ".");
    Decimal::from_str(normalized.trim_end_matches('.')).map_err(|_| invalid())
}

fn parse_tags(raw: &str) -> Option<Vec<String>> {
    let tags: Vec<String> = raw
        .split(',')
        .map(normalize_word)
        .filter(|tag| !tag.is_empty())
        .collect();
    (!tags.is_empty()).then_some(tags)
}

fn normalize_word(raw: &str) -> String {
    raw.trim().nfc().collect::<String>().to_lowercase()
}
