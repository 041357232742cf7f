//! Transfer input validation
//!
//! Pure checks over the draft, the sending address and the cached balance.
//! The order is fixed: the first failing check decides the reported kind.

use crate::address::Address;
use crate::amount::Wei;
use crate::error::ErrorKind;

/// A transfer that passed every check, ready for the provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedTransfer {
    pub to: Address,
    pub value: Wei,
}

/// Validate a transfer draft against the sender and the last balance snapshot
///
/// A missing snapshot counts as a zero balance. No check touches the network.
pub fn validate_transfer(
    recipient: &str,
    amount: &str,
    sender: &Address,
    balance: Option<Wei>,
) -> Result<ValidatedTransfer, ErrorKind> {
    let recipient = recipient.trim();
    let amount = amount.trim();

    if recipient.is_empty() {
        return Err(ErrorKind::EmptyRecipient);
    }
    if amount.is_empty() {
        return Err(ErrorKind::EmptyAmount);
    }

    let to = Address::parse(recipient).map_err(|_| ErrorKind::MalformedAddress)?;

    if &to == sender {
        return Err(ErrorKind::SelfSend);
    }

    let value = Wei::parse_ether(amount).map_err(|_| ErrorKind::InvalidAmount)?;
    if value.is_zero() {
        return Err(ErrorKind::InvalidAmount);
    }

    if value > balance.unwrap_or(Wei::ZERO) {
        return Err(ErrorKind::InsufficientBalance);
    }

    Ok(ValidatedTransfer { to, value })
}
