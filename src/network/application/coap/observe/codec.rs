//! Wire format of the Condition option.
//!
//! ```text
//!   0 1 2 3 4 5 6 7
//!  +-+-+-+-+-+-+-+-+-------------------------+
//!  |  type   |R| V |  value (0..=4 bytes, BE) |
//!  +-+-+-+-+-+-+-+-+-------------------------+
//! ```
//!
//! `type` is the 5-bit condition code, `R` the reliability (0 CON, 1 NON),
//! `V` the value kind (0 integer, 1 duration, 2 float). The value is written
//! in as few bytes as possible; zero takes none.

use super::ObserveError;
use super::condition::{Condition, ConditionType, Reliability, ValueKind};
use crate::network::application::coap::message::MAX_CONDITION_LEN;
use heapless::Vec;

/// Version of the Condition option layout produced and accepted here.
pub const CONDITION_CODEC_VERSION: u8 = 1;

/// An encoded Condition option.
pub type EncodedCondition = Vec<u8, MAX_CONDITION_LEN>;

/// Encode a condition into its option bytes.
///
/// # Examples
///
/// ```rust
/// use libobserve::network::application::coap::observe::{
///     Condition, ConditionType, Reliability, ValueKind, encode_condition,
/// };
///
/// let step = Condition::new(ConditionType::Step, Reliability::NonConfirmable, ValueKind::Integer, 300);
/// assert_eq!(encode_condition(&step).as_slice(), &[0x24, 0x01, 0x2C]);
/// ```
pub fn encode_condition(condition: &Condition) -> EncodedCondition {
    let mut out = EncodedCondition::new();

    let reliability = match condition.reliability {
        Reliability::Confirmable => 0,
        Reliability::NonConfirmable => 1,
    };
    let kind = match condition.value_kind {
        ValueKind::Integer => 0,
        ValueKind::Duration => 1,
        ValueKind::Float => 2,
    };
    let header = condition.cond_type.code() << 3 | reliability << 2 | kind;

    let bytes = condition.value.to_be_bytes();
    let skip = (condition.value.leading_zeros() / 8) as usize;

    // One header byte plus at most four value bytes fit the capacity.
    let _ = out.push(header);
    let _ = out.extend_from_slice(&bytes[skip..]);
    out
}

/// Decode Condition option bytes.
///
/// Fails with [`ObserveError::MalformedCondition`] for empty input, input
/// longer than five bytes, or the reserved value kind 3.
pub fn decode_condition(bytes: &[u8]) -> Result<Condition, ObserveError> {
    let (&header, value_bytes) = bytes.split_first().ok_or(ObserveError::MalformedCondition)?;
    if value_bytes.len() > 4 {
        return Err(ObserveError::MalformedCondition);
    }

    let value_kind = match header & 0x03 {
        0 => ValueKind::Integer,
        1 => ValueKind::Duration,
        2 => ValueKind::Float,
        _ => return Err(ObserveError::MalformedCondition),
    };
    let reliability = if header & 0x04 == 0 {
        Reliability::Confirmable
    } else {
        Reliability::NonConfirmable
    };
    let cond_type = ConditionType::from_code(header >> 3)?;

    let value = value_bytes
        .iter()
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));

    Ok(Condition::new(cond_type, reliability, value_kind, value))
}
