//! A fixed-capacity CoAP message implementing [`Message`].

use super::{Code, DEFAULT_MAX_AGE, MAX_TOKEN_LEN, Message, MessageType, Token};
use heapless::Vec;

/// Maximum payload size carried by a [`Packet`].
pub const MAX_PAYLOAD_LEN: usize = 256;

/// Maximum Condition option length: one header byte and four value bytes.
pub const MAX_CONDITION_LEN: usize = 5;

/// A parsed or to-be-serialized CoAP message with the options used by observe.
///
/// # Examples
///
/// ```rust
/// use libobserve::network::application::coap::{Code, Message, MessageType, Packet};
///
/// let mut notification = Packet::new(MessageType::NonConfirmable, Code::CONTENT, 0);
/// notification.set_payload(b"21");
/// notification.set_max_age(Some(30));
///
/// assert_eq!(notification.payload(), b"21");
/// assert_eq!(notification.max_age(), 30);
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Packet {
    message_type: MessageType,
    code: Code,
    mid: u16,
    token: Token,
    observe: Option<u32>,
    condition: Option<Vec<u8, MAX_CONDITION_LEN>>,
    max_age: Option<u32>,
    content_format: Option<u16>,
    payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

impl Packet {
    /// Create a message without options or payload.
    pub fn new(message_type: MessageType, code: Code, mid: u16) -> Self {
        Self {
            message_type,
            code,
            mid,
            token: Token::new(),
            observe: None,
            condition: None,
            max_age: None,
            content_format: None,
            payload: Vec::new(),
        }
    }

    /// Set the token from a byte slice.
    ///
    /// Fails with `Err(())` when the slice is longer than
    /// [`MAX_TOKEN_LEN`](super::MAX_TOKEN_LEN).
    pub fn set_token(&mut self, token: &[u8]) -> Result<(), ()> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(());
        }
        self.token = Vec::from_slice(token)?;
        Ok(())
    }

    /// Set or clear the Max-Age option.
    pub fn set_max_age(&mut self, seconds: Option<u32>) {
        self.max_age = seconds;
    }

    /// Content-Format option, if present.
    pub fn content_format(&self) -> Option<u16> {
        self.content_format
    }

    /// Payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl Message for Packet {
    fn code(&self) -> Code {
        self.code
    }

    fn set_code(&mut self, code: Code) {
        self.code = code;
    }

    fn message_type(&self) -> MessageType {
        self.message_type
    }

    fn set_message_type(&mut self, message_type: MessageType) {
        self.message_type = message_type;
    }

    fn mid(&self) -> u16 {
        self.mid
    }

    fn set_mid(&mut self, mid: u16) {
        self.mid = mid;
    }

    fn token(&self) -> &[u8] {
        &self.token
    }

    fn set_token(&mut self, token: &Token) {
        self.token = token.clone();
    }

    fn observe(&self) -> Option<u32> {
        self.observe
    }

    fn set_observe(&mut self, sequence: Option<u32>) {
        // The option carries at most three bytes.
        self.observe = sequence.map(|seq| seq & 0x00FF_FFFF);
    }

    fn condition(&self) -> Option<&[u8]> {
        self.condition.as_deref()
    }

    fn set_condition(&mut self, condition: Option<&[u8]>) {
        self.condition = condition.map(|bytes| {
            let len = bytes.len().min(MAX_CONDITION_LEN);
            // `len` is clamped to the capacity, so this cannot fail.
            Vec::from_slice(&bytes[..len]).unwrap_or_default()
        });
    }

    fn max_age(&self) -> u32 {
        self.max_age.unwrap_or(DEFAULT_MAX_AGE)
    }

    fn set_content_format(&mut self, format: u16) {
        self.content_format = Some(format);
    }

    fn set_payload(&mut self, payload: &[u8]) -> usize {
        let len = payload.len().min(MAX_PAYLOAD_LEN);
        self.payload.clear();
        // Truncated to the capacity above.
        let _ = self.payload.extend_from_slice(&payload[..len]);
        len
    }
}
