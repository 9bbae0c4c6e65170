//! Paginated listing of the current observers.
//!
//! The listing is one line per observer, in registration order:
//!
//! ```text
//! </sensors/temp>;ipaddr=[192.168.1.20];port=5683;T=4;V=5;R=NON
//! </lights/1>;ipaddr=[fe80::1];port=61616
//! ```
//!
//! Lines are separated by `\n`. The `T`, `V` and `R` attributes are present
//! only for conditional observers. A client reads the listing in blocks by
//! passing back the offset returned with each block; offsets count bytes of
//! the whole listing.

use super::observing::Observing;
use super::policy::NotificationPolicy;
use super::store::Observer;
use super::{BLOCK_OUT_OF_SCOPE, ObserveError};
use crate::network::application::coap::message::MAX_PAYLOAD_LEN;
use crate::network::application::coap::{APPLICATION_LINK_FORMAT, Clock, Code, Message};
use core::fmt::Write;
use heapless::String;

/// Longest line a single observer can produce.
const ENTRY_LEN: usize = 192;

/// One block of the listing.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Block {
    /// Bytes written to the buffer.
    pub len: usize,
    /// Offset of the next block, or `-1` when this block ends the listing.
    pub next_offset: i32,
}

fn render(observer: &Observer) -> Result<String<ENTRY_LEN>, ObserveError> {
    let mut line = String::new();
    let endpoint = observer.endpoint();
    write!(
        line,
        "</{}>;ipaddr=[{}];port={}",
        observer.resource().path(),
        endpoint.addr,
        endpoint.port
    )
    .map_err(|_| ObserveError::BufferOverflow)?;

    if let Some(condition) = observer.condition() {
        write!(
            line,
            ";T={};V={};R={}",
            condition.cond_type.code(),
            condition.value,
            condition.reliability.as_str()
        )
        .map_err(|_| ObserveError::BufferOverflow)?;
    }
    Ok(line)
}

impl<K: Clock, P: NotificationPolicy, const N: usize> Observing<K, P, N> {
    /// Write the block of the listing starting at `offset` into `buffer`.
    ///
    /// At most `preferred_size` bytes are written. `buffer` must hold at
    /// least `preferred_size` bytes, otherwise
    /// [`ObserveError::BufferOverflow`] is returned, as it is for a zero
    /// `preferred_size`, which could never advance. An offset at or past the
    /// end of a non-empty listing, or a negative one, yields
    /// [`ObserveError::BlockOutOfScope`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use libobserve::network::application::coap::observe::{Observing, ResourceHandle};
    /// use libobserve::network::application::coap::{Endpoint, ManualClock};
    ///
    /// let clock = ManualClock::new(0);
    /// let mut observing: Observing<_> = Observing::new(&clock);
    /// let temp = ResourceHandle::new("temp").unwrap();
    /// observing
    ///     .add_observer(&Endpoint::new([10, 0, 0, 9].into(), 5683), &[], &temp, None)
    ///     .unwrap();
    ///
    /// let mut buffer = [0u8; 64];
    /// let block = observing.list_observations(&mut buffer, 0, 64).unwrap();
    /// assert_eq!(&buffer[..block.len], b"</temp>;ipaddr=[10.0.0.9];port=5683");
    /// assert_eq!(block.next_offset, -1);
    /// ```
    pub fn list_observations(
        &self,
        buffer: &mut [u8],
        offset: i32,
        preferred_size: usize,
    ) -> Result<Block, ObserveError> {
        if preferred_size == 0 || buffer.len() < preferred_size {
            return Err(ObserveError::BufferOverflow);
        }
        let start = usize::try_from(offset).map_err(|_| ObserveError::BlockOutOfScope)?;
        let end = start.saturating_add(preferred_size);

        let mut position = 0usize;
        let mut written = 0usize;
        for (_, observer) in self.store.iter() {
            let line = render(observer)?;
            let separator: &[u8] = if position == 0 { b"" } else { b"\n" };

            for chunk in [separator, line.as_bytes()] {
                let chunk_end = position + chunk.len();
                let from = start.max(position);
                let to = end.min(chunk_end);
                if from < to {
                    let len = to - from;
                    buffer[written..written + len]
                        .copy_from_slice(&chunk[from - position..to - position]);
                    written += len;
                }
                position = chunk_end;
            }
        }

        let total = position;
        if start > 0 && start >= total {
            return Err(ObserveError::BlockOutOfScope);
        }

        let next_offset = if end < total {
            i32::try_from(end).map_err(|_| ObserveError::BufferOverflow)?
        } else {
            -1
        };
        Ok(Block {
            len: written,
            next_offset,
        })
    }

    /// Answer a listing request: fill `response` with the block at `offset`.
    ///
    /// The block is capped at the message's payload capacity. An offset past
    /// the end turns the response into 4.02 with payload `BlockOutOfScope`.
    pub fn observations_handler<Resp: Message>(
        &self,
        response: &mut Resp,
        offset: i32,
        preferred_size: usize,
    ) -> Result<Block, ObserveError> {
        let mut buffer = [0u8; MAX_PAYLOAD_LEN];
        let size = preferred_size.min(MAX_PAYLOAD_LEN);

        match self.list_observations(&mut buffer, offset, size) {
            Ok(block) => {
                response.set_content_format(APPLICATION_LINK_FORMAT);
                response.set_payload(&buffer[..block.len]);
                Ok(block)
            }
            Err(ObserveError::BlockOutOfScope) => {
                response.set_code(Code::BAD_OPTION);
                response.set_payload(BLOCK_OUT_OF_SCOPE);
                Err(ObserveError::BlockOutOfScope)
            }
            Err(e) => Err(e),
        }
    }
}
