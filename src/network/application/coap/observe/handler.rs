//! Handling of observe registrations.

use super::codec::{decode_condition, encode_condition};
use super::observing::Observing;
use super::policy::NotificationPolicy;
use super::resource::ResourceHandle;
use super::store::ObserverId;
use super::{ObserveError, TOO_MANY_OBSERVERS};
use crate::network::application::coap::{Clock, Code, Endpoint, Message, TEXT_PLAIN};
use core::fmt::Write;

/// Outcome of [`Observing::observe_handler`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Registration {
    /// Not an observe request, or the response already carries an error.
    Ignored,
    /// The client was registered.
    Added(ObserverId),
    /// Registration failed; the response code says why.
    Rejected(ObserveError),
    /// A GET without Observe cancelled this many observations.
    Removed(usize),
}

impl<K: Clock, P: NotificationPolicy, const N: usize> Observing<K, P, N> {
    /// Process a request to `resource` from `source` and complete `response`.
    ///
    /// Call this from the resource's GET handler after the representation
    /// has been written to `response`.
    ///
    /// - A GET with the Observe option registers `source`. The response gets
    ///   Observe 0 and, for a conditional registration, the Condition option
    ///   echoed back. A full pool turns the response into 5.03 with payload
    ///   `TooManyObservers`; an undecodable Condition option into 4.02.
    /// - A GET without the Observe option cancels the observation `source`
    ///   holds on `resource`, if any.
    /// - Other methods, and responses that are already 4.xx or 5.xx, are
    ///   left alone.
    pub fn observe_handler<Req, Resp>(
        &mut self,
        resource: &ResourceHandle,
        source: &Endpoint,
        request: &Req,
        response: &mut Resp,
    ) -> Registration
    where
        Req: Message,
        Resp: Message,
    {
        if request.code() != Code::GET || response.code().is_error() {
            return Registration::Ignored;
        }

        if request.observe().is_none() {
            let removed = self.store.remove_by_resource(Some(source), resource);
            if removed > 0 {
                debug!("{} stopped observing {}", source, resource);
            }
            return Registration::Removed(removed);
        }

        let condition = match request.condition() {
            Some(bytes) if P::ACCEPTS_CONDITIONS => match decode_condition(bytes) {
                Ok(condition) => Some(condition),
                Err(e) => {
                    warn!("bad condition option from {}", source);
                    response.set_code(Code::BAD_OPTION);
                    return Registration::Rejected(e);
                }
            },
            _ => None,
        };

        match self.add_observer(source, request.token(), resource, condition) {
            Ok(id) => {
                response.set_observe(Some(0));
                if let Some(condition) = &condition {
                    response.set_condition(Some(encode_condition(condition).as_slice()));
                }
                if self.config.echo_registration {
                    self.echo_registration(response);
                }
                Registration::Added(id)
            }
            Err(ObserveError::TooManyObservers) => {
                response.set_code(Code::SERVICE_UNAVAILABLE);
                response.set_payload(TOO_MANY_OBSERVERS);
                Registration::Rejected(ObserveError::TooManyObservers)
            }
            Err(e) => Registration::Rejected(e),
        }
    }

    fn echo_registration<Resp: Message>(&self, response: &mut Resp) {
        let mut text: heapless::String<32> = heapless::String::new();
        if write!(text, "Added {}/{}", self.store.len(), N).is_ok() {
            response.set_content_format(TEXT_PLAIN);
            response.set_payload(text.as_bytes());
        }
    }
}
