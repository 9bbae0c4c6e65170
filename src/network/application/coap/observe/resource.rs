//! Resource identity and per-resource observe state.

use super::ObserveError;
use heapless::String;

/// Maximum length of a resource path, without the leading `/`.
pub const MAX_URL_LEN: usize = 64;

/// Canonical identifier of an observable resource.
///
/// The path is stored without a leading `/`, so `"/sensors/temp"` and
/// `"sensors/temp"` name the same resource. Two handles match only when
/// their paths are equal.
///
/// # Examples
///
/// ```rust
/// use libobserve::network::application::coap::observe::ResourceHandle;
///
/// let a = ResourceHandle::new("/sensors/temp").unwrap();
/// let b = ResourceHandle::new("sensors/temp").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.path(), "sensors/temp");
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct ResourceHandle {
    path: String<MAX_URL_LEN>,
}

impl ResourceHandle {
    /// Create a handle from a path.
    pub fn new(path: &str) -> Result<Self, ObserveError> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let mut canonical = String::new();
        canonical
            .push_str(path)
            .map_err(|_| ObserveError::UrlTooLong)?;
        Ok(Self { path: canonical })
    }

    /// Path without the leading `/`.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl core::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "/{}", self.path)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ResourceHandle {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "/{=str}", self.path.as_str())
    }
}

/// An observable resource: its handle and the sequence number of its next
/// notification.
///
/// The Observe option carries 24 bits; the sequence wraps accordingly.
#[derive(Debug, Clone)]
pub struct ObservableResource {
    handle: ResourceHandle,
    sequence: u32,
}

impl ObservableResource {
    /// Create a resource whose first notification carries sequence 1.
    pub fn new(path: &str) -> Result<Self, ObserveError> {
        Ok(Self {
            handle: ResourceHandle::new(path)?,
            sequence: 0,
        })
    }

    /// Handle identifying this resource in the observer store.
    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    /// Sequence number of the last notification.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Advance and return the sequence number for a new notification.
    pub fn next_sequence(&mut self) -> u32 {
        self.sequence = self.sequence.wrapping_add(1) & 0x00FF_FFFF;
        self.sequence
    }
}
