/// Errors that can occur while passing descriptors.
///
/// Short writes and short reads are not errors; they surface through the
/// byte counts returned by the send and receive calls. A missing
/// descriptor on an otherwise successful receive is not an error either —
/// see [`crate::RecvOutcome::Missing`].
#[derive(Debug, thiserror::Error)]
pub enum RightsError {
    /// The underlying transmit call failed. The descriptor was not
    /// transferred and remains owned by the caller.
    #[error("transmit failed: {0}")]
    Transmit(#[source] std::io::Error),

    /// The underlying receive call failed.
    #[error("receive failed: {0}")]
    Receive(#[source] std::io::Error),

    /// The peer closed the connection with no data pending. Terminal for
    /// this socket direction.
    #[error("peer closed the connection")]
    Closed,
}

pub type Result<T> = std::result::Result<T, RightsError>;
