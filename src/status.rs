//! Message status information.
//!
//! This module provides the [`Status`] struct returned by every receive,
//! describing where the message came from and how much it carried.

/// Information about a received message.
///
/// Returned by [`Communicator::recv`](crate::Communicator::recv).
///
/// # Example
///
/// ```
/// use ferrovis::{World, ANY_TAG};
///
/// let statuses = World::new(2)?.run(|world| {
///     if world.rank() == 0 {
///         world.send(&[1.0f64, 2.0, 3.0], 1, 7)?;
///         Ok(None)
///     } else {
///         let mut buf = [0.0f64; 8];
///         Ok(Some(world.recv(&mut buf, 0, ANY_TAG)?))
///     }
/// })?;
/// let status = statuses[1].clone().unwrap();
/// assert_eq!((status.source, status.tag, status.count), (0, 7, 3));
/// # Ok::<(), ferrovis::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Source rank of the message.
    pub source: i32,
    /// Tag of the message.
    pub tag: i32,
    /// Number of elements in the message.
    pub count: i64,
}
