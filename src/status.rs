//! Message status information.
//!
//! This module provides the [`Status`] struct returned by
//! [`Communicator::recv`](crate::Communicator::recv), describing the message
//! that was matched.

/// Information about a received message.
///
/// # Example
///
/// ```
/// use ferropi::Runtime;
///
/// let statuses = Runtime::new(2).unwrap().run(|world| {
///     if world.rank() == 0 {
///         world.send(&[1.0f64, 2.0], 1, 7)?;
///         Ok(None)
///     } else {
///         let mut buf = [0.0f64; 4];
///         Ok(Some(world.recv(&mut buf, 0, 7)?))
///     }
/// }).unwrap();
///
/// let status = statuses[1].clone().unwrap();
/// assert_eq!((status.source, status.tag, status.count), (0, 7, 2));
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
