//! Communicators: point-to-point and collective operations between ranks.
//!
//! Every rank owns one inbox. A message is a typed `Vec<T>` tagged with its
//! source, a message tag and a [`DatatypeTag`]. Messages between a given
//! pair of ranks arrive in the order they were sent; a receive matches on
//! `(source, tag)` and parks anything else in a per-rank stash.
//!
//! Collectives are built from point-to-point messages on reserved negative
//! tags. Broadcast and reduce walk a binomial tree rooted at `root`, so both
//! finish in `ceil(log2(size))` rounds.

use crate::datatype::{Datatype, DatatypeTag};
use crate::error::{Error, Result};
use crate::status::Status;
use crate::ReduceOp;
use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

/// Wildcard source for [`Communicator::recv`].
pub const ANY_SOURCE: i32 = -1;

/// Wildcard tag for [`Communicator::recv`]. Matches any non-negative tag.
pub const ANY_TAG: i32 = -1;

const TAG_BARRIER: i32 = -100;
const TAG_BCAST: i32 = -101;
const TAG_REDUCE: i32 = -102;

/// How long a blocked receive waits before re-checking the abort flag.
const ABORT_POLL: Duration = Duration::from_millis(10);

pub(crate) struct Envelope {
    source: i32,
    tag: i32,
    datatype: DatatypeTag,
    count: i64,
    payload: Box<dyn Any + Send>,
}

/// State shared by every rank of one run.
pub(crate) struct Shared {
    outboxes: Vec<Sender<Envelope>>,
    aborted: AtomicBool,
}

impl Shared {
    pub(crate) fn new(outboxes: Vec<Sender<Envelope>>) -> Self {
        Shared {
            outboxes,
            aborted: AtomicBool::new(false),
        }
    }

    pub(crate) fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

/// A communicator spanning every rank of a [`Runtime`](crate::Runtime) run.
///
/// Each rank receives its own communicator. It is `Send` but not `Sync`: a
/// rank drives its communicator from one thread.
///
/// # Example
///
/// ```
/// use ferropi::{ReduceOp, Runtime};
///
/// let sums = Runtime::new(4).unwrap().run(|world| {
///     world.allreduce_scalar(world.rank() as f64, ReduceOp::Sum)
/// }).unwrap();
///
/// assert_eq!(sums, vec![6.0; 4]);
/// ```
pub struct Communicator {
    rank: i32,
    shared: Arc<Shared>,
    inbox: Receiver<Envelope>,
    stash: RefCell<VecDeque<Envelope>>,
}

impl Communicator {
    pub(crate) fn new(rank: i32, shared: Arc<Shared>, inbox: Receiver<Envelope>) -> Self {
        Communicator {
            rank,
            shared,
            inbox,
            stash: RefCell::new(VecDeque::new()),
        }
    }

    /// Get the rank of the calling worker in this communicator.
    pub fn rank(&self) -> i32 {
        self.rank
    }

    /// Get the number of workers in this communicator.
    pub fn size(&self) -> i32 {
        self.shared.outboxes.len() as i32
    }

    fn check_rank(&self, rank: i32) -> Result<()> {
        if (0..self.size()).contains(&rank) {
            Ok(())
        } else {
            Err(Error::InvalidRank(rank))
        }
    }

    /// Position of this rank in a tree rooted at `root`.
    fn relative_rank(&self, root: i32) -> i32 {
        (self.rank - root).rem_euclid(self.size())
    }

    fn absolute_rank(&self, relative: i32, root: i32) -> i32 {
        (relative + root) % self.size()
    }

    // ========================================================================
    // Message transport
    // ========================================================================

    fn post<T: Datatype>(&self, data: Vec<T>, dest: i32, tag: i32) -> Result<()> {
        let envelope = Envelope {
            source: self.rank,
            tag,
            datatype: T::TAG,
            count: data.len() as i64,
            payload: Box::new(data),
        };
        self.shared.outboxes[dest as usize]
            .send(envelope)
            .map_err(|_| Error::Disconnected)
    }

    fn take_stashed(&self, source: i32, tag: i32) -> Option<Envelope> {
        let mut stash = self.stash.borrow_mut();
        let pos = stash.iter().position(|env| envelope_matches(env, source, tag))?;
        stash.remove(pos)
    }

    fn take<T: Datatype>(&self, source: i32, tag: i32) -> Result<(Status, Vec<T>)> {
        let envelope = match self.take_stashed(source, tag) {
            Some(envelope) => envelope,
            None => loop {
                match self.inbox.recv_timeout(ABORT_POLL) {
                    Ok(envelope) if envelope_matches(&envelope, source, tag) => break envelope,
                    Ok(envelope) => self.stash.borrow_mut().push_back(envelope),
                    Err(RecvTimeoutError::Timeout) => {
                        if self.shared.is_aborted() {
                            return Err(Error::Aborted);
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => return Err(Error::Disconnected),
                }
            },
        };

        if envelope.datatype != T::TAG {
            return Err(Error::TypeMismatch {
                expected: T::TAG,
                found: envelope.datatype,
            });
        }
        let status = Status {
            source: envelope.source,
            tag: envelope.tag,
            count: envelope.count,
        };
        let data = envelope
            .payload
            .downcast::<Vec<T>>()
            .map_err(|_| Error::Internal("payload does not match its datatype tag".into()))?;
        Ok((status, *data))
    }

    // ========================================================================
    // Point-to-Point Communication
    // ========================================================================

    /// Send a slice of values to another rank.
    ///
    /// The send is buffered: it returns as soon as the message is queued.
    /// `tag` must be non-negative; negative tags are reserved for collectives.
    pub fn send<T: Datatype>(&self, data: &[T], dest: i32, tag: i32) -> Result<()> {
        self.check_rank(dest)?;
        if tag < 0 {
            return Err(Error::InvalidTag(tag));
        }
        self.post(data.to_vec(), dest, tag)
    }

    /// Receive values from another rank into `data`.
    ///
    /// Use [`ANY_SOURCE`] and [`ANY_TAG`] as wildcards. The message may be
    /// shorter than `data`; [`Status::count`] tells how many elements arrived.
    pub fn recv<T: Datatype>(&self, data: &mut [T], source: i32, tag: i32) -> Result<Status> {
        if source != ANY_SOURCE {
            self.check_rank(source)?;
        }
        if tag < ANY_TAG {
            return Err(Error::InvalidTag(tag));
        }
        let (status, payload) = self.take::<T>(source, tag)?;
        if payload.len() > data.len() {
            return Err(Error::InvalidCount(status.count));
        }
        data[..payload.len()].copy_from_slice(&payload);
        Ok(status)
    }

    // ========================================================================
    // Synchronization
    // ========================================================================

    /// Barrier synchronization.
    ///
    /// All ranks must call this function. No rank returns until all ranks
    /// have entered the barrier.
    pub fn barrier(&self) -> Result<()> {
        if self.rank == 0 {
            for source in 1..self.size() {
                self.take::<u8>(source, TAG_BARRIER)?;
            }
            for dest in 1..self.size() {
                self.post::<u8>(Vec::new(), dest, TAG_BARRIER)?;
            }
        } else {
            self.post::<u8>(Vec::new(), 0, TAG_BARRIER)?;
            self.take::<u8>(0, TAG_BARRIER)?;
        }
        Ok(())
    }

    // ========================================================================
    // Blocking Collectives
    // ========================================================================

    /// Broadcast a slice of values from root to all ranks.
    ///
    /// # Arguments
    ///
    /// * `data` - Buffer to broadcast (input at root, output at others)
    /// * `root` - Rank of the root process
    ///
    /// Every rank must pass a buffer of the same length.
    pub fn broadcast<T: Datatype>(&self, data: &mut [T], root: i32) -> Result<()> {
        self.check_rank(root)?;
        let size = self.size();
        let relative = self.relative_rank(root);

        let mut mask = 1;
        while mask < size {
            if relative & mask != 0 {
                let parent = self.absolute_rank(relative - mask, root);
                let (status, payload) = self.take::<T>(parent, TAG_BCAST)?;
                if payload.len() != data.len() {
                    return Err(Error::InvalidCount(status.count));
                }
                data.copy_from_slice(&payload);
                break;
            }
            mask <<= 1;
        }

        mask >>= 1;
        while mask > 0 {
            if relative + mask < size {
                let child = self.absolute_rank(relative + mask, root);
                self.post(data.to_vec(), child, TAG_BCAST)?;
            }
            mask >>= 1;
        }

        tracing::trace!(rank = self.rank, root, len = data.len(), "broadcast complete");
        Ok(())
    }

    /// Broadcast a single value from root. Returns the root's value on every rank.
    pub fn broadcast_scalar<T: Datatype>(&self, value: T, root: i32) -> Result<T> {
        let mut buf = [value];
        self.broadcast(&mut buf, root)?;
        Ok(buf[0])
    }

    /// Reduce values to the root process.
    ///
    /// # Arguments
    ///
    /// * `send` - Data to send from this process
    /// * `recv` - Buffer for result (only significant at root)
    /// * `op` - Reduction operation
    /// * `root` - Rank of the root process
    ///
    /// Values are combined element-wise along a binomial tree; for a given
    /// world size the order of combination is always the same.
    pub fn reduce<T: Datatype>(
        &self,
        send: &[T],
        recv: &mut [T],
        op: ReduceOp,
        root: i32,
    ) -> Result<()> {
        if send.len() != recv.len() {
            return Err(Error::InvalidBuffer);
        }
        self.check_rank(root)?;
        let size = self.size();
        let relative = self.relative_rank(root);
        let mut acc = send.to_vec();

        let mut mask = 1;
        while mask < size {
            if relative & mask == 0 {
                let child = relative | mask;
                if child < size {
                    let (status, payload) =
                        self.take::<T>(self.absolute_rank(child, root), TAG_REDUCE)?;
                    if payload.len() != acc.len() {
                        return Err(Error::InvalidCount(status.count));
                    }
                    for (a, b) in acc.iter_mut().zip(payload) {
                        *a = a.combine(b, op);
                    }
                }
            } else {
                let parent = self.absolute_rank(relative & !mask, root);
                self.post(acc, parent, TAG_REDUCE)?;
                tracing::trace!(rank = self.rank, parent, "reduce contribution sent");
                return Ok(());
            }
            mask <<= 1;
        }

        recv.copy_from_slice(&acc);
        tracing::trace!(rank = self.rank, ?op, len = acc.len(), "reduce complete at root");
        Ok(())
    }

    /// Reduce a single value to root. Returns `Some(result)` at root, `None` elsewhere.
    pub fn reduce_scalar<T: Datatype>(&self, value: T, op: ReduceOp, root: i32) -> Result<Option<T>> {
        let send = [value];
        let mut recv = [value];
        self.reduce(&send, &mut recv, op, root)?;
        Ok((self.rank == root).then_some(recv[0]))
    }

    /// All-reduce values (reduce and broadcast result to all).
    pub fn allreduce<T: Datatype>(&self, send: &[T], recv: &mut [T], op: ReduceOp) -> Result<()> {
        self.reduce(send, recv, op, 0)?;
        self.broadcast(recv, 0)
    }

    /// All-reduce a single value.
    pub fn allreduce_scalar<T: Datatype>(&self, value: T, op: ReduceOp) -> Result<T> {
        let send = [value];
        let mut recv = [value];
        self.allreduce(&send, &mut recv, op)?;
        Ok(recv[0])
    }
}

fn envelope_matches(envelope: &Envelope, source: i32, tag: i32) -> bool {
    let source_ok = source == ANY_SOURCE || envelope.source == source;
    let tag_ok = if tag == ANY_TAG {
        envelope.tag >= 0
    } else {
        envelope.tag == tag
    };
    source_ok && tag_ok
}
