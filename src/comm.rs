//! Point-to-point communication between the workers of a [`World`](crate::World).

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::datatype::{self, Datatype, Payload};
use crate::error::{Error, Result};
use crate::status::Status;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Wildcard tag for [`Communicator::recv`]: accept the next message whatever its tag.
pub const ANY_TAG: i32 = -1;

/// A message in flight.
#[derive(Debug)]
struct Envelope {
    source: i32,
    tag: i32,
    payload: Payload,
}

/// What lands in a rank's inbox.
#[derive(Debug)]
enum Delivery {
    Message(Envelope),
    /// The given rank has exited. Only sent to ranks blocked on it.
    Departed(i32),
}

/// Liveness of one rank and the ranks currently blocked receiving from it.
#[derive(Debug, Default)]
struct Presence {
    departed: bool,
    waiters: Vec<i32>,
}

/// State shared by every endpoint of one group.
#[derive(Debug)]
struct Group {
    /// Indexed by destination rank
    inboxes: Vec<Sender<Delivery>>,
    /// Indexed by rank
    presence: Vec<Mutex<Presence>>,
}

impl Group {
    fn presence(&self, rank: i32) -> MutexGuard<'_, Presence> {
        // A panicking worker leaves `Presence` consistent; keep going.
        self.presence[rank as usize]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A worker's endpoint into its group.
///
/// Each rank owns a single inbox shared by all senders. Messages that arrive
/// ahead of the receive asking for them are held per source, so messages from
/// one source are received in the order they were sent (non-overtaking). Sends
/// are eager: they return as soon as the message is queued. Receives block
/// until a message from the requested source arrives; there is no timeout.
///
/// # Example
///
/// ```
/// use ferrovis::World;
///
/// World::new(2)?.run(|world| {
///     let peer = 1 - world.rank();
///     world.send_scalar(world.rank() * 10, peer, 0)?;
///     let got = world.recv_scalar::<i32>(peer, 0)?;
///     assert_eq!(got, peer * 10);
///     Ok(())
/// })?;
/// # Ok::<(), ferrovis::Error>(())
/// ```
pub struct Communicator {
    rank: i32,
    size: i32,
    group: Arc<Group>,
    inbox: Receiver<Delivery>,
    /// Messages received ahead of time, by source rank
    early: RefCell<HashMap<i32, VecDeque<Envelope>>>,
}

impl Communicator {
    /// Build the endpoints of a `size`-worker group, in rank order.
    ///
    /// One channel per rank: setup is linear in the group size.
    pub(crate) fn mesh(size: i32) -> Vec<Communicator> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| unbounded()).unzip();
        let group = Arc::new(Group {
            inboxes: senders,
            presence: (0..size).map(|_| Mutex::default()).collect(),
        });

        receivers
            .into_iter()
            .zip(0..)
            .map(|(inbox, rank)| Communicator {
                rank,
                size,
                group: Arc::clone(&group),
                inbox,
                early: RefCell::default(),
            })
            .collect()
    }

    /// Get the rank of the calling worker in this group.
    pub fn rank(&self) -> i32 {
        self.rank
    }

    /// Get the number of workers in this group.
    pub fn size(&self) -> i32 {
        self.size
    }

    fn check_rank(&self, rank: i32) -> Result<usize> {
        if (0..self.size).contains(&rank) {
            Ok(rank as usize)
        } else {
            Err(Error::InvalidRank(rank))
        }
    }

    // ========================================================================
    // Point-to-Point Communication
    // ========================================================================

    /// Send a slice of values to another worker.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRank`] for a destination outside the group,
    /// [`Error::InvalidTag`] for a negative tag and
    /// [`Error::PeerDisconnected`] if the destination has already exited.
    pub fn send<T: Datatype>(&self, data: &[T], dest: i32, tag: i32) -> Result<()> {
        let index = self.check_rank(dest)?;
        if tag < 0 {
            return Err(Error::InvalidTag(tag));
        }

        #[cfg(feature = "debug")]
        tracing::trace!(from = self.rank, to = dest, tag, count = data.len(), "send");

        self.group.inboxes[index]
            .send(Delivery::Message(Envelope {
                source: self.rank,
                tag,
                payload: datatype::pack(data),
            }))
            .map_err(|_| Error::PeerDisconnected(dest))
    }

    /// Receive the next message from `source` into `data`.
    ///
    /// Use `tag = ANY_TAG` to accept any tag. Any other tag must match the
    /// incoming message exactly: peers that disagree about the message sequence
    /// are reported as [`Error::ProtocolMismatch`] rather than misread.
    ///
    /// Returns the [`Status`] of the received message; only the first
    /// `status.count` elements of `data` are written.
    pub fn recv<T: Datatype>(&self, data: &mut [T], source: i32, tag: i32) -> Result<Status> {
        self.check_rank(source)?;
        if tag < ANY_TAG {
            return Err(Error::InvalidTag(tag));
        }

        let envelope = self.next_from(source)?;

        #[cfg(feature = "debug")]
        tracing::trace!(
            from = source,
            to = self.rank,
            tag = envelope.tag,
            count = envelope.payload.len(),
            "recv"
        );

        if tag != ANY_TAG && envelope.tag != tag {
            return Err(Error::protocol(
                source,
                format!("expected tag {tag}, received tag {}", envelope.tag),
            ));
        }

        let values = datatype::unpack::<T>(&envelope.payload).ok_or_else(|| Error::DatatypeMismatch {
            peer: source,
            expected: T::TAG,
            found: envelope.payload.tag(),
        })?;
        if values.len() > data.len() {
            return Err(Error::InvalidCount(values.len() as i64));
        }
        data[..values.len()].copy_from_slice(values);

        Ok(Status {
            source,
            tag: envelope.tag,
            count: values.len() as i64,
        })
    }

    /// Send a single value to another worker.
    pub fn send_scalar<T: Datatype>(&self, value: T, dest: i32, tag: i32) -> Result<()> {
        self.send(std::slice::from_ref(&value), dest, tag)
    }

    /// Receive exactly one value from `source`.
    pub fn recv_scalar<T: Datatype>(&self, source: i32, tag: i32) -> Result<T> {
        let mut value = [T::default()];
        let status = self.recv(&mut value, source, tag)?;
        if status.count != 1 {
            return Err(Error::protocol(
                source,
                format!("expected one value, received {}", status.count),
            ));
        }
        Ok(value[0])
    }

    /// Next message from `source`, in the order `source` sent them.
    fn next_from(&self, source: i32) -> Result<Envelope> {
        if let Some(envelope) = self.take_early(source) {
            return Ok(envelope);
        }

        self.group.presence(source).waiters.push(self.rank);
        let outcome = self.wait_for(source);
        let mut presence = self.group.presence(source);
        if let Some(at) = presence.waiters.iter().position(|&r| r == self.rank) {
            presence.waiters.swap_remove(at);
        }
        outcome
    }

    /// Block on the inbox until `source` delivers or is known to have exited.
    ///
    /// Must be called while registered as a waiter on `source`, so that its
    /// departure wakes this rank up.
    fn wait_for(&self, source: i32) -> Result<Envelope> {
        loop {
            if self.group.presence(source).departed {
                // Everything `source` sent before leaving is already queued.
                for delivery in self.inbox.try_iter() {
                    if let Delivery::Message(envelope) = delivery {
                        self.hold(envelope);
                    }
                }
                return self.take_early(source).ok_or(Error::PeerDisconnected(source));
            }

            match self.inbox.recv() {
                Ok(Delivery::Message(envelope)) if envelope.source == source => return Ok(envelope),
                Ok(Delivery::Message(envelope)) => self.hold(envelope),
                Ok(Delivery::Departed(_)) => {}
                Err(_) => return Err(Error::PeerDisconnected(source)),
            }
        }
    }

    fn hold(&self, envelope: Envelope) {
        self.early
            .borrow_mut()
            .entry(envelope.source)
            .or_default()
            .push_back(envelope);
    }

    fn take_early(&self, source: i32) -> Option<Envelope> {
        self.early.borrow_mut().get_mut(&source)?.pop_front()
    }
}

impl Drop for Communicator {
    fn drop(&mut self) {
        let waiters = {
            let mut presence = self.group.presence(self.rank);
            presence.departed = true;
            std::mem::take(&mut presence.waiters)
        };
        for waiter in waiters {
            // The waiter may have exited as well.
            let _ = self.group.inboxes[waiter as usize].send(Delivery::Departed(self.rank));
        }
    }
}

impl std::fmt::Debug for Communicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Communicator")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
