//! Transport abstraction and the in-memory backend
//!
//! The protocol core only ever produces [`Packet`]s. Getting them onto the
//! wire is the job of a [`Transport`]. Writes are fire-and-forget; reading
//! a reply is an explicit, separate call for the few commands that need one.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::packet::Packet;
use crate::protocol::reply;
use crate::response::ResponseFrame;
use crate::types::CommandType;

/// The core transport trait - all backends implement this
///
/// Every packet is one atomic write. Implementations serialize concurrent
/// writers so two packets never interleave on the link.
pub trait Transport: Send + Sync {
    /// Write one complete frame
    fn write_packet(&self, packet: &Packet) -> Result<(), TransportError>;

    /// Wait up to `timeout` for the next reply frame.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. Write-only links
    /// never see replies.
    fn read_response(&self, _timeout: Duration) -> Result<Option<ResponseFrame>, TransportError> {
        Ok(None)
    }

    /// Human-readable description (port path, "memory", ...)
    fn description(&self) -> &str;

    /// Write `packet` and wait for the reply that answers it.
    ///
    /// Replies to other commands are skipped. An error reply becomes
    /// [`TransportError::Device`].
    fn query(&self, packet: &Packet, timeout: Duration) -> Result<ResponseFrame, TransportError> {
        self.write_packet(packet)?;
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout);
            }
            match self.read_response(remaining)? {
                Some(reply) if reply.answers(packet.command()) => {
                    if reply.is_error {
                        return Err(TransportError::Device(reply.status()));
                    }
                    return Ok(reply);
                }
                Some(other) => {
                    debug!(
                        "ignoring reply 0x{:02X} while waiting for {}",
                        other.raw_command,
                        packet.command()
                    );
                }
                None => return Err(TransportError::Timeout),
            }
        }
    }
}

/// In-memory transport
///
/// Records every written packet and hands back queued replies. Backs
/// `--dry-run` and the test suites.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    written: Mutex<Vec<Packet>>,
    replies: Mutex<VecDeque<ResponseFrame>>,
    /// Answer reads with a success frame for the last write
    auto_ack: bool,
    /// Last write not yet acknowledged, as `(address, command)`
    unacked: Mutex<Option<(u8, CommandType)>>,
    /// Keep no written log
    discard_writes: bool,
    fail_writes: Mutex<bool>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that acknowledges packets like the real chip does.
    ///
    /// The ack for the most recent write is built when it is read, so
    /// write-only traffic queues nothing.
    pub fn acknowledging() -> Self {
        Self {
            auto_ack: true,
            ..Self::default()
        }
    }

    /// Acknowledging transport that drops written packets instead of
    /// logging them, for sessions of unbounded length
    pub fn discarding() -> Self {
        Self {
            auto_ack: true,
            discard_writes: true,
            ..Self::default()
        }
    }

    /// Queue a reply to be returned by the next `read_response`
    pub fn push_reply(&self, reply: ResponseFrame) {
        self.replies.lock().push_back(reply);
    }

    /// Queue a raw reply frame; fails if the bytes don't parse
    pub fn push_reply_bytes(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let reply = ResponseFrame::parse(bytes)?;
        self.push_reply(reply);
        Ok(())
    }

    /// Make subsequent writes fail as if the link dropped
    pub fn set_disconnected(&self, disconnected: bool) {
        *self.fail_writes.lock() = disconnected;
    }

    /// Snapshot of everything written so far
    pub fn written(&self) -> Vec<Packet> {
        self.written.lock().clone()
    }

    /// Take and clear the written log
    pub fn take_written(&self) -> Vec<Packet> {
        std::mem::take(&mut *self.written.lock())
    }

    /// Written packets concatenated, as the far end of a serial link sees them
    pub fn written_bytes(&self) -> Vec<u8> {
        self.written
            .lock()
            .iter()
            .flat_map(|p| p.as_bytes().iter().copied())
            .collect()
    }

    /// Written packets of one command type
    pub fn written_of(&self, command: CommandType) -> Vec<Packet> {
        self.written
            .lock()
            .iter()
            .filter(|p| p.command() == command)
            .cloned()
            .collect()
    }
}

impl Transport for MemoryTransport {
    fn write_packet(&self, packet: &Packet) -> Result<(), TransportError> {
        if *self.fail_writes.lock() {
            return Err(TransportError::Disconnected);
        }
        trace!("memory write {}", packet);
        if !self.discard_writes {
            self.written.lock().push(packet.clone());
        }
        if self.auto_ack {
            *self.unacked.lock() = Some((packet.address(), packet.command()));
        }
        Ok(())
    }

    fn read_response(&self, _timeout: Duration) -> Result<Option<ResponseFrame>, TransportError> {
        if let Some(reply) = self.replies.lock().pop_front() {
            return Ok(Some(reply));
        }
        Ok(self
            .unacked
            .lock()
            .take()
            .map(|(address, command)| ResponseFrame {
                address,
                request: Some(command),
                raw_command: command.code() | reply::SUCCESS_FLAG,
                is_error: false,
                payload: vec![0x00],
            }))
    }

    fn description(&self) -> &str {
        "memory"
    }
}
