//! Pub/sub fan-out for the multiplexed exec stream.
//!
//! One bidirectional stream per client carries the traffic of every
//! container process. The forwarder opens the stream lazily on first
//! use, pumps inbound frames into per-process mailboxes keyed by
//! process id, and serializes outbound frames through a single sender.

use crate::error::{GatewayError, Result};
use gangway_api::bridge::{exec_message, ExecMessage};
use gangway_api::LlbBridgeClient;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tonic::transport::Channel;
use tonic::Code;
use tracing::debug;

/// Outbound queue depth; sends beyond it apply backpressure.
const OUTBOUND_BUFFER: usize = 8;

/// Outcome of a mailbox receive.
pub(crate) enum Received {
    Msg(ExecMessage),
    /// The supervising context was cancelled. Not terminal: the reader
    /// should begin an orderly shutdown rather than treat this as the
    /// end of the stream.
    Cancelled,
    /// The mailbox was closed; no message will ever arrive again.
    Closed,
}

/// A per-process message queue fed by the inbound pump.
///
/// One slot, one done latch. After `close`, `recv` reports `Closed`
/// forever and `send` drops silently.
pub(crate) struct Mailbox {
    done: CancellationToken,
    tx: Mutex<Option<mpsc::Sender<ExecMessage>>>,
    rx: tokio::sync::Mutex<mpsc::Receiver<ExecMessage>>,
}

impl Mailbox {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            done: CancellationToken::new(),
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Deliver one message, unless `cancel` fires first or the mailbox
    /// is already done. Observing done closes the slot.
    pub(crate) async fn send(&self, cancel: &CancellationToken, msg: ExecMessage) {
        let tx = self.tx.lock().unwrap().clone();
        let Some(tx) = tx else { return };
        tokio::select! {
            biased;
            _ = self.done.cancelled() => {
                self.tx.lock().unwrap().take();
            }
            _ = cancel.cancelled() => {}
            res = tx.send(msg) => {
                let _ = res;
            }
        }
    }

    pub(crate) async fn recv(&self, cancel: &CancellationToken) -> Received {
        let mut rx = self.rx.lock().await;
        tokio::select! {
            biased;
            _ = self.done.cancelled() => Received::Closed,
            _ = cancel.cancelled() => Received::Cancelled,
            msg = rx.recv() => match msg {
                Some(m) => Received::Msg(m),
                None => Received::Closed,
            }
        }
    }

    /// Mark done, drain the slot so a blocked producer can finish, and
    /// close it.
    async fn close(&self) {
        self.done.cancel();
        let _ = self.rx.lock().await.try_recv();
        self.tx.lock().unwrap().take();
    }
}

#[derive(Default)]
struct StartState {
    started: bool,
    // kept so every Start after a failed one reports the same error
    start_err: Option<String>,
    pump: Option<JoinHandle<Result<()>>>,
}

/// Manages the single exec stream and the mailbox registry.
pub(crate) struct MessageForwarder {
    bridge: LlbBridgeClient<Channel>,
    cancel: CancellationToken,
    mailboxes: Arc<Mutex<HashMap<String, Arc<Mailbox>>>>,
    outbound: Mutex<Option<mpsc::Sender<ExecMessage>>>,
    state: tokio::sync::Mutex<StartState>,
}

impl MessageForwarder {
    pub(crate) fn new(bridge: LlbBridgeClient<Channel>) -> Self {
        Self {
            bridge,
            cancel: CancellationToken::new(),
            mailboxes: Arc::new(Mutex::new(HashMap::new())),
            outbound: Mutex::new(None),
            state: tokio::sync::Mutex::new(StartState::default()),
        }
    }

    /// Open the stream and spawn the inbound pump. Idempotent; a failed
    /// first start is permanent and returned to every later caller.
    pub(crate) async fn start(&self) -> Result<()> {
        let mut st = self.state.lock().await;
        if let Some(reason) = &st.start_err {
            return Err(GatewayError::ExecStream { reason: reason.clone() });
        }
        if st.started {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let stream = match self.bridge.clone().exec_process(ReceiverStream::new(rx)).await {
            Ok(resp) => resp.into_inner(),
            Err(status) => {
                st.start_err = Some(status.to_string());
                return Err(status.into());
            }
        };
        self.install(&mut st, tx, stream);
        Ok(())
    }

    fn install<S>(&self, st: &mut StartState, tx: mpsc::Sender<ExecMessage>, stream: S)
    where
        S: Stream<Item = std::result::Result<ExecMessage, tonic::Status>> + Send + Unpin + 'static,
    {
        *self.outbound.lock().unwrap() = Some(tx);
        st.pump = Some(tokio::spawn(pump(stream, self.cancel.clone(), self.mailboxes.clone())));
        st.started = true;
    }

    /// Wire the forwarder to a caller-supplied stream pair instead of
    /// dialing, so the pump can be driven by a scripted peer.
    #[cfg(test)]
    pub(crate) async fn start_scripted<S>(&self, tx: mpsc::Sender<ExecMessage>, stream: S)
    where
        S: Stream<Item = std::result::Result<ExecMessage, tonic::Status>> + Send + Unpin + 'static,
    {
        let mut st = self.state.lock().await;
        self.install(&mut st, tx, stream);
    }

    /// Send one outbound frame. Fails when the addressed process is no
    /// longer registered or the stream is gone.
    pub(crate) async fn send(&self, msg: ExecMessage) -> Result<()> {
        if !self.mailboxes.lock().unwrap().contains_key(&msg.process_id) {
            return Err(GatewayError::Protocol {
                reason: format!("process {} has ended, not sending message", msg.process_id),
            });
        }
        debug!("|---> {}", describe(&msg));
        let tx = self.outbound.lock().unwrap().clone();
        let Some(tx) = tx else {
            return Err(GatewayError::ExecStream { reason: "exec stream is not started".to_string() });
        };
        tx.send(msg)
            .await
            .map_err(|_| GatewayError::ExecStream { reason: "exec stream closed".to_string() })
    }

    pub(crate) fn register(&self, pid: &str) -> Arc<Mailbox> {
        let mb = Arc::new(Mailbox::new());
        self.mailboxes.lock().unwrap().insert(pid.to_string(), mb.clone());
        mb
    }

    /// Remove the mailbox atomically, then close it so a send already in
    /// flight from the pump observes done and drops.
    pub(crate) async fn deregister(&self, pid: &str) {
        let mb = self.mailboxes.lock().unwrap().remove(pid);
        if let Some(mb) = mb {
            mb.close().await;
        }
    }

    /// Cancel the supervising context and join the pump, surfacing any
    /// error it terminated with.
    pub(crate) async fn release(&self) -> Result<()> {
        self.cancel.cancel();
        let pump = self.state.lock().await.pump.take();
        match pump {
            Some(handle) => match handle.await {
                Ok(res) => res,
                Err(e) => {
                    Err(GatewayError::ExecStream { reason: format!("exec pump failed: {e}") })
                }
            },
            None => Ok(()),
        }
    }

    /// A child token that fires when the forwarder is released.
    pub(crate) fn child_cancellation(&self) -> CancellationToken {
        self.cancel.child_token()
    }
}

/// Inbound pump: routes every frame to the mailbox registered for its
/// process id. A frame for an unknown process is dropped, not fatal.
/// EOF and peer cancellation are a graceful end; anything else is an
/// error surfaced from release.
async fn pump<S>(
    mut stream: S,
    cancel: CancellationToken,
    mailboxes: Arc<Mutex<HashMap<String, Arc<Mailbox>>>>,
) -> Result<()>
where
    S: Stream<Item = std::result::Result<ExecMessage, tonic::Status>> + Unpin,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            next = stream.next() => next,
        };
        let msg = match next {
            Some(Ok(msg)) => msg,
            None => return Ok(()),
            Some(Err(status)) if status.code() == Code::Cancelled => return Ok(()),
            Some(Err(status)) => return Err(status.into()),
        };
        debug!("|<--- {}", describe(&msg));

        let mailbox = mailboxes.lock().unwrap().get(&msg.process_id).cloned();
        match mailbox {
            Some(mb) => mb.send(&cancel, msg).await,
            None => {
                debug!("received exec message for unregistered process {}", msg.process_id);
            }
        }
    }
}

fn describe(msg: &ExecMessage) -> String {
    use exec_message::Input;
    match &msg.input {
        Some(Input::Init(_)) => format!("Init Message {}", msg.process_id),
        Some(Input::File(f)) if f.eof => {
            format!("File Message {}, fd={}, EOF", msg.process_id, f.fd)
        }
        Some(Input::File(f)) => {
            format!("File Message {}, fd={}, {} bytes", msg.process_id, f.fd, f.data.len())
        }
        Some(Input::Resize(_)) => format!("Resize Message {}", msg.process_id),
        Some(Input::Signal(s)) => format!("Signal Message {}: {}", msg.process_id, s.name),
        Some(Input::Started(_)) => format!("Started Message {}", msg.process_id),
        Some(Input::Exit(e)) => format!("Exit Message {}, code={}", msg.process_id, e.code),
        Some(Input::Done(_)) => format!("Done Message {}", msg.process_id),
        None => format!("Unknown Message {}", msg.process_id),
    }
}
