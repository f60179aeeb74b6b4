//! Interactive container processes inside the daemon.
//!
//! Containers are created over the ordinary RPC surface, but all
//! process I/O runs over the single multiplexed exec stream:
//!
//! ```text
//! ┌───────────────────┐    exec stream     ┌──────────────────┐
//! │ frontend (client) │ ──────────────────►│ daemon           │
//! │                   │                    │                  │
//! │  Container        │  Init/File/Resize/ │  container       │
//! │  ├─ start()       │  Signal        ───►│  ├─ spawn        │
//! │  ContainerProcess │◄─── Started/File/  │  └─ relay I/O    │
//! │  ├─ wait()        │     Exit/Done      │                  │
//! │  └─ signal()      │                    │                  │
//! └───────────────────┘                    └──────────────────┘
//! ```
//!
//! Per process, three things cooperate around one latched `done` token:
//! the stdin copier (caller reader → fd-0 frames), the event loop
//! (inbound frames → writers / exit state) and the waiter. `done` is
//! latched at most once and always before `wait` returns.

pub(crate) mod forwarder;

use crate::caps::frontend;
use crate::client::GatewayClient;
use crate::error::{GatewayError, Result};
use crate::exec::forwarder::{MessageForwarder, Received};
use crate::signal;
use crate::types::{StartRequest, WinSize};
use gangway_api::bridge::{
    self, exec_message::Input, ExecMessage, FdMessage, UNKNOWN_EXIT_STATUS,
};
use gangway_api::ops;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Fresh opaque id for containers and processes.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn file_message(pid: &str, fd: u32, data: Vec<u8>, eof: bool) -> ExecMessage {
    ExecMessage {
        process_id: pid.to_string(),
        input: Some(Input::File(FdMessage { fd, eof, data })),
    }
}

fn payload_name(input: &Option<Input>) -> &'static str {
    match input {
        Some(Input::Init(_)) => "init",
        Some(Input::File(_)) => "file",
        Some(Input::Resize(_)) => "resize",
        Some(Input::Signal(_)) => "signal",
        Some(Input::Started(_)) => "started",
        Some(Input::Exit(_)) => "exit",
        Some(Input::Done(_)) => "done",
        None => "empty",
    }
}

/// A container created inside the daemon, ready to run processes.
pub struct Container {
    pub(crate) id: String,
    pub(crate) client: GatewayClient,
}

impl Container {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Start a process in the container.
    ///
    /// Sends the Init frame, waits for the daemon's Started frame, then
    /// launches the per-process tasks. Any other first frame is a
    /// protocol error.
    pub async fn start(&self, mut req: StartRequest) -> Result<ContainerProcess> {
        if !req.secret_env.is_empty() {
            self.client.caps().supports(frontend::GATEWAY_EXEC_SECRET_ENV)?;
        }

        let pid = format!("{}:{}", self.id, new_id());
        let fw = self.client.forwarder();
        let mailbox = fw.register(&pid);

        let mut fds = Vec::new();
        if req.stdin.is_some() {
            fds.push(0);
        }
        if req.stdout.is_some() {
            fds.push(1);
        }
        if req.stderr.is_some() {
            fds.push(2);
        }

        let init = bridge::InitMessage {
            container_id: self.id.clone(),
            meta: Some(ops::Meta {
                args: req.args.clone(),
                env: req.env.clone(),
                cwd: req.cwd.clone(),
                user: req.user.clone(),
                remove_mount_stubs_recursive: req.remove_mount_stubs_recursive,
                ..Default::default()
            }),
            fds,
            tty: req.tty,
            security: req.security_mode,
            secretenv: req.secret_env.clone(),
        };
        fw.send(ExecMessage { process_id: pid.clone(), input: Some(Input::Init(init)) }).await?;

        let cancel = fw.child_cancellation();
        match mailbox.recv(&cancel).await {
            Received::Msg(msg) => match msg.input {
                Some(Input::Started(_)) => {}
                other => {
                    return Err(GatewayError::Protocol {
                        reason: format!("expecting started message, got {}", payload_name(&other)),
                    })
                }
            },
            _ => {
                return Err(GatewayError::Protocol {
                    reason: "failed to receive started message".to_string(),
                })
            }
        }

        let done = CancellationToken::new();
        let mut handles: Vec<JoinHandle<Result<()>>> = Vec::new();

        // event loop: routes output frames, captures the exit status,
        // latches done on exit or cancellation
        {
            let mailbox = mailbox.clone();
            let cancel = cancel.clone();
            let done = done.clone();
            let pid = pid.clone();
            let mut stdout = req.stdout.take();
            let mut stderr = req.stderr.take();
            handles.push(tokio::spawn(async move {
                let mut exit_error: Option<GatewayError> = None;
                let res = loop {
                    match mailbox.recv(&cancel).await {
                        Received::Closed => {
                            // no more messages
                            break exit_error.map_or(Ok(()), Err);
                        }
                        Received::Cancelled => {
                            break Err(GatewayError::Canceled);
                        }
                        Received::Msg(msg) => match msg.input {
                            Some(Input::File(file)) => {
                                let out = match file.fd {
                                    1 => stdout.as_mut(),
                                    2 => stderr.as_mut(),
                                    _ => None,
                                };
                                let Some(out) = out else {
                                    // if things are plumbed correctly this should never happen
                                    break Err(GatewayError::Protocol {
                                        reason: format!(
                                            "missing writer for output fd {}",
                                            file.fd
                                        ),
                                    });
                                };
                                if !file.data.is_empty() {
                                    if let Err(e) = out.write_all(&file.data).await {
                                        break Err(e.into());
                                    }
                                }
                            }
                            Some(Input::Exit(exit)) => {
                                // keep the exit status until the daemon says Done
                                done.cancel();
                                if exit.code == 0 {
                                    continue;
                                }
                                let status = exit.error.unwrap_or_default();
                                let inner = GatewayError::RemoteStatus {
                                    code: status.code,
                                    message: status.message,
                                };
                                exit_error = Some(if exit.code == UNKNOWN_EXIT_STATUS {
                                    inner
                                } else {
                                    GatewayError::Exit { code: exit.code, inner: Box::new(inner) }
                                });
                            }
                            Some(Input::Done(_)) => {
                                break exit_error.map_or(Ok(()), Err);
                            }
                            other => {
                                break Err(GatewayError::Protocol {
                                    reason: format!(
                                        "unexpected exec message for process {}: {}",
                                        pid,
                                        payload_name(&other)
                                    ),
                                });
                            }
                        },
                    }
                };
                // done is latched before wait can observe the task's end
                done.cancel();
                if res.is_err() {
                    cancel.cancel();
                }
                res
            }));
        }

        if let Some(mut stdin) = req.stdin.take() {
            // copier: caller reader → fd-0 frames, with a final EOF
            // frame on a clean end or on shutdown. The pending read is
            // dropped when done fires, so a blocking caller stdin can
            // never hang wait.
            let fw = fw.clone();
            let cancel = cancel.clone();
            let done = done.clone();
            let pid = pid.clone();
            handles.push(tokio::spawn(async move {
                let mut buf = vec![0u8; 32 * 1024];
                let res = async {
                    loop {
                        let n = tokio::select! {
                            biased;
                            _ = done.cancelled() => break,
                            r = stdin.read(&mut buf) => match r {
                                Ok(0) => break,
                                Ok(n) => n,
                                // a torn-down pipe is EOF for our purposes
                                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => break,
                                Err(e) => return Err(GatewayError::from(e)),
                            },
                        };
                        fw.send(file_message(&pid, 0, buf[..n].to_vec(), false)).await?;
                    }
                    fw.send(file_message(&pid, 0, Vec::new(), true)).await
                }
                .await;
                if res.is_err() {
                    cancel.cancel();
                }
                res
            }));
        }

        Ok(ContainerProcess { id: pid, client: self.client.clone(), handles })
    }

    /// Release the container in the daemon. Does not wait on exec state.
    pub async fn release(&self) -> Result<()> {
        debug!("|---> ReleaseContainer {}", self.id);
        let req = bridge::ReleaseContainerRequest { container_id: self.id.clone() };
        self.client.bridge().release_container(req).await?;
        Ok(())
    }
}

/// A process running inside a [`Container`].
#[derive(Debug)]
pub struct ContainerProcess {
    id: String,
    client: GatewayClient,
    handles: Vec<JoinHandle<Result<()>>>,
}

impl ContainerProcess {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the process to finish, then deregister its mailbox.
    ///
    /// Returns the first meaningful task error; a bare cancellation is
    /// reported only when nothing better is known.
    pub async fn wait(mut self) -> Result<()> {
        let mut first_err: Option<GatewayError> = None;
        let mut cancelled = false;
        for handle in self.handles.drain(..) {
            let res = match handle.await {
                Ok(res) => res,
                Err(e) => Err(GatewayError::ExecStream { reason: format!("exec task failed: {e}") }),
            };
            match res {
                Ok(()) => {}
                Err(GatewayError::Canceled) => cancelled = true,
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        self.client.forwarder().deregister(&self.id).await;
        match first_err {
            Some(e) => Err(e),
            None if cancelled => Err(GatewayError::Canceled),
            None => Ok(()),
        }
    }

    /// Resize the process's terminal.
    pub async fn resize(&self, size: WinSize) -> Result<()> {
        self.forwarder()
            .send(ExecMessage {
                process_id: self.id.clone(),
                input: Some(Input::Resize(bridge::ResizeMessage {
                    rows: size.rows,
                    cols: size.cols,
                })),
            })
            .await
    }

    /// Deliver a signal by its numeric identifier.
    pub async fn signal(&self, sig: i32) -> Result<()> {
        let name = signal::name_for(sig).ok_or(GatewayError::UnknownSignal { signal: sig })?;
        self.forwarder()
            .send(ExecMessage {
                process_id: self.id.clone(),
                input: Some(Input::Signal(bridge::SignalMessage { name: name.to_string() })),
            })
            .await
    }

    fn forwarder(&self) -> Arc<MessageForwarder> {
        self.client.forwarder()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::{frontend, CapSet};
    use crate::client::test_client;
    use gangway_api::bridge::{
        ApiCap, DoneMessage, ExitMessage, RpcStatus, StartedMessage,
    };
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};
    use tokio::io::AsyncWrite;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;

    type PeerTx = mpsc::Sender<std::result::Result<ExecMessage, tonic::Status>>;

    /// Captures written bytes for assertions.
    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl CaptureWriter {
        fn contents(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }
    }

    impl AsyncWrite for CaptureWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn exec_caps() -> CapSet {
        CapSet::from_list(&[
            ApiCap { id: frontend::GATEWAY_EXEC.to_string(), enabled: true },
            ApiCap { id: frontend::GATEWAY_EXEC_SECRET_ENV.to_string(), enabled: true },
        ])
    }

    async fn scripted_container() -> (Container, PeerTx, mpsc::Receiver<ExecMessage>) {
        let client = test_client(exec_caps(), CapSet::default());
        let (peer_tx, peer_rx) = mpsc::channel(16);
        let (out_tx, out_rx) = mpsc::channel(16);
        client.forwarder().start_scripted(out_tx, ReceiverStream::new(peer_rx)).await;
        let container = Container { id: "c1".to_string(), client };
        (container, peer_tx, out_rx)
    }

    fn msg(pid: &str, input: Input) -> ExecMessage {
        ExecMessage { process_id: pid.to_string(), input: Some(input) }
    }

    /// Reads the Init frame, replies Started, consumes stdin frames
    /// until their EOF, then plays back the given frames and stops.
    fn script_server(
        mut out_rx: mpsc::Receiver<ExecMessage>,
        peer_tx: PeerTx,
        playback: Vec<Input>,
    ) -> tokio::task::JoinHandle<Vec<u8>> {
        tokio::spawn(async move {
            let init = out_rx.recv().await.expect("init frame");
            let pid = init.process_id.clone();
            assert!(matches!(init.input, Some(Input::Init(_))));
            peer_tx.send(Ok(msg(&pid, Input::Started(StartedMessage {})))).await.unwrap();

            let mut stdin = Vec::new();
            let has_stdin = match &init.input {
                Some(Input::Init(i)) => i.fds.contains(&0),
                _ => false,
            };
            if has_stdin {
                loop {
                    let frame = out_rx.recv().await.expect("stdin frame");
                    match frame.input {
                        Some(Input::File(f)) => {
                            if f.eof {
                                break;
                            }
                            stdin.extend_from_slice(&f.data);
                        }
                        other => panic!("unexpected client frame: {:?}", payload_name(&other)),
                    }
                }
            }

            for input in playback {
                peer_tx.send(Ok(msg(&pid, input))).await.unwrap();
            }
            stdin
        })
    }

    #[tokio::test]
    async fn test_exec_happy_path() {
        let (container, peer_tx, out_rx) = scripted_container().await;

        let server = script_server(
            out_rx,
            peer_tx,
            vec![
                Input::File(FdMessage { fd: 1, eof: false, data: b"ok".to_vec() }),
                Input::Exit(ExitMessage { code: 0, error: None }),
                Input::Done(DoneMessage {}),
            ],
        );

        let stdout = CaptureWriter::default();
        let proc = container
            .start(StartRequest {
                args: vec!["/bin/sh".to_string()],
                stdin: Some(Box::new(std::io::Cursor::new(b"hi\n".to_vec()))),
                stdout: Some(Box::new(stdout.clone())),
                stderr: Some(Box::new(CaptureWriter::default())),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(proc.wait().await.is_ok());
        assert_eq!(stdout.contents(), b"ok");
        assert_eq!(server.await.unwrap(), b"hi\n");
    }

    #[tokio::test]
    async fn test_exec_nonzero_exit() {
        let (container, peer_tx, out_rx) = scripted_container().await;

        let server = script_server(
            out_rx,
            peer_tx,
            vec![
                Input::File(FdMessage { fd: 2, eof: false, data: b"bad".to_vec() }),
                Input::Exit(ExitMessage {
                    code: 3,
                    error: Some(RpcStatus { code: 2, message: "m".to_string(), details: vec![] }),
                }),
                Input::Done(DoneMessage {}),
            ],
        );

        let stderr = CaptureWriter::default();
        let proc = container
            .start(StartRequest {
                stdout: Some(Box::new(CaptureWriter::default())),
                stderr: Some(Box::new(stderr.clone())),
                ..Default::default()
            })
            .await
            .unwrap();

        let err = proc.wait().await.unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
        match &err {
            GatewayError::Exit { inner, .. } => assert_eq!(inner.to_string(), "m"),
            other => panic!("expected exit error, got {other}"),
        }
        assert_eq!(stderr.contents(), b"bad");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_exec_unknown_exit_status_skips_wrapper() {
        let (container, peer_tx, out_rx) = scripted_container().await;

        let server = script_server(
            out_rx,
            peer_tx,
            vec![
                Input::Exit(ExitMessage {
                    code: UNKNOWN_EXIT_STATUS,
                    error: Some(RpcStatus { code: 2, message: "m".to_string(), details: vec![] }),
                }),
                Input::Done(DoneMessage {}),
            ],
        );

        let proc = container
            .start(StartRequest {
                stdout: Some(Box::new(CaptureWriter::default())),
                ..Default::default()
            })
            .await
            .unwrap();

        let err = proc.wait().await.unwrap_err();
        assert_eq!(err.exit_code(), None);
        assert!(matches!(err, GatewayError::RemoteStatus { code: 2, .. }));
        assert_eq!(err.to_string(), "m");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_exec_output_to_missing_writer_fails() {
        let (container, peer_tx, out_rx) = scripted_container().await;

        let server = script_server(
            out_rx,
            peer_tx,
            vec![Input::File(FdMessage { fd: 2, eof: false, data: b"boo".to_vec() })],
        );

        // stderr deliberately not supplied
        let proc = container
            .start(StartRequest {
                stdout: Some(Box::new(CaptureWriter::default())),
                ..Default::default()
            })
            .await
            .unwrap();

        let err = proc.wait().await.unwrap_err();
        assert!(err.to_string().contains("missing writer"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_exec_unexpected_first_message() {
        let (container, peer_tx, mut out_rx) = scripted_container().await;

        tokio::spawn(async move {
            let init = out_rx.recv().await.expect("init frame");
            let pid = init.process_id.clone();
            peer_tx.send(Ok(msg(&pid, Input::Done(DoneMessage {})))).await.unwrap();
        });

        let err = container.start(StartRequest::default()).await.unwrap_err();
        assert!(err.to_string().contains("expecting started message"));
    }

    #[tokio::test]
    async fn test_secret_env_requires_capability() {
        let client = test_client(
            CapSet::from_list(&[ApiCap {
                id: frontend::GATEWAY_EXEC.to_string(),
                enabled: true,
            }]),
            CapSet::default(),
        );
        let container = Container { id: "c1".to_string(), client };

        let err = container
            .start(StartRequest {
                secret_env: vec![ops::SecretEnv {
                    id: "token".to_string(),
                    name: "TOKEN".to_string(),
                    optional: false,
                }],
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_missing_capability(frontend::GATEWAY_EXEC_SECRET_ENV));
    }

    #[tokio::test]
    async fn test_resize_and_signal_frames() {
        let (container, peer_tx, mut out_rx) = scripted_container().await;

        let peer = peer_tx.clone();
        tokio::spawn(async move {
            let init = out_rx.recv().await.expect("init frame");
            let pid = init.process_id.clone();
            peer.send(Ok(msg(&pid, Input::Started(StartedMessage {})))).await.unwrap();

            // resize frame
            match out_rx.recv().await.unwrap().input {
                Some(Input::Resize(r)) => {
                    assert_eq!((r.rows, r.cols), (24, 80));
                }
                other => panic!("expected resize, got {}", payload_name(&other)),
            }
            // signal frame
            match out_rx.recv().await.unwrap().input {
                Some(Input::Signal(s)) => assert_eq!(s.name, "TERM"),
                other => panic!("expected signal, got {}", payload_name(&other)),
            }

            peer.send(Ok(msg(&pid, Input::Exit(ExitMessage { code: 0, error: None }))))
                .await
                .unwrap();
            peer.send(Ok(msg(&pid, Input::Done(DoneMessage {})))).await.unwrap();
        });

        let proc = container
            .start(StartRequest {
                stdout: Some(Box::new(CaptureWriter::default())),
                ..Default::default()
            })
            .await
            .unwrap();

        proc.resize(WinSize { rows: 24, cols: 80 }).await.unwrap();
        proc.signal(15).await.unwrap();
        assert!(matches!(
            proc.signal(0).await.unwrap_err(),
            GatewayError::UnknownSignal { signal: 0 }
        ));
        assert!(proc.wait().await.is_ok());
    }
}
