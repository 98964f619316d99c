//! Remote line sessions over TCP.
//!
//! Each accepted connection gets its own task and its own [`Session`]
//! cloned from a template, so `.use` and `.mode` stay per connection while
//! connections and variables are shared.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use stax_core::Session;

use crate::commands::{self, CommandResult};

/// Prompt written before every remote command.
const REMOTE_PROMPT: &[u8] = b"\n~> ";

/// Accepts remote line sessions.
pub struct LineServer {
    listener: TcpListener,
    template: Session,
}

impl LineServer {
    /// Binds the listener.
    pub async fn bind(addr: &str, template: Session) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Listening for remote sessions on {}", listener.local_addr()?);
        Ok(Self { listener, template })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves connections until `shutdown` completes.
    pub async fn serve(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!("Accepted remote session from {}", addr);
                            let session = self.template.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(session, stream).await {
                                    warn!("Remote session {} ended with error: {}", addr, e);
                                }
                                debug!("Remote session {} closed", addr);
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("Remote listener shutting down");
                    break;
                }
            }
        }
    }
}

/// Runs one remote session: prompt, read a line, dispatch, write the
/// response, until `.quit` or end of input.
async fn handle_connection(mut session: Session, stream: TcpStream) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        writer.write_all(REMOTE_PROMPT).await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match commands::dispatch(&mut session, &line).await {
            CommandResult::Exit => break,
            CommandResult::Output(text) => {
                writer.write_all(text.as_bytes()).await?;
                if !text.ends_with('\n') {
                    writer.write_all(b"\n").await?;
                }
            }
            CommandResult::Continue => {}
        }
    }

    writer.shutdown().await
}
