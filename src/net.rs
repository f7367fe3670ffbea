use crate::lines;
use crate::state::State;
use std::net::SocketAddr;
use std::process;
use tokio::io::{self, AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Size of the buffer reads are made into.  Lines may span several reads.
const READ_BUFFER_SIZE: usize = 1024;

/// Returns a future that listens, accepts and handles incoming connections.
///
/// Exits the process if the address cannot be bound, since the server must not run without all
/// of its listening sockets.
pub async fn listen(addr: SocketAddr, shared: State) {
    let ln = TcpListener::bind(addr).await.unwrap_or_else(|err| {
        log::error!("Failed to listen to {}: {}", addr, err);
        process::exit(1);
    });

    log::info!("Listening on {}...", addr);

    loop {
        match ln.accept().await {
            Ok((conn, peer_addr)) => { tokio::spawn(handle(conn, peer_addr, shared.clone())); }
            Err(err) => { log::warn!("Failed to accept connection: {}", err); }
        }
    }
}

/// Returns a future that handles a client connection.
///
/// The connection is closed when the peer closes it, when reading or writing fails, or when the
/// client sends QUIT.  In the last case the queue is flushed before the socket is dropped.
async fn handle(conn: TcpStream, peer_addr: SocketAddr, shared: State) {
    let (mut reader, mut writer) = conn.into_split();
    let (msg_queue, mut outgoing_msgs) = mpsc::unbounded_channel();
    let id = shared.peer_joined(peer_addr, msg_queue).await;

    let incoming = async {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, lines::CONNECTION_CLOSED));
            }
            if !shared.handle_input(id, &buf[..n]).await {
                return Ok(());
            }
        }
    };

    let outgoing = async {
        while let Some(msg) = outgoing_msgs.recv().await {
            let text: &str = msg.as_ref();
            log::trace!("{} << {}", id, text.trim_end());
            writer.write_all(text.as_bytes()).await?;
        }
        // The sending half has been dropped along with the client.
        Ok::<_, io::Error>(())
    };

    tokio::pin!(incoming);
    tokio::pin!(outgoing);

    // `incoming` is polled first: once it has seen the client quit, the ID may be given to
    // another connection and must not be passed to `peer_quit`.
    tokio::select! {
        biased;
        res = &mut incoming => match res {
            Ok(()) => {
                if let Err(err) = outgoing.await {
                    log::debug!("{}: Failed to flush: {}", id, err);
                }
            }
            Err(err) => shared.peer_quit(id, Some(err)).await,
        },
        res = &mut outgoing => {
            if let Err(err) = res {
                shared.peer_quit(id, Some(err)).await;
            }
        }
    }
}
