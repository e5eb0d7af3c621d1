//! Line transports: a TCP listener with one task per connection, and a
//! single-session REPL on stdin/stdout.
//!
//! Input is framed on `\n` with any trailing `\r` stripped. A line longer than
//! the configured maximum is discarded up to its newline and reported, so a
//! client cannot make the server buffer unbounded input.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedReceiver;

use super::{Engine, TransportKind};

/// One framed input line.
#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    Text(String),
    TooLong,
    Eof,
}

/// Read one line of at most `max` bytes (excluding the terminator).
pub async fn read_line<R>(reader: &mut R, max: usize, buf: &mut Vec<u8>) -> io::Result<Line>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = max as u64 + 2;
    let n = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(Line::Eof);
    }
    if buf.last() != Some(&b'\n') && n as u64 == limit {
        let mut sink = Vec::new();
        loop {
            sink.clear();
            let m = (&mut *reader).take(4096).read_until(b'\n', &mut sink).await?;
            if m == 0 || sink.last() == Some(&b'\n') {
                break;
            }
        }
        return Ok(Line::TooLong);
    }
    while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
        buf.pop();
    }
    if buf.len() > max {
        return Ok(Line::TooLong);
    }
    Ok(Line::Text(String::from_utf8_lossy(buf).into_owned()))
}

/// Drain a session's outbox into `writer`, one `\r\n`-terminated block per message.
async fn pump_output<W>(mut outbox: UnboundedReceiver<String>, mut writer: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(text) = outbox.recv().await {
        let mut data = text.replace('\n', "\r\n");
        data.push_str("\r\n");
        if writer.write_all(data.as_bytes()).await.is_err() {
            break;
        }
        if writer.flush().await.is_err() {
            break;
        }
    }
}

/// Bind `addr` and serve until interrupted.
pub async fn serve(engine: Arc<Engine>, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    serve_listener(engine, listener).await
}

/// Accept connections on an already bound listener until Ctrl-C.
pub async fn serve_listener(engine: Arc<Engine>, listener: TcpListener) -> Result<()> {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let engine = engine.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(engine, stream, peer).await {
                                warn!("Connection {} ended with error: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => warn!("Accept failed: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }
    Ok(())
}

async fn handle_connection(engine: Arc<Engine>, stream: TcpStream, peer: SocketAddr) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let Some((mut console, outbox)) = engine.connect(TransportKind::Tcp) else {
        writer.write_all(b"The server is full. Try again later.\r\n").await?;
        return Ok(());
    };
    debug!("Peer {} is session {}", peer, console.id());
    let writer_task = tokio::spawn(pump_output(outbox, writer));

    let max = engine.config().server.max_line_length;
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let outcome = loop {
        match read_line(&mut reader, max, &mut buf).await {
            Ok(Line::Text(text)) => {
                engine.execute(&mut console, &text);
            }
            Ok(Line::TooLong) => {
                console.send(format!("Input too long (maximum {} characters).", max));
            }
            Ok(Line::Eof) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    engine.disconnect(&mut console);
    drop(console);
    let _ = writer_task.await;
    info!("Connection from {} closed", peer);
    outcome.map_err(Into::into)
}

/// Single-occupant console on stdin/stdout. Returns at end of input.
pub async fn run_repl(engine: Arc<Engine>) -> Result<()> {
    let Some((mut console, outbox)) = engine.connect(TransportKind::Repl) else {
        anyhow::bail!("no session slot available for the console");
    };
    let writer_task = tokio::spawn(pump_output(outbox, tokio::io::stdout()));

    let max = engine.config().server.max_line_length;
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut buf = Vec::new();
    loop {
        match read_line(&mut reader, max, &mut buf).await? {
            Line::Text(text) => {
                engine.execute(&mut console, &text);
            }
            Line::TooLong => console.send(format!("Input too long (maximum {} characters).", max)),
            Line::Eof => break,
        }
    }

    engine.disconnect(&mut console);
    drop(console);
    let _ = writer_task.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn lines(input: &[u8], max: usize) -> Vec<Line> {
        let mut reader = BufReader::new(input);
        let mut buf = Vec::new();
        let mut out = Vec::new();
        loop {
            let line = read_line(&mut reader, max, &mut buf).await.expect("read");
            let done = line == Line::Eof;
            out.push(line);
            if done {
                return out;
            }
        }
    }

    #[tokio::test]
    async fn frames_on_newline_and_strips_carriage_return() {
        let got = lines(b"look\r\nsay hi\nlast", 64).await;
        assert_eq!(
            got,
            vec![
                Line::Text("look".into()),
                Line::Text("say hi".into()),
                Line::Text("last".into()),
                Line::Eof,
            ]
        );
    }

    #[tokio::test]
    async fn overlong_line_is_skipped_whole() {
        let mut input = vec![b'x'; 40];
        input.extend_from_slice(b"\nwho\n");
        let got = lines(&input, 10).await;
        assert_eq!(got, vec![Line::TooLong, Line::Text("who".into()), Line::Eof]);
    }
}
