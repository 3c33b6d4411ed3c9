//! Client-side transport: resolve, connect with a bounded timeout, perform
//! the handshake, then exchange newline-delimited frames.

use log::{debug, info};
use shared::{Direction, Frame, FrameBuffer};
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpStream};
use tokio::time::{timeout, Duration};

/// Bound on how long a connect attempt may take.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Result of a completed handshake.
#[derive(Debug, Clone, Copy)]
pub struct Handshake {
    pub agent_id: u32,
    pub world_size: f32,
}

/// Resolves `host` to a socket address, preferring IPv4, falling back to
/// parsing the host as a literal IP address.
async fn resolve(host: &str, port: u16) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    if let Ok(addrs) = lookup_host((host, port)).await {
        let addrs: Vec<SocketAddr> = addrs.collect();
        if let Some(v4) = addrs.iter().find(|a| a.is_ipv4()) {
            return Ok(*v4);
        }
        if let Some(first) = addrs.first() {
            return Ok(*first);
        }
    }
    let ip: IpAddr = host
        .parse()
        .map_err(|_| format!("no usable address for host {}", host))?;
    Ok(SocketAddr::new(ip, port))
}

/// A connected but not yet split client connection.
pub struct Connection {
    stream: TcpStream,
    buffer: FrameBuffer,
    read_buf: [u8; 2048],
}

impl Connection {
    /// Connects within `limit`. Name resolution and the TCP connect share
    /// one deadline, so a slow resolver or an unreachable host completes
    /// with an error once the bound elapses, never blocking the caller
    /// beyond it.
    pub async fn connect(
        host: &str,
        port: u16,
        limit: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let attempt = async {
            let addr = resolve(host, port).await?;
            info!("Connecting to {}", addr);
            Ok::<TcpStream, Box<dyn std::error::Error>>(TcpStream::connect(addr).await?)
        };
        let stream = match timeout(limit, attempt).await {
            Ok(connected) => connected?,
            Err(_) => return Err(format!("connection to {}:{} timed out", host, port).into()),
        };
        Ok(Self {
            stream,
            buffer: FrameBuffer::new(),
            read_buf: [0u8; 2048],
        })
    }

    /// Sends the name line and reads the `<agentId>\n<worldSize>\n` header.
    /// Obstacle frames follow on the regular frame stream.
    pub async fn join(&mut self, name: &str) -> Result<Handshake, Box<dyn std::error::Error>> {
        self.stream
            .write_all(format!("{}\n", name).as_bytes())
            .await?;
        let agent_id: u32 = self.read_line().await?.trim().parse()?;
        let world_size: f32 = self.read_line().await?.trim().parse()?;
        Ok(Handshake {
            agent_id,
            world_size,
        })
    }

    async fn read_line(&mut self) -> Result<String, Box<dyn std::error::Error>> {
        loop {
            if let Some(line) = self.buffer.next_line() {
                return Ok(line);
            }
            let n = self.stream.read(&mut self.read_buf).await?;
            if n == 0 {
                return Err("connection closed during handshake".into());
            }
            self.buffer.extend(&self.read_buf[..n]);
        }
    }

    /// Splits into independent reader and writer halves so receiving and
    /// steering can proceed concurrently. Buffered bytes move to the reader.
    pub fn into_split(self) -> (FrameReader, FrameWriter) {
        let (read_half, write_half) = self.stream.into_split();
        (
            FrameReader {
                read_half,
                buffer: self.buffer,
                read_buf: self.read_buf,
            },
            FrameWriter { write_half },
        )
    }
}

/// Receiving half: accumulates bytes and hands out complete frames.
pub struct FrameReader {
    read_half: OwnedReadHalf,
    buffer: FrameBuffer,
    read_buf: [u8; 2048],
}

impl FrameReader {
    /// Awaits the next non-empty batch of frames. `Ok(None)` on clean EOF.
    pub async fn recv_frames(&mut self) -> Result<Option<Vec<Frame>>, std::io::Error> {
        let ready = self.buffer.drain_frames();
        if !ready.is_empty() {
            return Ok(Some(ready));
        }
        loop {
            let n = self.read_half.read(&mut self.read_buf).await?;
            if n == 0 {
                debug!("Server closed the stream");
                return Ok(None);
            }
            self.buffer.extend(&self.read_buf[..n]);
            let frames = self.buffer.drain_frames();
            if !frames.is_empty() {
                return Ok(Some(frames));
            }
        }
    }
}

/// Sending half.
pub struct FrameWriter {
    write_half: OwnedWriteHalf,
}

impl FrameWriter {
    pub async fn send_command(
        &mut self,
        direction: Direction,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let line = Frame::Command { direction }.encode()?;
        self.write_half.write_all(line.as_bytes()).await?;
        Ok(())
    }
}
