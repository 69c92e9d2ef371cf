//! TCP server that exposes a [`Segment`] over the [`protocol`](crate::protocol).
//!
//! This is the medium the network driver talks to. Each connection gets its
//! own task and may carry any number of requests.

use std::future::Future;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::protocol::{Request, Response};
use crate::segment::Segment;

/// Accept connections on `listener` until `shutdown` completes.
///
/// When `sweep_interval` is set, expired entries are purged on that period
/// in addition to the lazy expiry done on access.
pub async fn serve(
    listener: TcpListener,
    segment: Segment,
    sweep_interval: Option<Duration>,
    shutdown: impl Future<Output = ()>,
) -> std::io::Result<()> {
    let sweeper = sweep_interval.map(|period| {
        let segment = segment.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match segment.purge_expired() {
                    Ok(0) => {}
                    Ok(removed) => tracing::debug!(removed, "purged expired entries"),
                    Err(e) => tracing::warn!(error = %e, "expiry sweep failed"),
                }
            }
        })
    });

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("server shutting down");
                if let Some(sweeper) = sweeper {
                    sweeper.abort();
                }
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok((socket, addr)) => {
                    tracing::debug!(%addr, "accepted connection");
                    let segment = segment.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(socket, segment).await {
                            tracing::warn!(%addr, error = %e, "connection error");
                        }
                    });
                }
                Err(e) => tracing::warn!(error = %e, "failed to accept connection"),
            }
        }
    }
}

/// Serve requests from one client until it disconnects or sends garbage.
async fn handle_connection(mut socket: TcpStream, segment: Segment) -> std::io::Result<()> {
    let mut buf = BytesMut::with_capacity(4096);
    let mut out = BytesMut::with_capacity(1024);

    loop {
        match Request::parse(&mut buf) {
            Ok(Some(request)) => {
                let response = process_request(request, &segment);
                out.clear();
                response.encode(&mut out);
                socket.write_all(&out).await?;
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                // The stream position is lost; reply and drop the connection.
                out.clear();
                Response::Error(e.to_string()).encode(&mut out);
                socket.write_all(&out).await?;
                return Ok(());
            }
        }

        if socket.read_buf(&mut buf).await? == 0 {
            return Ok(());
        }
    }
}

/// Apply one request to the segment.
pub fn process_request(request: Request, segment: &Segment) -> Response {
    let result = match request {
        Request::Get { key } => segment.get(&key).map(|value| match value {
            Some(value) => Response::Value(value),
            None => Response::NotFound,
        }),
        Request::Set { key, ttl, value } => match ttl.as_duration() {
            Some(ttl) => segment.set_with_ttl(key, value, ttl),
            None => segment.set(key, value),
        }
        .map(|()| Response::Stored),
        Request::Delete { key } => segment.delete(&key).map(|existed| {
            if existed {
                Response::Deleted
            } else {
                Response::NotFound
            }
        }),
        Request::Ping => Ok(Response::Pong),
        Request::Stats => Ok(Response::Stats(
            segment
                .stats()
                .pairs()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )),
    };

    result.unwrap_or_else(|e| Response::Error(e.to_string()))
}
