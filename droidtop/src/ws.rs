//! WebSocket transport to the collector: connect (optionally against a custom
//! CA), then pump decoded events in and encoded requests out on two tasks.

use std::io::{BufReader, Read};
use std::sync::Arc;

use flate2::read::GzDecoder;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::{
    connect_async, connect_async_tls_with_config, tungstenite::Message, Connector,
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, warn};
use url::Url;

use crate::types::{Inbound, Outbound};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("invalid collector url: {0}")]
    Url(#[from] url::ParseError),
    #[error("unsupported scheme '{0}', expected ws:// or wss://")]
    Scheme(String),
    #[error("failed to read CA bundle {path}: {source}")]
    CaFile {
        path: String,
        source: std::io::Error,
    },
    #[error("no certificates found in {0}")]
    EmptyCa(String),
    #[error("tls setup: {0}")]
    Tls(#[from] rustls::Error),
    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

pub fn parse_url(raw: &str) -> Result<Url, WsError> {
    let url = Url::parse(raw)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(WsError::Scheme(other.to_string())),
    }
}

fn load_roots(path: &str) -> Result<rustls::RootCertStore, WsError> {
    let file = std::fs::File::open(path).map_err(|source| WsError::CaFile {
        path: path.to_string(),
        source,
    })?;
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut BufReader::new(file)) {
        let cert = cert.map_err(|source| WsError::CaFile {
            path: path.to_string(),
            source,
        })?;
        roots.add(cert)?;
    }
    if roots.is_empty() {
        return Err(WsError::EmptyCa(path.to_string()));
    }
    Ok(roots)
}

fn tls_connector(tls_ca: Option<&str>) -> Result<Connector, WsError> {
    let roots = match tls_ca {
        Some(path) => load_roots(path)?,
        None => {
            warn!("wss:// without --tls-ca: no trust anchors configured, the handshake will fail for untrusted certs");
            rustls::RootCertStore::empty()
        }
    };
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let cfg = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Connector::Rustls(Arc::new(cfg)))
}

// Connect to the collector and return the WS stream
pub async fn connect(url: &str, tls_ca: Option<&str>) -> Result<WsStream, WsError> {
    let url = parse_url(url)?;
    let ws = if url.scheme() == "wss" {
        let connector = tls_connector(tls_ca)?;
        let (ws, _) =
            connect_async_tls_with_config(url.as_str(), None, false, Some(connector)).await?;
        ws
    } else {
        let (ws, _) = connect_async(url.as_str()).await?;
        ws
    };
    debug!(%url, "websocket established");
    Ok(ws)
}

/// Decode one text frame. Frames that don't parse are logged and dropped.
pub fn decode_text(json: &str) -> Option<Inbound> {
    match serde_json::from_str::<Inbound>(json) {
        Ok(ev) => Some(ev),
        Err(e) => {
            warn!(error = %e, len = json.len(), "dropping undecodable frame");
            None
        }
    }
}

/// Binary frames carry the same JSON, gzip-compressed.
pub fn decode_binary(bytes: &[u8]) -> Option<Inbound> {
    let mut json = String::new();
    match GzDecoder::new(bytes).read_to_string(&mut json) {
        Ok(_) => decode_text(&json),
        Err(e) => {
            warn!(error = %e, "dropping binary frame that isn't gzip JSON");
            None
        }
    }
}

pub fn encode(out: &Outbound) -> Result<String, serde_json::Error> {
    serde_json::to_string(out)
}

/// Split the socket into a reader task and a writer task.
///
/// The receiver yields `Connect` first and `Disconnect` once the stream ends,
/// with everything the collector sent in between in arrival order.
pub fn spawn_io(ws: WsStream) -> (UnboundedReceiver<Inbound>, UnboundedSender<Outbound>) {
    let (mut sink, mut stream) = ws.split();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<Inbound>();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();

    tokio::spawn(async move {
        let _ = in_tx.send(Inbound::Connect);
        while let Some(msg) = stream.next().await {
            let ev = match msg {
                Ok(Message::Text(json)) => decode_text(&json),
                Ok(Message::Binary(bytes)) => decode_binary(&bytes),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "collector closed the socket");
                    break;
                }
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, "websocket read failed");
                    break;
                }
            };
            if let Some(ev) = ev {
                if in_tx.send(ev).is_err() {
                    // UI is gone
                    return;
                }
            }
        }
        let _ = in_tx.send(Inbound::Disconnect);
    });

    tokio::spawn(async move {
        while let Some(out) = out_rx.recv().await {
            let js = match encode(&out) {
                Ok(js) => js,
                Err(e) => {
                    warn!(error = %e, "failed to encode request");
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(js)).await {
                warn!(error = %e, "websocket write failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    (in_rx, out_tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    #[test]
    fn rejects_non_ws_schemes() {
        assert!(matches!(
            parse_url("http://127.0.0.1:5000/ws"),
            Err(WsError::Scheme(s)) if s == "http"
        ));
        assert!(parse_url("wss://host:8443/ws").is_ok());
    }

    #[test]
    fn gzip_binary_frames_decode() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(br#"{"event":"status","data":{"message":"hi","type":"info"}}"#)
            .unwrap();
        let bytes = enc.finish().unwrap();
        assert!(matches!(decode_binary(&bytes), Some(Inbound::Status(s)) if s.message == "hi"));
    }

    #[test]
    fn garbage_is_dropped() {
        assert!(decode_text("not json").is_none());
        assert!(decode_binary(b"nope").is_none());
    }
}
