//! Gremlin session over a persistent WebSocket
//!
//! One `GremlinSession` owns one connection. Authentication happens lazily:
//! the server challenges the first request with `407` and the session
//! answers with SASL PLAIN credentials built from the target.

use crate::protocol::{self, status, ResponseMessage};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use gex_core::{
    ConnectionError, GraphSession, GremlinTarget, Query, ResultSet, ServiceError, SubmitError,
    TransportError,
};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Live connection to a Gremlin endpoint for one collection
pub struct GremlinSession {
    target: GremlinTarget,
    stream: Option<WsStream>,
}

impl GremlinSession {
    /// Connect to the endpoint described by `target`
    pub async fn open(target: GremlinTarget) -> Result<Self, ConnectionError> {
        crate::install_crypto_provider();

        let endpoint = target.url();
        let connect = tokio_tungstenite::connect_async(endpoint.as_str());
        let (stream, response) = tokio::time::timeout(target.connect_timeout, connect)
            .await
            .map_err(|_| ConnectionError::Timeout {
                endpoint: endpoint.clone(),
                timeout: target.connect_timeout,
            })?
            .map_err(|e| ConnectionError::Handshake {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;

        tracing::info!(
            endpoint = %endpoint,
            identity = %target.credential_identity(),
            status = %response.status(),
            "Gremlin session opened"
        );

        Ok(Self {
            target,
            stream: Some(stream),
        })
    }

    /// Target this session is connected to
    pub fn target(&self) -> &GremlinTarget {
        &self.target
    }
}

#[async_trait]
impl GraphSession for GremlinSession {
    async fn submit(&mut self, query: &Query) -> Result<ResultSet, SubmitError> {
        let stream = self.stream.as_mut().ok_or(SubmitError::UseAfterClose)?;

        let size = query.as_str().len();
        if size > self.target.max_query_bytes {
            return Err(ServiceError::client_side(format!(
                "Query is {size} bytes, limit is {}",
                self.target.max_query_bytes
            ))
            .into());
        }

        let request_id = Uuid::new_v4();
        let frame = protocol::eval_request(request_id, query.as_str())
            .map_err(|e| ServiceError::client_side(format!("Failed to encode request: {e}")))?;

        tracing::debug!(%request_id, "Submitting query");
        let timeout = self.target.request_timeout;
        match tokio::time::timeout(timeout, exchange(stream, &self.target, request_id, frame)).await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(timeout).into()),
        }
    }

    async fn close(&mut self) -> Result<(), SubmitError> {
        let mut stream = self.stream.take().ok_or(SubmitError::UseAfterClose)?;
        if let Err(e) = stream.close(None).await {
            tracing::debug!("Close handshake failed: {}", e);
        }
        tracing::info!(identity = %self.target.credential_identity(), "Gremlin session closed");
        Ok(())
    }
}

/// Send one request and collect every frame of its response
async fn exchange(
    stream: &mut WsStream,
    target: &GremlinTarget,
    request_id: Uuid,
    frame: Vec<u8>,
) -> Result<ResultSet, SubmitError> {
    stream
        .send(Message::Binary(frame))
        .await
        .map_err(socket_error)?;

    let mut rows = Vec::new();
    let mut authenticated = false;

    loop {
        let response = next_response(stream).await?;
        match response.request_id() {
            Some(id) if id == request_id => {}
            // The server could not read the request, so it could not echo its id
            None if !(200..300).contains(&response.status.code) => {}
            _ => {
                // Left over from a cancelled request
                tracing::debug!(expected = %request_id, "Discarding stale response frame");
                continue;
            }
        }

        match response.status.code {
            status::SUCCESS | status::NO_CONTENT => {
                let attributes = response.attributes();
                rows.extend(response.into_rows());
                return Ok(ResultSet { rows, attributes });
            }
            status::PARTIAL_CONTENT => rows.extend(response.into_rows()),
            status::AUTHENTICATE if !authenticated => {
                tracing::debug!(identity = %target.credential_identity(), "Answering SASL challenge");
                let auth = protocol::authentication_request(
                    request_id,
                    &target.credential_identity(),
                    &target.secret,
                )
                .map_err(|e| ServiceError::client_side(format!("Failed to encode credentials: {e}")))?;
                stream
                    .send(Message::Binary(auth))
                    .await
                    .map_err(socket_error)?;
                authenticated = true;
            }
            code => {
                return Err(ServiceError::new(code, response.message())
                    .with_attributes(response.attributes())
                    .into());
            }
        }
    }
}

async fn next_response(stream: &mut WsStream) -> Result<ResponseMessage, TransportError> {
    loop {
        match stream.next().await {
            None | Some(Ok(Message::Close(_))) => return Err(TransportError::Closed),
            Some(Err(e)) => return Err(socket_error(e)),
            Some(Ok(Message::Text(text))) => return protocol::decode_response(text.as_bytes()),
            Some(Ok(Message::Binary(bytes))) => return protocol::decode_response(&bytes),
            Some(Ok(_)) => continue,
        }
    }
}

fn socket_error(error: tungstenite::Error) -> TransportError {
    match error {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed
        }
        other => TransportError::Socket(other.to_string()),
    }
}
