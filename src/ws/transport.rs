//! Frame-level transport seam.
//!
//! The connection task only sees [`Frame`]s through a boxed sink/stream pair.
//! [`TungsteniteConnector`] produces that pair from a real socket; tests plug
//! in an in-memory [`Connector`].

use crate::error::WsError;
use futures_util::future::{self, BoxFuture};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::pin::Pin;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// Close code + reason carried by a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    pub fn normal(reason: impl Into<String>) -> Self {
        Self {
            code: 1000,
            reason: reason.into(),
        }
    }
}

/// One WebSocket frame, independent of the socket library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(Option<CloseInfo>),
}

pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = WsError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, WsError>> + Send>>;

/// An open socket, split into its write and read halves.
pub struct Connection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Connection {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Opens sockets for the connection task.
pub trait Connector: Send + Sync + 'static {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Connection, WsError>>;
}

// ─── tokio-tungstenite ───────────────────────────────────────────────────────

/// Default connector over `tokio-tungstenite` (TLS via native-tls).
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Connection, WsError>> {
        Box::pin(async move {
            let (ws_stream, _) = connect_async(url).await?;
            let (sink, stream) = ws_stream.split();

            let sink = sink
                .sink_map_err(WsError::from)
                .with(|frame: Frame| future::ready(Ok::<_, WsError>(Message::from(frame))));
            let stream = stream.filter_map(|msg| {
                future::ready(match msg {
                    Ok(msg) => frame_from_message(msg).map(Ok),
                    Err(e) => Some(Err(WsError::from(e))),
                })
            });

            Ok(Connection::new(Box::pin(sink), Box::pin(stream)))
        })
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(data) => Message::Binary(data.into()),
            Frame::Ping(data) => Message::Ping(data.into()),
            Frame::Pong(data) => Message::Pong(data.into()),
            Frame::Close(info) => Message::Close(info.map(|info| CloseFrame {
                code: CloseCode::from(info.code),
                reason: info.reason.into(),
            })),
        }
    }
}

/// Raw `Message::Frame` values never surface from a read, so they map to `None`.
fn frame_from_message(msg: Message) -> Option<Frame> {
    match msg {
        Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
        Message::Binary(data) => Some(Frame::Binary(data.to_vec())),
        Message::Ping(data) => Some(Frame::Ping(data.to_vec())),
        Message::Pong(data) => Some(Frame::Pong(data.to_vec())),
        Message::Close(frame) => Some(Frame::Close(frame.map(|f| CloseInfo {
            code: f.code.into(),
            reason: f.reason.as_str().to_owned(),
        }))),
        Message::Frame(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_frame_conversion() {
        let msg = Message::from(Frame::Close(Some(CloseInfo::normal("bye"))));
        match msg {
            Message::Close(Some(frame)) => {
                assert_eq!(frame.code, CloseCode::Normal);
                assert_eq!(frame.reason.as_str(), "bye");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_message_to_frame() {
        assert_eq!(
            frame_from_message(Message::Text("hi".into())),
            Some(Frame::Text("hi".into()))
        );
        assert_eq!(
            frame_from_message(Message::Ping(vec![1u8, 2].into())),
            Some(Frame::Ping(vec![1, 2]))
        );
        assert_eq!(
            frame_from_message(Message::Close(Some(CloseFrame {
                code: CloseCode::Away,
                reason: "restart".into(),
            }))),
            Some(Frame::Close(Some(CloseInfo {
                code: 1001,
                reason: "restart".into(),
            })))
        );
        assert_eq!(frame_from_message(Message::Close(None)), Some(Frame::Close(None)));
    }
}
