//! `tokio-tungstenite` realtime channel.
//!
//! Each `connect` spawns one local task that owns the socket. The handshake
//! happens inside the task, so `connect` itself never blocks and never emits.

use client::net::channel::{
    ChannelConnector, ChannelError, ChannelEvent, ChannelSink, Outbound, RealtimeChannel, outbound_queue,
};
use futures::channel::mpsc::UnboundedReceiver;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::debug;

#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

impl ChannelConnector for WsConnector {
    fn connect(&self, url: &str, sink: ChannelSink) -> Result<Box<dyn RealtimeChannel>, ChannelError> {
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ChannelError::Connect(format!("not a websocket url: {url}")));
        }
        let (channel, outbound) = outbound_queue();
        tokio::task::spawn_local(run_socket(url.to_owned(), outbound, sink));
        Ok(Box::new(channel))
    }
}

async fn run_socket(url: String, mut outbound: UnboundedReceiver<Outbound>, sink: ChannelSink) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(error) => {
            sink.emit(ChannelEvent::Failed(error.to_string()));
            return;
        }
    };
    sink.emit(ChannelEvent::Opened);
    let (mut write, mut read) = stream.split();

    let send_task = async {
        while let Some(item) = outbound.next().await {
            match item {
                Outbound::Text(text) => {
                    if let Err(error) = write.send(Message::text(text)).await {
                        return ChannelEvent::Failed(error.to_string());
                    }
                }
                Outbound::Close => break,
            }
        }
        let _ = write.close().await;
        ChannelEvent::Closed
    };

    let recv_task = async {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    sink.emit(ChannelEvent::Text(text.as_str().to_owned()));
                }
                Ok(Message::Close(_)) | Err(WsError::ConnectionClosed) => return ChannelEvent::Closed,
                Ok(_) => {}
                Err(error) => return ChannelEvent::Failed(error.to_string()),
            }
        }
        ChannelEvent::Closed
    };

    let terminal = tokio::select! {
        event = send_task => event,
        event = recv_task => event,
    };
    debug!(generation = sink.generation(), ?terminal, "chat socket task finished");
    sink.emit(terminal);
}
