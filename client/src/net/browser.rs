//! Browser websocket connector built on `gloo-net`.
//!
//! Each `connect` spawns one local task that owns the socket: it waits for the
//! handshake, reports `Opened`, then pumps outbound frames and inbound text
//! until either side finishes. The task reports exactly one terminal event.

use futures::channel::mpsc::UnboundedReceiver;
use futures::{SinkExt, StreamExt};
use gloo_net::websocket::futures::WebSocket;
use gloo_net::websocket::{Message, State, WebSocketError};

use super::channel::{
    ChannelConnector, ChannelError, ChannelEvent, ChannelSink, Outbound, RealtimeChannel, announce_when_open,
    outbound_queue,
};

#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserConnector;

impl ChannelConnector for BrowserConnector {
    fn connect(&self, url: &str, sink: ChannelSink) -> Result<Box<dyn RealtimeChannel>, ChannelError> {
        let ws = WebSocket::open(url).map_err(|e| ChannelError::Connect(e.to_string()))?;
        let (channel, outbound) = outbound_queue();
        wasm_bindgen_futures::spawn_local(run_socket(ws, outbound, sink));
        Ok(Box::new(channel))
    }
}

async fn run_socket(mut ws: WebSocket, mut outbound: UnboundedReceiver<Outbound>, sink: ChannelSink) {
    if !announce_when_open::<_, Message>(&mut ws, |ws: &WebSocket| matches!(ws.state(), State::Open), &sink).await {
        return;
    }
    let (mut write, mut read) = ws.split();

    let send_task = async {
        while let Some(item) = outbound.next().await {
            match item {
                Outbound::Text(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        return ChannelEvent::Failed(e.to_string());
                    }
                }
                Outbound::Close => break,
            }
        }
        let _ = write.close().await;
        ChannelEvent::Closed
    };

    let recv_task = async {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    sink.emit(ChannelEvent::Text(text));
                }
                Ok(Message::Bytes(_)) => {}
                Err(WebSocketError::ConnectionClose(event)) if event.was_clean => return ChannelEvent::Closed,
                Err(e) => return ChannelEvent::Failed(e.to_string()),
            }
        }
        ChannelEvent::Closed
    };

    let terminal = match futures::future::select(Box::pin(send_task), Box::pin(recv_task)).await {
        futures::future::Either::Left((event, _)) | futures::future::Either::Right((event, _)) => event,
    };
    tracing::debug!(generation = sink.generation(), ?terminal, "chat socket task finished");
    sink.emit(terminal);
}
