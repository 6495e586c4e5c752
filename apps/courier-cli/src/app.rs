//! Interactive session: connects, prints delivered envelopes and sends
//! typed lines until stdin closes or the user quits.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use courier_connection::{
    ConnectionEvent, ConnectionListener, ConnectionManager, Envelope, MessageListener,
    SendOutcome, SocketEndpoint, TokenSlot,
};

use crate::config::ClientConfig;
use crate::input::{self, Command};

pub async fn run(config: ClientConfig, token: Option<String>) -> anyhow::Result<()> {
    let endpoint = SocketEndpoint::from_origin(&config.origin, config.environment)?;
    tracing::info!(url = %endpoint.base_url(), "message socket");

    let credentials = Arc::new(TokenSlot::new(token));
    let manager = ConnectionManager::new(config.connection.clone(), endpoint, credentials.clone());

    let on_message: MessageListener = Arc::new(|envelope: &Envelope| match envelope.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "unprintable envelope"),
    });
    let on_change: ConnectionListener = Arc::new(|event: &ConnectionEvent| match event {
        ConnectionEvent::StateChanged(state) => tracing::info!(%state, "connection"),
        ConnectionEvent::Reconnecting { attempt, delay } => {
            tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "reconnecting")
        }
        ConnectionEvent::GaveUp { attempts } => {
            tracing::warn!(attempts, "gave up reconnecting; type /connect to retry")
        }
    });
    manager.on_message(on_message.clone());
    manager.on_connection_change(on_change.clone());

    if credentials.get().is_none() {
        tracing::warn!("no token configured; messages are queued until /token is used");
    }
    manager.connect();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match input::parse(&line) {
            Command::Empty => {}
            Command::Say { recipient, content } => {
                let envelope = input::chat_message(&content, recipient.or(config.recipient));
                report(manager.send_envelope(envelope));
            }
            Command::Raw(text) => report(manager.send_text(&text)),
            Command::Info => println!("{}", serde_json::to_string(&manager.connection_info())?),
            Command::Connect => manager.connect(),
            Command::Disconnect => manager.disconnect(),
            Command::Enable => manager.enable(),
            Command::Disable => manager.disable(),
            Command::ClearQueue => {
                let dropped = manager.clear_queue();
                eprintln!("dropped {dropped} queued message(s)");
            }
            Command::Token(token) => {
                if token.is_empty() {
                    credentials.clear();
                    manager.disconnect();
                } else {
                    credentials.set(token);
                    manager.connect();
                }
            }
            Command::Help => eprintln!("{}", input::HELP),
            Command::Unknown(name) => eprintln!("unknown command /{name}; try /help"),
            Command::Quit => break,
        }
    }

    manager.off_message(&on_message);
    manager.off_connection_change(&on_change);
    manager.disconnect();
    Ok(())
}

fn report(outcome: SendOutcome) {
    match outcome {
        SendOutcome::Sent => {}
        SendOutcome::Queued => eprintln!("(queued until connected)"),
        SendOutcome::Rejected => eprintln!("(not a message, nothing sent)"),
    }
}
