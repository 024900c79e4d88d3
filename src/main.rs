//! Demo network: a validator plus peers over in-process transports.
//!
//! Starts one validator node and two normal nodes wired together, a client
//! task that gossips a transaction every couple of seconds, and a
//! late-joining node that comes up after the chain has grown (exercising the
//! status handshake). Ctrl-C shuts everything down.

use solochain::core::transaction::Transaction;
use solochain::crypto::key_pair::PrivateKey;
use solochain::network::local_transport::LocalTransport;
use solochain::network::message::{Message, MessageType};
use solochain::network::server::{Server, ServerOpts};
use solochain::network::transport::Transport;
use solochain::types::encoding::Encode;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Payload of the demo transaction: push 3, push 'F', 'O', 'O', pack.
const DEMO_PROGRAM: [u8; 9] = [0x03, 0x0a, 0x46, 0x0c, 0x4f, 0x0c, 0x4f, 0x0c, 0x0d];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let local = LocalTransport::new("LOCAL");
    let remote_a = LocalTransport::new("REMOTE_A");
    let remote_b = LocalTransport::new("REMOTE_B");
    let late = LocalTransport::new("LATE_NODE");

    let transports: Vec<Arc<dyn Transport>> = vec![
        Arc::clone(&local) as Arc<dyn Transport>,
        Arc::clone(&remote_a) as Arc<dyn Transport>,
        Arc::clone(&remote_b) as Arc<dyn Transport>,
    ];

    // Normal peers.
    for (id, transport) in [("REMOTE_A", &remote_a), ("REMOTE_B", &remote_b)] {
        let server = make_server(id, Arc::clone(transport), transports.clone(), None);
        tokio::spawn(server.start());
    }

    // A node that joins well after the chain has started growing.
    {
        let mut transports = transports.clone();
        transports.push(Arc::clone(&late) as Arc<dyn Transport>);
        tokio::spawn(async move {
            sleep(Duration::from_secs(7)).await;
            info!("starting late node");
            let server = make_server("LATE_NODE", late, transports, None);
            server.start().await;
        });
    }

    // A client gossiping a transaction into the network every two seconds.
    {
        let client = LocalTransport::new("CLIENT");
        client
            .connect(&(Arc::clone(&local) as Arc<dyn Transport>))
            .expect("client connect");
        tokio::spawn(async move {
            loop {
                if let Err(err) = send_transaction(&client, "LOCAL").await {
                    error!(error = %err, "could not send transaction");
                }
                sleep(Duration::from_secs(2)).await;
            }
        });
    }

    // The validator, on the main task.
    let validator = make_server(
        "LOCAL",
        local,
        transports,
        Some(PrivateKey::generate()),
    );
    let quit = validator.quit_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            let _ = quit.send(()).await;
        }
    });

    validator.start().await;
}

fn make_server(
    id: &str,
    transport: Arc<LocalTransport>,
    transports: Vec<Arc<dyn Transport>>,
    private_key: Option<PrivateKey>,
) -> Server {
    Server::new(ServerOpts {
        id: id.to_string(),
        transport: transport as Arc<dyn Transport>,
        transports,
        private_key,
        block_time: Duration::ZERO,
        pool_capacity: 0,
    })
}

/// Signs a fresh transaction carrying the demo program and sends it to `to`.
async fn send_transaction(
    client: &Arc<LocalTransport>,
    to: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut tx = Transaction::new(DEMO_PROGRAM.to_vec());
    tx.sign(&PrivateKey::generate())?;

    let msg = Message::new(MessageType::Tx, tx.to_bytes());
    client.send_message(to.to_string(), msg.to_bytes()).await?;
    Ok(())
}
