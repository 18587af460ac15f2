use driftmesh::transport::{TcpEndpoint, TcpEndpointConfig};
use driftmesh::{MeshRelay, RelayConfig, RelayEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

/// Interactive mesh node: every stdin line becomes a message, relayed to
/// whichever peers come within reach.
///
/// Usage: driftmesh-node [bind_addr] [seed_addr ...]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let bind_addr: SocketAddr = if args.len() > 1 {
        args[1].parse()?
    } else {
        "0.0.0.0:8888".parse().unwrap()
    };
    let seeds = args[2..]
        .iter()
        .map(|s| s.parse())
        .collect::<Result<Vec<SocketAddr>, _>>()?;

    let (endpoint, discovery_events) = TcpEndpoint::new(TcpEndpointConfig {
        bind_addr,
        seeds,
        ..Default::default()
    });
    let endpoint = Arc::new(endpoint);
    let listen_addr = endpoint.listen().await?;

    let (relay, mut events) =
        MeshRelay::new(RelayConfig::default(), endpoint, discovery_events).await?;
    relay.start().await?;

    println!("node {} listening on {}", relay.node_id(), listen_addr);
    println!("type a line to send it into the mesh; ctrl-c to quit");

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                RelayEvent::MessageReceived(msg) => {
                    println!("[{}] {} (hops {})", msg.sender, msg.payload, msg.hops);
                }
                RelayEvent::PeerDiscovered(peer) => println!("peer up: {peer}"),
                RelayEvent::PeerLost(peer) => println!("peer gone: {peer}"),
            }
        }
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) if !line.trim().is_empty() => {
                        match relay.send(line.trim(), 0.0, 0.0, 5).await {
                            Ok(id) => println!("queued {id}"),
                            Err(e) => eprintln!("send failed: {e}"),
                        }
                    }
                    Some(_) => {}
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    relay.stop().await;
    Ok(())
}
