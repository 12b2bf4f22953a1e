#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use ox_arena_server::config::{self, SERVICE_NAME};
use ox_arena_server::logging;
use ox_arena_server::server::{ArenaServer, ServerRole};
use ox_arena_server::{gateway, websocket};
use std::net::SocketAddr;

/// OX Arena -- authoritative realtime server for a multiplayer OX-quiz arena
#[derive(Parser, Debug)]
#[command(name = "ox-arena-server")]
#[command(about = "Authoritative realtime WebSocket server for a multiplayer OX-quiz arena")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,

    /// Run as the routing gateway instead of a room worker.
    #[arg(long)]
    gateway: bool,

    /// Override the listener port (takes precedence over PORT).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load();
    if let Some(port) = cli.port {
        cfg.port = port;
    }

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate_config(&cfg);
    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Role: {}", if cli.gateway { "gateway" } else { "worker" });
                println!("  Participant limit: {}", cfg.server.participant_limit);
                println!("  Room capacity: {}", cfg.server.room_capacity);
                println!("  Max active rooms: {}", cfg.server.max_active_rooms);
                println!("  Tick rate: {} Hz", cfg.server.tick_rate_hz);
                println!("  Owner key configured: {}", cfg.owner_key.is_some());
                println!(
                    "  Worker port pool: {:?}..={:?}",
                    cfg.gateway.worker_port_base, cfg.gateway.worker_port_max
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }
    validation_result.map_err(|e| anyhow::anyhow!("invalid configuration:\n{e}"))?;

    logging::init_with_config(&cfg.logging);

    let role = if cli.gateway {
        ServerRole::Gateway
    } else {
        ServerRole::Worker
    };
    let require_route_token = std::env::var(gateway::REQUIRE_ROUTE_TOKEN_ENV)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false);

    let port = cfg.port;
    let cors_origin = cfg.cors_origin.clone();
    let server = ArenaServer::with_role(cfg, role, require_route_token);

    // Gateways only route; the broadcast tick belongs to room workers.
    if role == ServerRole::Worker {
        let tick_server = server.clone();
        tokio::spawn(tick_server.run_tick_loop());
    }

    let app = websocket::create_router(&cors_origin).with_state(server.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            // A compatible instance already owning the port is not a fault.
            if probe_running_instance(port).await {
                return Ok(());
            }
            eprintln!("Failed to bind port {port}: {err}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        %addr,
        role = role.as_str(),
        cors_origin = %cors_origin,
        "Server started - WebSocket: /ws, Health: /health"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Probe `/health` on the contested port; true when a compatible instance of
/// this service answers.
async fn probe_running_instance(port: u16) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(2))
        .build()
    {
        Ok(client) => client,
        Err(_) => return false,
    };
    let url = format!("http://127.0.0.1:{port}/health");
    match client.get(&url).send().await {
        Ok(response) => match response.json::<serde_json::Value>().await {
            Ok(body) => body["service"] == SERVICE_NAME,
            Err(_) => false,
        },
        Err(_) => false,
    }
}
