use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tonic::transport::{Endpoint, Server};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dispatch_api::{gateway, observability, ApiMetrics, DeliveryGrpc, RpcPipeline};
use dispatch_config::Config;
use dispatch_core::{AssignmentRepository, AssignmentService};
use dispatch_proto::pb::delivery_service_client::DeliveryServiceClient;
use dispatch_proto::pb::delivery_service_server::DeliveryServiceServer;
use dispatch_store::{InMemoryRepository, PostgresRepository};

/// Budget for stopping the HTTP listeners after the RPC drain.
const HTTP_SHUTDOWN_BUDGET: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let config = Config::from_env().context("configuration")?;
    info!(
        grpc = %config.grpc_addr,
        http = %config.http_addr,
        metrics = %config.metrics_addr,
        "starting dispatchd"
    );

    // Startup is sequential: any failure here aborts with a non-zero exit.
    let repo: Arc<dyn AssignmentRepository> = if config.database_url == "memory://" {
        info!("using in-memory (ephemeral) repository; state is lost on exit");
        Arc::new(InMemoryRepository::new())
    } else {
        Arc::new(
            PostgresRepository::connect(&config.database_url)
                .await
                .context("storage")?,
        )
    };
    let service = Arc::new(AssignmentService::new(repo.clone()));
    let metrics = Arc::new(ApiMetrics::new().context("metrics registry")?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // RPC server. Health flips to SERVING only after the storage connect
    // above has succeeded.
    let grpc_service = DeliveryGrpc::new(service, RpcPipeline::new(metrics.clone()));
    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<DeliveryServiceServer<DeliveryGrpc>>()
        .await;

    let grpc_addr = config.grpc_addr;
    let mut grpc_shutdown = shutdown_rx.clone();
    let mut grpc_task = tokio::spawn(async move {
        Server::builder()
            .add_service(health_service)
            .add_service(DeliveryServiceServer::new(grpc_service))
            .serve_with_shutdown(grpc_addr, async move {
                let _ = grpc_shutdown.changed().await;
            })
            .await
    });

    // REST gateway, proxying every call to the local RPC listener.
    let channel = Endpoint::from_shared(format!("http://{}", loopback(config.grpc_addr)))
        .context("gateway endpoint")?
        .connect_lazy();
    let rest_listener = TcpListener::bind(config.http_addr)
        .await
        .context("bind http listener")?;
    let rest_router = gateway::router(DeliveryServiceClient::new(channel));
    let mut rest_shutdown = shutdown_rx.clone();
    let mut rest_task = tokio::spawn(async move {
        axum::serve(rest_listener, rest_router)
            .with_graceful_shutdown(async move {
                let _ = rest_shutdown.changed().await;
            })
            .await
    });

    // Metrics / health listener.
    let obs_listener = TcpListener::bind(config.metrics_addr)
        .await
        .context("bind metrics listener")?;
    let obs_router = observability::router(metrics, repo);
    let mut obs_shutdown = shutdown_rx.clone();
    let mut obs_task = tokio::spawn(async move {
        axum::serve(obs_listener, obs_router)
            .with_graceful_shutdown(async move {
                let _ = obs_shutdown.changed().await;
            })
            .await
    });

    wait_for_signal().await?;
    info!("shutdown signal received, draining");
    let _ = shutdown_tx.send(true);

    let mut failed = false;

    // Drain the RPC server within the configured budget, then force-close.
    match tokio::time::timeout(config.shutdown_timeout, &mut grpc_task).await {
        Ok(Ok(Ok(()))) => info!("grpc server stopped"),
        Ok(Ok(Err(e))) => {
            error!(error = %e, "grpc server error during drain");
            failed = true;
        }
        Ok(Err(e)) => {
            error!(error = %e, "grpc server task failed");
            failed = true;
        }
        Err(_) => {
            error!("grpc drain budget expired, force-closing");
            grpc_task.abort();
            failed = true;
        }
    }

    for (name, task) in [("http", &mut rest_task), ("metrics", &mut obs_task)] {
        match tokio::time::timeout(HTTP_SHUTDOWN_BUDGET, &mut *task).await {
            Ok(Ok(Ok(()))) => info!("{name} listener stopped"),
            Ok(Ok(Err(e))) => {
                error!(error = %e, "{name} listener error during shutdown");
                failed = true;
            }
            Ok(Err(e)) => {
                error!(error = %e, "{name} listener task failed");
                failed = true;
            }
            Err(_) => {
                error!("{name} listener shutdown budget expired");
                task.abort();
                failed = true;
            }
        }
    }

    // The storage pool is released when the last Arc drops on return.
    if failed {
        anyhow::bail!("shutdown completed with errors");
    }
    info!("shutdown complete");
    Ok(())
}

async fn wait_for_signal() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).context("install SIGINT handler")?;
    let mut sigterm = signal(SignalKind::terminate()).context("install SIGTERM handler")?;
    tokio::select! {
        _ = sigint.recv() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
    Ok(())
}

/// The gateway dials the RPC listener over loopback even when it binds
/// a wildcard address.
fn loopback(addr: SocketAddr) -> SocketAddr {
    let mut addr = addr;
    if addr.ip().is_unspecified() {
        addr.set_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    addr
}
