use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::broadcast;

use dealsync_crm::{ensure_custom_fields, CrmGateway, FieldReport, StartupError};

use crate::error::{io_err, ServerError};
use crate::routes::{router, AppState};

/// A gateway whose custom fields have been verified. The only way to get one
/// is [`initialize`].
pub struct Ready {
    gateway: Arc<dyn CrmGateway>,
    pub fields: FieldReport,
}

impl Ready {
    pub fn gateway(&self) -> &Arc<dyn CrmGateway> {
        &self.gateway
    }
}

/// Verify and repair the CRM custom fields. Must succeed before serving.
pub fn initialize(gateway: Arc<dyn CrmGateway>) -> Result<Ready, StartupError> {
    let fields = ensure_custom_fields(gateway.as_ref())?;
    if fields.is_clean() {
        tracing::info!("custom fields verified");
    } else {
        tracing::info!(
            changed = fields.changed(),
            failed = fields.failures().len(),
            "custom fields repaired"
        );
    }
    Ok(Ready { gateway, fields })
}

/// Start the server runtime and block the current thread until it exits.
pub fn start_blocking(ready: Ready, bind: &str) -> Result<(), ServerError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio runtime", e))?;
    runtime.block_on(run(ready, bind.to_owned()))
}

/// Bind `bind` and serve until Ctrl-C.
pub async fn run(ready: Ready, bind: String) -> Result<(), ServerError> {
    let listener = TcpListener::bind(&bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: bind.clone(),
            source,
        })?;
    let (shutdown_tx, _) = broadcast::channel::<()>(4);

    let server_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = serve(listener, ready, async move {
                let _ = shutdown_rx.recv().await;
            })
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(ServerError::Task(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (server_result, signal_result) = tokio::join!(server_handle, signal_handle);
    handle_join("http_server", server_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

/// Serve on an already bound listener until `shutdown` resolves, then drain
/// in-flight requests.
pub async fn serve<F>(listener: TcpListener, ready: Ready, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| io_err("listener address", e))?;
    tracing::info!(%addr, "accepting submissions");

    let app = router(AppState::new(ready.gateway));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| io_err("http server", e))?;

    tracing::info!("server stopped");
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), ServerError>, tokio::task::JoinError>,
) -> Result<(), ServerError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(ServerError::Task(format!("{task} task join failure: {err}"))),
    }
}

/// Install the fmt subscriber on stderr. `RUST_LOG` overrides the default
/// `info` filter; library crates logging through `log` are captured too.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dealsync_crm::{CrmOp, InMemoryCrm};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    use super::*;

    #[test]
    fn initialize_repairs_fields_before_serving() {
        let crm = Arc::new(InMemoryCrm::new());
        let ready = initialize(crm.clone()).expect("initialize");
        assert_eq!(ready.fields.changed(), 4);
        assert_eq!(crm.count(CrmOp::AddField), 4);
    }

    #[test]
    fn initialize_fails_when_fields_cannot_be_listed() {
        let crm = Arc::new(InMemoryCrm::new());
        crm.reject(CrmOp::ListFields);
        let err = initialize(crm).err().expect("startup error");
        assert!(matches!(err, StartupError::FieldListing(_)));
    }

    #[tokio::test]
    async fn serve_answers_health_and_stops_on_shutdown() {
        let ready = initialize(Arc::new(InMemoryCrm::provisioned())).expect("initialize");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(serve(listener, ready, async move {
            let _ = stop_rx.await;
        }));

        let mut stream = TcpStream::connect(addr).await.expect("connect");
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .expect("write");
        let mut response = String::new();
        stream.read_to_string(&mut response).await.expect("read");
        assert!(response.starts_with("HTTP/1.1 200"), "got: {response}");
        assert!(response.contains("\"status\":\"healthy\""));

        stop_tx.send(()).expect("stop");
        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server stops")
            .expect("join");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn run_reports_bind_failures() {
        let taken = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = taken.local_addr().expect("addr").to_string();
        let ready = initialize(Arc::new(InMemoryCrm::provisioned())).expect("initialize");

        let err = run(ready, addr.clone()).await.unwrap_err();
        match err {
            ServerError::Bind { addr: reported, .. } => assert_eq!(reported, addr),
            other => panic!("unexpected error: {other}"),
        }
    }
}
