use lifecycle_forge::{ActivationSocketResolver, InitSystemDetector, ReadinessNotifier};
use signal_hook::consts::signal::*;
use signal_hook::flag;
use std::io::{self, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// Run directly:            cargo run --example startup
// Run socket-activated:    systemd-socket-activate -l 127.0.0.1:8080 target/debug/examples/startup
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_writer(io::stderr)
        .init();

    // 1. Choose the startup mode
    let detector = InitSystemDetector::new();
    let status = detector.status();
    tracing::info!(%status, "service manager queried");

    // 2. Prefer the inherited socket, bind our own otherwise
    let resolver = ActivationSocketResolver::new();
    let listener = match resolver.resolve_listener()? {
        Some(inherited) => inherited.into_tcp().ok_or("socket activation passed a non-TCP socket")?,
        None => TcpListener::bind("127.0.0.1:8080")?,
    };
    listener.set_nonblocking(true)?;
    tracing::info!(addr = %listener.local_addr()?, activated = resolver.is_socket_activated(), "listening");

    // 3. Startup finished
    let notifier = ReadinessNotifier::new();
    notifier.notify_ready();

    let term = Arc::new(AtomicBool::new(false));
    flag::register(SIGTERM, Arc::clone(&term))?; // systemctl stop
    flag::register(SIGINT, Arc::clone(&term))?; // Ctrl+C

    let mut served = 0u64;
    while !term.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((mut stream, peer)) => {
                served += 1;
                tracing::debug!(%peer, served, "connection");
                let _ = writeln!(stream, "hello #{served}");
                notifier.notify_status(&format!("served {served} connections"));
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(Duration::from_millis(100)),
            Err(e) => return Err(e.into()),
        }
    }

    notifier.notify_stopping();
    tracing::info!(served, "shutting down");
    Ok(())
}
