use tokio_util::sync::CancellationToken;

/// Detects Ctrl-C. The first one cancels the running session so it can still be logged, any
/// later one exits right away.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    while tokio::signal::ctrl_c().await.is_ok() {
        if cancelation.is_cancelled() {
            std::process::exit(130);
        }
        cancelation.cancel();
    }
}

/// Returns a token cancelled by the first Ctrl-C.
pub fn listen_for_shutdown() -> CancellationToken {
    let token = CancellationToken::new();
    tokio::spawn(detect_shutdown(token.clone()));
    token
}
