fn main() {
    let dotenv = dotenvy::dotenv();
    localchat::logging::init_tracing();
    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "ignoring unreadable .env"),
    }
    dioxus::launch(localchat::ui::App);
}
