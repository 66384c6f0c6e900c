use axum::Router;
use axum::response::Response;
use error_stack::{Report, ResultExt};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{Span, info};

pub const PORT_VAR: &str = "ENTITY_APP_PORT";
const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppProperties {
    pub port: u16,
}

impl Default for AppProperties {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl AppProperties {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Properties from any key/value source. Missing keys fall back to defaults,
    /// values that don't parse are an error.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(PORT_VAR) {
            Some(raw) => raw
                .trim()
                .parse()
                .change_context(AppError)
                .attach_with(|| format!("{PORT_VAR} '{raw}' is not a valid port"))?,
            None => DEFAULT_PORT,
        };
        Ok(Self { port })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("the app exited with an error")]
pub struct AppError;

pub type AppResult<T> = Result<T, Report<AppError>>;

pub async fn run(routes: Router, properties: AppProperties) -> AppResult<()> {
    let listener = build_listener(properties.port).await?;

    let routes = routes.layer(ServiceBuilder::new().layer(
        TraceLayer::new_for_http().on_response(
            |res: &Response, latency: Duration, _span: &Span| {
                info!("returned {} in {}ms", res.status(), latency.as_millis());
            },
        ),
    ));

    info!(
        "starting up entity service on port {}",
        listener.local_addr().change_context(AppError)?.port()
    );

    axum::serve(listener, routes).await.change_context(AppError)
}

async fn build_listener(port: u16) -> AppResult<TcpListener> {
    TcpListener::bind(std::net::SocketAddr::V4(SocketAddrV4::new(
        Ipv4Addr::UNSPECIFIED,
        port,
    )))
    .await
    .change_context(AppError)
    .attach_with(|| format!("could not bind port {port}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_port_uses_default() {
        assert_eq!(AppProperties::default(), AppProperties::from_lookup(|_| None).unwrap());
    }

    #[test]
    fn port_is_read() {
        let props = AppProperties::from_lookup(|key| (key == PORT_VAR).then(|| "8080".into()));
        assert_eq!(8080, props.unwrap().port);
    }

    #[test]
    fn unparsable_port_is_an_error() {
        assert!(AppProperties::from_lookup(|_| Some("http".into())).is_err());
        assert!(AppProperties::from_lookup(|_| Some("70000".into())).is_err());
    }
}
