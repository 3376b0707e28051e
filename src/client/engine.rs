use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use hyper::client::HttpConnector;
use log::debug;
use tokio::sync::Semaphore;

use crate::{pool::ConnectionPoolSettings, RequestBody};

#[cfg(feature = "rustls-tls")]
type Connector = hyper_rustls::HttpsConnector<HttpConnector>;
#[cfg(not(feature = "rustls-tls"))]
type Connector = HttpConnector;

pub(crate) type HyperClient = hyper::Client<Connector, RequestBody>;

/// The engine handle a client is bound to.
///
/// Hands out the hyper client for each exchange together with the semaphore
/// bounding the exchanges in flight.
pub(crate) struct Engine {
    generations: Generations,
    permits: Arc<Semaphore>,
}

enum Generations {
    Fixed(HyperClient),
    Rotating {
        lifetime: Duration,
        settings: ConnectionPoolSettings,
        current: Mutex<Generation>,
    },
}

struct Generation {
    hyper: HyperClient,
    born: Instant,
    number: u64,
}

impl Engine {
    pub(crate) fn new(settings: &ConnectionPoolSettings) -> Engine {
        let generations = match settings.max_connection_lifetime() {
            None => Generations::Fixed(build_hyper(settings)),
            Some(lifetime) => Generations::Rotating {
                lifetime,
                settings: settings.clone(),
                current: Mutex::new(Generation {
                    hyper: build_hyper(settings),
                    born: Instant::now(),
                    number: 0,
                }),
            },
        };

        Engine {
            generations,
            permits: Arc::new(Semaphore::new(settings.max_connections())),
        }
    }

    /// Returns the hyper client new exchanges go through.
    ///
    /// With a bounded lifetime, a client older than the lifetime is retired
    /// first. Its idle connections close once the exchanges still running on
    /// it complete.
    pub(crate) fn checkout(&self) -> HyperClient {
        match self.generations {
            Generations::Fixed(ref hyper) => hyper.clone(),
            Generations::Rotating {
                lifetime,
                ref settings,
                ref current,
            } => {
                let mut current = current.lock().unwrap_or_else(PoisonError::into_inner);
                if current.born.elapsed() >= lifetime {
                    debug!(
                        "retiring connection generation {} after {:?}",
                        current.number, lifetime
                    );
                    *current = Generation {
                        hyper: build_hyper(settings),
                        born: Instant::now(),
                        number: current.number + 1,
                    };
                }
                current.hyper.clone()
            }
        }
    }

    pub(crate) fn permits(&self) -> &Arc<Semaphore> {
        &self.permits
    }
}

fn build_hyper(settings: &ConnectionPoolSettings) -> HyperClient {
    let mut http = HttpConnector::new();
    http.set_connect_timeout(Some(settings.connect_timeout()));
    http.set_nodelay(true);

    #[cfg(feature = "rustls-tls")]
    let connector = {
        http.enforce_http(false);
        hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .wrap_connector(http)
    };
    #[cfg(not(feature = "rustls-tls"))]
    let connector = http;

    hyper::Client::builder()
        .pool_idle_timeout(settings.idle_timeout())
        .pool_max_idle_per_host(settings.max_connections())
        .build(connector)
}
