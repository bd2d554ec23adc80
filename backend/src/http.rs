use std::{fmt::Display, future::Future, time::Duration};

pub const USER_AGENT_PREFIX: &str = "GreenRouteApp/1.0";

/// Shared HTTP client for outbound provider calls, bounded by `timeout`.
pub fn build_client(timeout: Duration, contact_email: &str) -> reqwest::Result<reqwest::Client> {
    let user_agent = if contact_email.is_empty() {
        USER_AGENT_PREFIX.to_string()
    } else {
        format!("{USER_AGENT_PREFIX} ({contact_email})")
    };
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
}

/// Runs `op`, and runs it exactly once more if the first attempt fails.
pub async fn retry_once<T, E, F, Fut>(label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    match op().await {
        Ok(value) => Ok(value),
        Err(err) => {
            tracing::warn!("{label} failed, retrying once: {err}");
            op().await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn retries_a_single_time() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), String> = retry_once("always failing", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err("boom".to_string()) }
        })
        .await;

        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_attempt_can_succeed() {
        let attempts = AtomicUsize::new(0);
        let result: Result<usize, String> = retry_once("flaky", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err("transient".to_string())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(1));
    }

    #[test]
    fn builds_client_with_and_without_contact() {
        assert!(build_client(Duration::from_secs(1), "").is_ok());
        assert!(build_client(Duration::from_secs(1), "ops@example.org").is_ok());
    }

    /// Accepts connections and holds them open without ever answering.
    async fn stalled_server() -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        addr
    }

    #[tokio::test]
    async fn stalled_providers_are_cut_off_by_the_client_timeout() {
        use crate::geocoding::{NominatimGeocoder, ReverseGeocoder, UNKNOWN_CITY};
        use crate::models::{Coordinate, TravelMode};
        use crate::routing::{GoogleRoutesClient, RoutingError, RoutingProvider};

        let addr = stalled_server().await;
        let client = build_client(Duration::from_millis(200), "").unwrap();
        let point = Coordinate::new(45.75, 4.85);
        // Two attempts of 200 ms each, with generous slack.
        let bound = Duration::from_secs(5);

        let geocoder = NominatimGeocoder::new(client.clone(), format!("http://{addr}/reverse"), 8);
        let city = tokio::time::timeout(bound, geocoder.city_for(point))
            .await
            .expect("geocoder should give up on its own");
        assert_eq!(city, UNKNOWN_CITY);

        let router = GoogleRoutesClient::new(client, format!("http://{addr}/routes"), "key");
        let result = tokio::time::timeout(
            bound,
            router.compute_route(point, Coordinate::new(45.19, 5.72), TravelMode::Drive),
        )
        .await
        .expect("router should give up on its own");
        match result {
            Err(RoutingError::Transport(err)) => assert!(err.is_timeout()),
            other => panic!("expected a transport timeout, got {other:?}"),
        }
    }
}
