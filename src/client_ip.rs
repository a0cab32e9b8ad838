//! Optional client IP address extractor
//!
//! `axum_client_ip` rejects the request outright when no address can be
//! determined; the login flow decides for itself what a missing address
//! means.

use std::convert::Infallible;
use std::net::IpAddr;

use axum::extract::FromRequestParts as _;
use axum::extract::OptionalFromRequestParts;
use axum::http::request::Parts;

/// Client IP address extractor
#[derive(Clone, Copy, Debug)]
pub struct ClientIp(IpAddr);

impl ClientIp {
    /// The actual client IP address
    pub fn address(self) -> IpAddr {
        self.0
    }
}

impl<S> OptionalFromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let ip_address = axum_client_ip::ClientIp::from_request_parts(parts, state).await;

        Ok(ip_address
            .ok()
            .map(|axum_client_ip::ClientIp(ip_address)| Self(ip_address)))
    }
}
