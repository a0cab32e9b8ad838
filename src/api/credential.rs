//! PIN credential service
//!
//! Get the PIN credential from the request, either from the `auth_pin`
//! cookie or from the `X-Auth-Pin` header. Extraction never rejects on a
//! missing or wrong PIN; handlers decide what an invalid credential means
//! for them.

use axum::Extension;
use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;

use crate::api::Error;
use crate::pin::PinConfig;

/// Name of the cookie carrying the PIN
pub const AUTH_PIN_COOKIE: &str = "auth_pin";

/// Name of the header carrying the PIN
pub const AUTH_PIN_HEADER: &str = "x-auth-pin";

/// The PIN credential presented with a request
#[derive(Clone, Copy, Debug)]
pub struct Credential {
    /// Whether the presented PIN matches the configured one
    valid: bool,
}

impl Credential {
    /// Does the request carry a valid PIN?
    pub fn is_valid(self) -> bool {
        self.valid
    }
}

impl<S> FromRequestParts<S> for Credential
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(pin_config) = parts
            .extract::<Extension<PinConfig>>()
            .await
            .map_err(|_| Error::internal_server_error("Could not get PIN configuration"))?;

        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| Error::internal_server_error("Could not read cookies"))?;

        let presented = jar
            .get(AUTH_PIN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .or_else(|| {
                parts
                    .headers
                    .get(AUTH_PIN_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .map(ToString::to_string)
            });

        let valid = presented
            .as_deref()
            .is_some_and(|pin| pin_config.verify(pin));

        Ok(Self { valid })
    }
}
