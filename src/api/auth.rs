//! Auth session management
//!
//! Exchanges the PIN for the `auth_pin` cookie used by the hidden section.
//! Failed attempts are metered per client IP; note operations themselves do
//! not count against the budget, only this login endpoint does.

use axum::Extension;
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::extract::cookie::SameSite;
use serde::Deserialize;
use serde::Serialize;
use time::Duration;

use crate::client_ip::ClientIp;
use crate::pin::PinConfig;
use crate::rate_limit::RateLimiter;

use super::Credential;
use super::Error;
use super::Form;
use super::Success;
use super::credential::AUTH_PIN_COOKIE;

/// How long the credential cookie stays valid
const COOKIE_MAX_AGE: Duration = Duration::hours(24);

/// The session state served to the user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Whether the presented credential matches the configured PIN
    logged_in: bool,
}

/// Login form
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    /// The PIN to exchange for a cookie
    pin: Option<String>,
}

/// Exchange the PIN for the `auth_pin` cookie
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "pin": "271828" }' \
///     http://localhost:3001/api/auth
/// ```
///
/// Response:
/// ```json
/// { "data": { "loggedIn": true } }
/// ```
///
/// Too many failed attempts from one address are rejected with a `429` and a
/// `Retry-After` header until the window expires.
pub async fn login(
    client_ip: Option<ClientIp>,
    Extension(pin_config): Extension<PinConfig>,
    Extension(rate_limiter): Extension<RateLimiter>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Success<SessionResponse>), Error> {
    let Some(client_ip) = client_ip else {
        return Err(Error::internal_server_error(
            "Could not determine request IP address.",
        ));
    };

    let ip_address = client_ip.address();

    if let Some(retry_after) = rate_limiter.check(ip_address).await {
        let minutes = retry_after.as_secs().div_ceil(60).max(1);

        return Err(Error::too_many_requests(
            format!("Too many failed attempts. Please try again in {minutes} minutes."),
            retry_after.as_secs().max(1),
        ));
    }

    let pin = form.pin.unwrap_or_default();

    if !pin_config.verify(&pin) {
        rate_limiter.record_failure(ip_address).await;

        tracing::debug!("Failed login attempt from {ip_address}");

        return Err(Error::forbidden("Invalid PIN"));
    }

    rate_limiter.clear(ip_address).await;

    let cookie = Cookie::build((AUTH_PIN_COOKIE, pin))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(pin_config.secure_cookies())
        .path("/")
        .max_age(COOKIE_MAX_AGE);

    Ok((
        jar.add(cookie),
        Success::ok(SessionResponse { logged_in: true }),
    ))
}

/// Get the current session state
///
/// Never errors, an invalid or missing credential is simply not logged in
pub async fn status(credential: Credential) -> Success<SessionResponse> {
    Success::ok(SessionResponse {
        logged_in: credential.is_valid(),
    })
}

/// Remove the credential cookie
///
/// The expired cookie is sent whether or not the request carried one
pub async fn logout(jar: CookieJar) -> (CookieJar, Success<SessionResponse>) {
    let expired = Cookie::build(AUTH_PIN_COOKIE)
        .path("/")
        .max_age(Duration::ZERO);

    (
        jar.add(expired),
        Success::ok(SessionResponse { logged_in: false }),
    )
}
