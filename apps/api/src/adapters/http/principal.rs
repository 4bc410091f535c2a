//! Bearer-token authentication for dashboard routes.

use axum::{RequestPartsExt, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppError,
    application::{jwt, use_cases::user::Principal},
};

impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::InvalidCredentials)?;

        let claims = jwt::verify(
            bearer.token(),
            &state.config.identity_jwt_secret,
            &state.config.identity_issuer,
        )?;

        state.user_use_cases.ensure_user(&claims).await
    }
}
