use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::models::session::{OperatorRole, Session};

pub const OPERATOR_ID_HEADER: &str = "x-operator-id";
pub const OPERATOR_ROLE_HEADER: &str = "x-operator-role";

#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let operator_id = header(parts, OPERATOR_ID_HEADER)?;
        let role = header(parts, OPERATOR_ROLE_HEADER)?
            .parse::<OperatorRole>()
            .map_err(AppError::Unauthorized)?;

        Ok(Self(Session::new(operator_id, role)))
    }
}

fn header(parts: &Parts, name: &str) -> Result<String, AppError> {
    let value = parts
        .headers
        .get(name)
        .ok_or_else(|| AppError::Unauthorized(format!("missing {name} header")))?
        .to_str()
        .map_err(|_| AppError::Unauthorized(format!("{name} header is not valid text")))?
        .trim();

    if value.is_empty() {
        return Err(AppError::Unauthorized(format!("{name} header is empty")));
    }

    Ok(value.to_string())
}
