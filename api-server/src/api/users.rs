use super::client::ClientAddr;
use super::error::ApiError;
use crate::models::context::{Context, ContextPointer};
use crate::validation::{parse_user_id, validate_new_user};
use log::{debug, error};
use request_coordinator::User;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde_json::Value;

fn enforce_rate_limit(ctx: &Context, client: &ClientAddr) -> Result<(), ApiError> {
    let decision = ctx.rate_limiter().check_limit(client.as_str());
    if decision.allowed {
        return Ok(());
    }
    debug!("Rejecting request from {}", client);
    Err(ApiError::RateLimited {
        retry_after: decision.retry_after_secs.unwrap_or(1),
    })
}

#[get("/<id>")]
pub async fn get_user(
    id: &str,
    client: ClientAddr,
    ctx: &State<ContextPointer>,
) -> Result<Json<User>, ApiError> {
    enforce_rate_limit(ctx, &client)?;
    let id = parse_user_id(id)?;

    match ctx.users().get_user(id).await {
        Ok(Some(user)) => Ok(Json(user)),
        Ok(None) => Err(ApiError::NotFound),
        Err(e) => {
            error!("Error fetching user {}: {}", id, e);
            Err(ApiError::Internal)
        }
    }
}

#[post("/", data = "<body>")]
pub async fn create_user(
    body: Json<Value>,
    client: ClientAddr,
    ctx: &State<ContextPointer>,
) -> Result<status::Created<Json<User>>, ApiError> {
    enforce_rate_limit(ctx, &client)?;
    let new_user = validate_new_user(&body)?;

    match ctx.users().create_user(new_user).await {
        Ok(user) => {
            Ok(status::Created::new(format!("/users/{}", user.id)).body(Json(user)))
        }
        Err(e) => {
            error!("Error creating user: {}", e);
            Err(ApiError::Internal)
        }
    }
}
