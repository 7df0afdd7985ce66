mod cache;
mod client;
mod cors;
mod error;
mod health;
mod users;

#[cfg(test)]
mod tests;

use crate::models::context::ContextPointer;
use log::info;
use rocket::fairing::AdHoc;
use rocket::{catchers, routes, Build, Rocket};

/// Attach routes, catchers, fairings and shared state to `rocket`.
pub fn mount(rocket: Rocket<Build>, context: ContextPointer) -> Rocket<Build> {
    rocket
        .manage(context)
        .attach(cors::Cors)
        .attach(AdHoc::on_shutdown("Stop background tasks", |rocket| {
            Box::pin(async move {
                if let Some(ctx) = rocket.state::<ContextPointer>() {
                    info!("Shutting down gracefully...");
                    ctx.shutdown().await;
                }
            })
        }))
        .mount("/health", routes![health::health])
        .mount("/users", routes![users::get_user, users::create_user])
        .mount("/cache", routes![cache::cache_stats, cache::clear_cache])
        .mount("/", routes![cors::preflight])
        .register(
            "/",
            catchers![
                error::bad_request,
                error::not_found,
                error::unprocessable,
                error::internal_error
            ],
        )
}
