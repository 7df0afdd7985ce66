use crate::models::context::ContextPointer;
use request_coordinator::CacheStats;
use rocket::serde::json::Json;
use rocket::{delete, get, State};
use serde::Serialize;

#[derive(Serialize)]
pub struct ClearCacheResponse {
    pub message: &'static str,
    pub stats: CacheStats,
}

/// Get current cache statistics
#[get("/stats")]
pub fn cache_stats(ctx: &State<ContextPointer>) -> Json<CacheStats> {
    Json(ctx.users().cache_stats())
}

/// Clear the cache (useful for debugging/admin)
#[delete("/")]
pub fn clear_cache(ctx: &State<ContextPointer>) -> Json<ClearCacheResponse> {
    let stats = ctx.users().clear_cache();
    Json(ClearCacheResponse {
        message: "Cache cleared successfully",
        stats,
    })
}
