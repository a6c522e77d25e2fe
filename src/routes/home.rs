use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rocket::http::Status;
use rocket::{get, routes, Route, State};
use rocket_dyn_templates::Template;
use serde_json::json;

use crate::db::AppState;
use crate::ranking;

// ------- Rutas base -------
#[get("/")]
pub async fn home(state: &State<AppState>) -> Result<Template, Status> {
    let now = Utc::now();
    let mut rng = StdRng::from_entropy();

    let lists = ranking::build_home_page(
        state.store.as_ref(),
        state.engagement.as_ref(),
        &state.covers,
        now,
        &mut rng,
    )
    .await
    .map_err(|e| {
        eprintln!("Error building home lists: {e}");
        Status::InternalServerError
    })?;

    let genres = state.genres_cached().await.map_err(|e| {
        eprintln!("Error getting genres: {e}");
        Status::InternalServerError
    })?;

    let context = json!({
        "latest_books": lists.latest,
        "top_week": lists.top_week,
        "trending": lists.trending,
        "genres": genres,
    });

    Ok(Template::render("home", &context))
}

#[get("/health")]
pub fn health() -> &'static str {
    "ok"
}

pub fn routes() -> Vec<Route> {
    routes![home, health]
}
