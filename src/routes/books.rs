use mongodb::bson::oid::ObjectId;
use rocket::http::Status;
use rocket::response::Redirect;
use rocket::{get, routes, Route, State};
use rocket_dyn_templates::Template;
use serde::Serialize;
use serde_json::json;

use crate::db::AppState;
use crate::models::BookCard;
use crate::repo::SortOrder;

#[derive(Serialize)]
struct ReviewView {
    rating: i32,
    text: String,
    created_at: String,
}

// GET /books?q=&genre=&sort=
#[get("/?<q>&<genre>&<sort>")]
pub async fn index(
    state: &State<AppState>,
    q: Option<String>,
    genre: Option<String>,
    sort: Option<String>,
) -> Result<Template, Status> {
    let order = match sort.as_deref() {
        Some("title") => SortOrder::Title,
        _ => SortOrder::Newest,
    };

    let books = state
        .store
        .browse(q.as_deref(), genre.as_deref(), order)
        .await
        .map_err(|e| {
            eprintln!("Error browsing books: {e}");
            Status::InternalServerError
        })?;
    let cards: Vec<BookCard> = books.iter().map(BookCard::from).collect();

    let genres = state.genres_cached().await.unwrap_or_default();

    Ok(Template::render(
        "books/index",
        &json!({
            "books": cards,
            "genres": genres,
            "q": q,
            "selected_genre": genre,
        }),
    ))
}

// GET /books/read/<id>
#[get("/read/<id>")]
pub async fn read(state: &State<AppState>, id: &str) -> Result<Template, Redirect> {
    let oid = match ObjectId::parse_str(id) {
        Ok(x) => x,
        Err(_) => return Err(Redirect::to("/books")),
    };
    let book = match state.store.by_id(oid).await {
        Ok(Some(b)) => b,
        Ok(None) => return Err(Redirect::to("/books")),
        Err(e) => {
            eprintln!("Error loading book {id}: {e}");
            return Err(Redirect::to("/books"));
        }
    };

    let reviews = match state.engagement.approved_reviews_for(oid).await {
        Ok(rs) => rs,
        Err(e) => {
            eprintln!("Error loading reviews for {id}: {e}");
            Vec::new()
        }
    };
    let reviews: Vec<ReviewView> = reviews
        .iter()
        .map(|r| ReviewView {
            rating: r.rating,
            text: r.text.clone(),
            created_at: r.created_at.format("%Y-%m-%d").to_string(),
        })
        .collect();

    Ok(Template::render(
        "books/read",
        &json!({
            "book": BookCard::from(&book),
            "publisher": book.publisher,
            "pages": book.pages,
            "reviews": reviews,
        }),
    ))
}

pub fn routes() -> Vec<Route> {
    routes![index, read]
}
