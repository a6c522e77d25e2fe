use rocket::fs::FileServer;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedHeaders, AllowedOrigins, CorsOptions};
use rocket_dyn_templates::Template;

use booknook::config::AppConfig;
use booknook::db;
use booknook::routes;

// CORS abierto para desarrollo.
fn cors() -> rocket_cors::Cors {
    let allowed_origins = AllowedOrigins::all();

    CorsOptions {
        allowed_origins,
        allowed_methods: vec![
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Delete,
            Method::Patch,
            Method::Options,
        ]
        .into_iter()
        .map(From::from)
        .collect(),
        allowed_headers: AllowedHeaders::some(&["Content-Type", "Accept", "Authorization"]),
        allow_credentials: true,
        ..Default::default()
    }
    .to_cors()
    .expect("error building CORS")
}

#[rocket::launch]
async fn rocket() -> Rocket<Build> {
    // 1) Config primero para decidir si montamos estáticos
    let cfg = AppConfig::from_env();

    // 2) Estado: catálogo Mongo (o en memoria sin MONGO_URI), cache y covers
    let state = db::init_state(&cfg).await;

    // 3) Rocket y rutas
    let mut app = rocket::build()
        .manage(state)
        .attach(Template::fairing())
        .attach(cors())
        .mount("/", routes::home::routes())
        .mount("/books", routes::books::routes());

    // 4) /static -> {STATIC_DIR}; las portadas cacheadas viven en static/uploads
    if cfg.serve_static_from_app {
        app = app.mount("/static", FileServer::from(&cfg.static_dir));
    }

    app
}
