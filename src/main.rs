use actix_web::{web, App, HttpServer};
use log::info;

use photo_gallery::api::{delete_photo, download, gallery, login, register, search, upload};
use photo_gallery::app_state::AppState;
use photo_gallery::config::AppConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::load().expect("Failed to load configuration");
    if log4rs::init_file(&config.logging.config_file, Default::default()).is_err() {
        // no log4rs config on disk; fall back to env_logger
        env_logger::init();
    }

    let app_state =
        AppState::from_config(config.clone()).expect("Failed to initialize application state");
    let payload_limit = config.server.max_payload_size as usize;

    info!(
        "Starting server on {}:{}",
        config.server.host, config.server.port
    );
    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::PayloadConfig::default().limit(payload_limit))
            .service(register)
            .service(login)
            .service(gallery)
            .service(upload)
            .service(search)
            .service(download)
            .service(delete_photo)
    })
    .workers(config.server.workers)
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
