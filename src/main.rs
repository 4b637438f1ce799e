pub mod app;
pub mod cache;
pub mod config;
pub mod database;
pub mod schema;

mod auth;
mod forms;
mod outbound;
mod routes;

use actix_web::{middleware::Logger, web::Data, App, HttpServer};

use app::AppState;
use auth::session_middleware;
use routes::{account::*, pages::*, post::*, recommend::*};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let app_state = AppState::new(None);
    let bind_addr = app_state.config.bind_addr.clone();
    log::info!("Server running on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(session_middleware(&app_state.config))
            .app_data(Data::new(app_state.clone()))
            //Page routes
            .service(home)
            .service(about)
            .service(contact)
            .service(set_cookie_consent)
            .service(clear_cache)
            .service(debug_session)
            //Account routes
            .service(register_page)
            .service(register)
            .service(verify_email)
            .service(login_page)
            .service(login)
            .service(logout)
            //Post and comment routes
            .service(show_post)
            .service(add_comment)
            .service(new_post_page)
            .service(create_post)
            .service(edit_post_page)
            .service(update_post)
            .service(delete_post)
            //Recommendation routes
            .service(recommend_page)
            .service(recommend)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
