mod handlers;
mod middleware;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use services::sync_progress::SyncProgressTracker;
use utils::{config::Config, db::establish_connection};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file FIRST before anything else
    dotenv::dotenv().ok();

    // Initialize logger with default level if RUST_LOG not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=================================================");
    println!("PixelTrack Backend Server");
    println!("=================================================");

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");
    let host = config.host.clone();
    let port = config.port;

    println!("Configuration loaded:");
    println!(
        "   - Database: {}",
        config.database_url.split('@').last().unwrap_or("***")
    );
    println!("   - Host: {}", host);
    println!("   - Port: {}", port);
    println!("   - Redirect URI: {}", config.facebook_redirect_uri());
    println!(
        "   - Registration: {}",
        if config.allow_registration {
            "ENABLED"
        } else {
            "DISABLED"
        }
    );
    println!(
        "   - Log level: {}",
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    );

    // Establish database connection
    print!("Connecting to database... ");
    let db = establish_connection(&config.database_url)
        .await
        .expect("Failed to connect to database");
    println!("connected.");

    log::info!("Database connection established");

    // In-memory sync progress, shared across workers
    let sync_tracker = web::Data::new(SyncProgressTracker::new());

    // Start HTTP server
    println!("Starting HTTP server at http://{}:{}", host, port);
    println!("Available endpoints:");
    println!("   - POST http://{}:{}/auth/register", host, port);
    println!("   - POST http://{}:{}/auth/login", host, port);
    println!(
        "   - GET  http://{}:{}/facebook-auth/authorize (JWT required)",
        host, port
    );
    println!("   - GET  http://{}:{}/facebook-auth/callback", host, port);
    println!(
        "   - POST http://{}:{}/facebook-auth/get-ad-data (JWT required)",
        host, port
    );
    println!(
        "   - POST http://{}:{}/facebook-auth/sync-data (JWT required)",
        host, port
    );
    println!(
        "   - GET  http://{}:{}/integrations (JWT required)",
        host, port
    );
    println!("   - GET  http://{}:{}/pixels (JWT required)", host, port);
    println!(
        "   - GET  http://{}:{}/campaigns (JWT required)",
        host, port
    );
    println!(
        "   - GET  http://{}:{}/sync/status (JWT required)",
        host, port
    );
    println!("=================================================");

    log::info!("Server started at http://{}:{}", host, port);

    HttpServer::new(move || {
        // Strict CORS for authenticated API endpoints
        let cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://localhost:3000")
            .allowed_origin(&config.frontend_url)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CONTENT_TYPE,
            ])
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(sync_tracker.clone())
            .wrap(Logger::default())
            .wrap(cors) // CORS must be wrapped AFTER Logger to ensure headers are added to all responses
            // Public endpoints (no authentication required)
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(handlers::auth::register))
                    .route("/login", web::post().to(handlers::auth::login)),
            )
            // Facebook OAuth and sync actions (JWT required, callback included:
            // the state row alone does not authenticate the caller)
            .service(
                web::scope("/facebook-auth")
                    .wrap(crate::middleware::auth::JwtMiddleware)
                    .route(
                        "/authorize",
                        web::get().to(handlers::facebook_auth::authorize),
                    )
                    .route(
                        "/callback",
                        web::get().to(handlers::facebook_auth::callback),
                    )
                    .route(
                        "/get-ad-data",
                        web::post().to(handlers::facebook_auth::get_ad_data),
                    )
                    .route(
                        "/sync-data",
                        web::post().to(handlers::facebook_auth::sync_data),
                    ),
            )
            // Protected endpoints (JWT required)
            .service(
                web::scope("/integrations")
                    .wrap(crate::middleware::auth::JwtMiddleware)
                    .route("", web::get().to(handlers::integrations::list_integrations))
                    .route(
                        "",
                        web::delete().to(handlers::integrations::disconnect_integration),
                    ),
            )
            .service(
                web::scope("/pixels")
                    .wrap(crate::middleware::auth::JwtMiddleware)
                    .route("", web::get().to(handlers::pixels::list_pixels))
                    .route("/{id}", web::get().to(handlers::pixels::get_pixel)),
            )
            .service(
                web::scope("/campaigns")
                    .wrap(crate::middleware::auth::JwtMiddleware)
                    .route("", web::get().to(handlers::campaigns::list_campaigns)),
            )
            .service(
                web::scope("/sync")
                    .wrap(crate::middleware::auth::JwtMiddleware)
                    .route("/status", web::get().to(handlers::sync::get_sync_status)),
            )
    })
    .bind((host, port))?
    .run()
    .await
}
