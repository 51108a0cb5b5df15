use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;

use crate::configuration::Settings;
use crate::email_client::{EmailClient, SenderEmail};
use crate::logger::LoggerMiddleware;
use crate::middleware::{JwtMiddleware, SessionGuard};
use crate::routes::{
    change_password, get_business, get_user_profile, health_check, login, logout, password_reset,
    password_reset_request, refresh, resend_verification_email, setup_business, signup,
    update_business, update_profile, verify_email,
};
use crate::security::RateLimiters;

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let sender = SenderEmail::parse(settings.email.sender.clone())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let email_client = EmailClient::new(
        settings.email.base_url.clone(),
        sender,
        settings.email.frontend_url.clone(),
        reqwest::Client::new(),
    );

    let pool = connection.clone();
    let jwt_config = settings.jwt.clone();
    let session_settings = settings.session.clone();

    let connection = web::Data::new(connection);
    let jwt_config_data = web::Data::new(settings.jwt.clone());
    let email_client_data = web::Data::new(email_client);
    let rate_limiters = web::Data::new(RateLimiters::new(&settings.rate_limit));

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())      // Standard logging
            .wrap(LoggerMiddleware)       // Custom logging

            // Shared state
            .app_data(connection.clone())
            .app_data(jwt_config_data.clone())
            .app_data(email_client_data.clone())
            .app_data(rate_limiters.clone())

            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .route("/auth/signup", web::post().to(signup))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/verify-email", web::post().to(verify_email))
            .route("/auth/password-reset-request", web::post().to(password_reset_request))
            .route("/auth/password-reset", web::post().to(password_reset))

            // Protected routes: JWT validation first, then the inactivity guard
            .service(
                web::scope("/auth")
                    .wrap(SessionGuard::new(pool.clone(), session_settings.clone()))
                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                    .route("/logout", web::post().to(logout))
                    .route("/resend-verification-email", web::post().to(resend_verification_email))
                    .route("/me", web::get().to(get_user_profile))
                    .route("/profile", web::put().to(update_profile))
                    .route("/change-password", web::put().to(change_password)),
            )
            .service(
                web::scope("/business")
                    .wrap(SessionGuard::new(pool.clone(), session_settings.clone()))
                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                    .route("/setup", web::post().to(setup_business))
                    .route("/me", web::get().to(get_business))
                    .route("/update", web::put().to(update_business)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
