pub mod activity;
pub mod admin;
pub mod auth;
pub mod feedback;
pub mod gigs;
pub mod pings;
pub mod users;

use actix_web::web;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // ── Auth routes (protected by JWT via the AuthenticatedUser extractor) ──
    cfg.service(
        web::scope("/auth")
            .route("/me", web::get().to(auth::me))
            .route("/complete-profile", web::post().to(auth::complete_profile)),
    );

    // ── Gig routes (browsing is public, writes require a valid JWT) ──
    cfg.service(
        web::scope("/gigs")
            .route("", web::get().to(gigs::list_gigs))
            .route("", web::post().to(gigs::create_gig))
            .route("/mine", web::get().to(gigs::my_gigs))
            .route("/expire", web::post().to(gigs::expire_gigs))
            .route("/{id}", web::get().to(gigs::get_gig))
            .route("/{id}", web::put().to(gigs::update_gig))
            .route("/{id}", web::delete().to(gigs::delete_gig))
            .route(
                "/{id}/contact-visibility",
                web::put().to(gigs::set_contact_visibility),
            )
            .route("/{id}/report", web::post().to(gigs::report_gig)),
    );

    // ── Ping routes (all protected) ──
    cfg.service(
        web::scope("/pings")
            .route("", web::post().to(pings::submit_ping))
            .route("/mine", web::get().to(pings::my_pings))
            .route("/check/{gig_id}", web::get().to(pings::check_pinged))
            .route("/gig/{gig_id}", web::get().to(pings::gig_pings))
            .route("/{id}/accept", web::post().to(pings::accept_ping))
            .route("/{id}", web::delete().to(pings::reject_ping)),
    );

    cfg.route("/activity", web::get().to(activity::recent));

    // ── User routes (all protected — require valid JWT) ──
    cfg.service(
        web::resource("/users/{id}")
            .route(web::get().to(users::get_user))
            .route(web::put().to(users::update_user)),
    );

    cfg.route("/feedback", web::post().to(feedback::submit_feedback));

    // ── Admin routes (role checked in the services) ──
    cfg.service(
        web::scope("/admin")
            .route("/overview", web::get().to(admin::overview))
            .route("/users", web::get().to(admin::list_users))
            .route("/feedback", web::get().to(admin::feedback))
            .route("/gigs/{id}", web::delete().to(admin::delete_gig))
            .route("/users/{id}", web::delete().to(admin::delete_user))
            .route("/users/{id}/ban", web::put().to(admin::set_ban)),
    );
}

/// Malformed JSON bodies surface as `AppError::Validation`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| crate::error::AppError::validation(err.to_string()).into())
}
