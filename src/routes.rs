use crate::{
    api::{attendance, client, employee, kiosk, report, request, schedule},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpResponse, Responder, get, middleware::from_fn, web};
use std::sync::Arc;

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = (60_000 / requests_per_min as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_default();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let kiosk_limiter = Arc::new(build_limiter(config.rate_kiosk_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.service(health);

    // Personal sessions
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Shared terminal, PIN per action
    cfg.service(
        web::scope("/kiosk")
            .wrap(kiosk_limiter)
            .service(web::resource("/roster").route(web::get().to(kiosk::roster)))
            .service(web::resource("/clients").route(web::get().to(kiosk::clients)))
            .service(web::resource("/clock").route(web::post().to(kiosk::clock))),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(handlers::me)
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    .service(
                        web::resource("/{id}/vacation-balance")
                            .route(web::get().to(employee::vacation_balance)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .service(web::resource("/clock-in").route(web::post().to(attendance::clock_in)))
                    .service(
                        web::resource("/clock-out").route(web::post().to(attendance::clock_out)),
                    )
                    .service(web::resource("/pause").route(web::post().to(attendance::pause)))
                    .service(web::resource("/resume").route(web::post().to(attendance::resume)))
                    .service(web::resource("/status").route(web::get().to(attendance::my_status)))
                    .service(
                        web::resource("/status/{employee_id}")
                            .route(web::get().to(attendance::status)),
                    )
                    .service(
                        web::resource("/history/{employee_id}")
                            .route(web::get().to(attendance::history)),
                    ),
            )
            .service(
                web::scope("/schedule-types")
                    .service(
                        web::resource("")
                            .route(web::get().to(schedule::list_schedules))
                            .route(web::post().to(schedule::create_schedule)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(schedule::get_schedule))
                            .route(web::put().to(schedule::update_schedule))
                            .route(web::delete().to(schedule::delete_schedule)),
                    )
                    .service(
                        web::resource("/{id}/employees")
                            .route(web::get().to(schedule::schedule_employees)),
                    ),
            )
            .service(
                web::scope("/clients")
                    .service(
                        web::resource("")
                            .route(web::get().to(client::list_clients))
                            .route(web::post().to(client::create_client)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(client::get_client))
                            .route(web::put().to(client::update_client))
                            .route(web::delete().to(client::delete_client)),
                    ),
            )
            .service(
                web::scope("/reports")
                    .service(web::resource("/summary").route(web::get().to(report::summary)))
                    .service(web::resource("/dashboard").route(web::get().to(report::dashboard))),
            )
            .service(
                web::scope("/requests")
                    .service(
                        web::resource("")
                            .route(web::get().to(request::list_requests))
                            .route(web::post().to(request::create_request)),
                    )
                    // before /{id} so it is not taken for an id
                    .service(
                        web::resource("/pending-count")
                            .route(web::get().to(request::pending_count)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(request::get_request)))
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(request::approve_request)),
                    )
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(request::reject_request)),
                    ),
            ),
    );
}

// LOGIN (name + PIN)
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days, single use)

// KIOSK
//  └─ POST /kiosk/clock with employee_id + PIN per action

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a fresh pair, old refresh token is spent
