use actix_web::{http::header, web, HttpRequest, HttpResponse, Result};
use actix_web::http::header::Header;
use actix_web_httpauth::headers::authorization::{Authorization, Basic};
use askama::Template;
use serde::Deserialize;

use crate::{
    auth::{
        authenticate_credentials, clear_logout_cookie, current_session, hash_password,
        logout_cookie, AUTH_REALM,
    },
    catalog::{Provider, Service, PROVIDERS, SERVICES},
    db,
    filters,
    state::AppState,
    templates::render,
};

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    signed_in: bool,
    session_email: String,
    services: &'static [Service],
    providers: &'static [Provider],
}

#[derive(Template)]
#[template(path = "signup.html")]
struct SignupTemplate {
    signed_in: bool,
    session_email: String,
    email: String,
    errors: Vec<String>,
}

#[derive(Deserialize)]
struct SignupForm {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginQuery {
    next: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(
            web::resource("/signup")
                .route(web::get().to(show_signup))
                .route(web::post().to(create_account)),
        )
        .service(web::resource("/login").route(web::get().to(login)))
        .service(web::resource("/logout").route(web::get().to(logout)))
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn home(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let session = current_session(&state, &req).await;

    Ok(render(HomeTemplate {
        signed_in: session.is_some(),
        session_email: session.map(|user| user.email).unwrap_or_default(),
        services: SERVICES,
        providers: PROVIDERS,
    }))
}

async fn show_signup(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let session = current_session(&state, &req).await;

    Ok(render(SignupTemplate {
        signed_in: session.is_some(),
        session_email: session.map(|user| user.email).unwrap_or_default(),
        email: String::new(),
        errors: Vec::new(),
    }))
}

async fn create_account(
    state: web::Data<AppState>,
    form: web::Form<SignupForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let email = form.email.trim().to_lowercase();

    let mut errors = Vec::new();
    if email.is_empty() || !email.contains('@') {
        errors.push("Please enter a valid email address.".to_string());
    }
    if form.password.len() < 8 {
        errors.push("Password must be at least 8 characters.".to_string());
    }

    if errors.is_empty() {
        let password_hash = hash_password(&form.password)
            .map_err(|_| actix_web::error::ErrorInternalServerError("password hash failed"))?;
        match db::create_user(&state.db, &email, &password_hash).await {
            Ok(_) => {
                return Ok(HttpResponse::SeeOther()
                    .append_header((header::LOCATION, "/login?next=/book"))
                    .finish());
            }
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                errors.push("An account with this email already exists.".to_string());
            }
            Err(err) => return Err(actix_web::error::ErrorInternalServerError(err)),
        }
    }

    Ok(render(SignupTemplate {
        signed_in: false,
        session_email: String::new(),
        email,
        errors,
    }))
}

async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<LoginQuery>,
) -> HttpResponse {
    let auth = match Authorization::<Basic>::parse(&req) {
        Ok(auth) => auth,
        Err(_) => return auth_challenge(),
    };
    let credentials = auth.into_scheme();
    let email = credentials.user_id();
    let password = credentials.password().unwrap_or_default();

    if authenticate_credentials(&state, email, password).await.is_none() {
        return auth_challenge();
    }

    let requested = query.next.as_deref().unwrap_or("");
    let redirect = if requested.starts_with('/') {
        requested
    } else {
        "/account"
    };

    HttpResponse::SeeOther()
        .append_header((header::LOCATION, redirect))
        .cookie(clear_logout_cookie(&req))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

async fn logout(req: HttpRequest) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/"))
        .cookie(logout_cookie(&req))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

fn auth_challenge() -> HttpResponse {
    HttpResponse::Unauthorized()
        .insert_header((header::WWW_AUTHENTICATE, format!("Basic realm=\"{}\"", AUTH_REALM)))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}
