use axum::{routing::{get, post}, Router};

use crate::AppState;

mod login;
mod logout;
mod otp;
mod page;
mod signup;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth", get(page::auth_page))
        .route("/auth/signup", post(signup::signup))
        .route("/auth/login", post(login::login))
        .route("/auth/otp/send", post(otp::send_code))
        .route("/auth/otp/verify", post(otp::verify_code))
        .route("/auth/signout", post(logout::logout))
}
