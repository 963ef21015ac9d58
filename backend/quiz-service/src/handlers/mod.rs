/// HTTP handlers, grouped by resource
///
/// Every route lives under `/api/v1`; `configure` wires them into a scope.
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::models::PageRequest;

pub mod admin;
pub mod auth;
pub mod health;
pub mod notifications;
pub mod posts;
pub mod quizzes;
pub mod users;

/// Acknowledgement body: `{ "response": ... }`
#[derive(Debug, Serialize)]
pub struct Ack<T: Serialize> {
    pub response: T,
}

pub fn ack<T: Serialize>(response: T) -> HttpResponse {
    HttpResponse::Ok().json(Ack { response })
}

/// `?page=&sort=` query shared by paged listings
#[derive(Debug, Deserialize)]
pub struct PageQuery<S> {
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub sort: S,
}

impl<S> PageQuery<S> {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::of(self.page)
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/sign-up", web::post().to(auth::sign_up))
            .route("/sign-in", web::post().to(auth::sign_in))
            .route("/token-reissue", web::post().to(auth::reissue))
            .route("/sign-out", web::post().to(auth::sign_out))
            .route("/oauth/sign-up", web::post().to(auth::oauth_sign_up))
            .route("/oauth/kakao", web::post().to(auth::kakao_sign_in))
            .route("/oauth/naver", web::post().to(auth::naver_sign_in))
            .route("/find-username", web::post().to(auth::find_username))
            .route("/verify-user", web::post().to(auth::request_password_reset))
            .route("/reset-password", web::post().to(auth::reset_password)),
    )
    .service(
        web::scope("/users")
            .route("", web::post().to(auth::sign_up))
            .route("/verify-username", web::post().to(users::verify_username))
            .route("/verify-nickname", web::post().to(users::verify_nickname))
            .route(
                "/email/verification-request",
                web::post().to(users::request_mail_code),
            )
            .route("/email/code-verification", web::post().to(users::verify_mail_code))
            .service(
                web::resource("/my")
                    .route(web::get().to(users::get_my_info))
                    .route(web::put().to(users::update_my_info))
                    .route(web::delete().to(users::delete_my_account)),
            )
            .route("/my/password", web::patch().to(users::change_password))
            .route("/my/verify-password", web::post().to(users::verify_password))
            .route("/my/quizzes", web::get().to(users::my_quizzes))
            .route("/my/quizzes/tried", web::get().to(users::my_tried_quizzes))
            .route("/my/quizzes/pinned", web::get().to(users::my_pinned_quizzes))
            .route("/my/posts", web::get().to(users::my_posts))
            .service(
                web::resource("/my/alert")
                    .route(web::get().to(notifications::list))
                    .route(web::post().to(notifications::mark_read)),
            ),
    )
    .route("/subscribe", web::get().to(notifications::subscribe))
    .route("/subjects", web::get().to(quizzes::subjects))
    .service(
        web::scope("/quizzes")
            .service(
                web::resource("")
                    .route(web::get().to(quizzes::search))
                    .route(web::post().to(quizzes::create)),
            )
            .route("/liked", web::get().to(quizzes::liked))
            .route("/subject/{subject_id}", web::get().to(quizzes::by_subject))
            .service(
                web::resource("/{quiz_id}")
                    .route(web::get().to(quizzes::get))
                    .route(web::put().to(quizzes::update))
                    .route(web::delete().to(quizzes::delete)),
            )
            .route("/{quiz_id}/grade", web::post().to(quizzes::grade))
            .route("/{quiz_id}/answer", web::get().to(quizzes::answer))
            .service(
                web::resource("/{quiz_id}/pins")
                    .route(web::post().to(quizzes::pin))
                    .route(web::delete().to(quizzes::unpin)),
            )
            .service(
                web::resource("/{quiz_id}/likes")
                    .route(web::post().to(quizzes::like))
                    .route(web::delete().to(quizzes::unlike)),
            )
            .route("/{quiz_id}/reports", web::post().to(quizzes::report)),
    )
    .route("/categories", web::get().to(posts::categories))
    .service(
        web::scope("/posts")
            .service(
                web::resource("")
                    .route(web::get().to(posts::search))
                    .route(web::post().to(posts::create)),
            )
            .route("/categories/{category_id}", web::get().to(posts::by_category))
            .service(
                web::resource("/{post_id}")
                    .route(web::get().to(posts::get))
                    .route(web::put().to(posts::update))
                    .route(web::delete().to(posts::delete)),
            )
            .service(
                web::resource("/{post_id}/likes")
                    .route(web::post().to(posts::like))
                    .route(web::delete().to(posts::unlike)),
            )
            .route("/{post_id}/comments", web::post().to(posts::create_comment))
            .service(
                web::resource("/{post_id}/comments/{comment_id}")
                    .route(web::put().to(posts::update_comment))
                    .route(web::delete().to(posts::delete_comment)),
            ),
    )
    .service(
        web::scope("/admin")
            .route("/users", web::get().to(admin::list_users))
            .service(
                web::resource("/users/{user_id}")
                    .route(web::delete().to(admin::delete_user))
                    .route(web::patch().to(admin::set_suspension)),
            )
            .route("/posts", web::get().to(admin::list_posts))
            .route("/posts/{post_id}", web::delete().to(admin::delete_post))
            .route("/reports", web::get().to(admin::list_reports)),
    );
}
