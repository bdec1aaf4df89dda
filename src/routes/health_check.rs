use actix_web::HttpResponse;

pub async fn health_check() -> HttpResponse {
    tracing::trace!("Health check");
    HttpResponse::Ok().finish()
}
