use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};

use crate::error::ApiError;
use crate::models::*;
use crate::otp::OtpService;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .service(web::resource("/send-otp").route(web::post().to(send_otp)))
        .service(web::resource("/verify-otp").route(web::post().to(verify_otp)));
}

#[derive(Clone)]
pub struct AppState { pub otp: OtpService }

// Malformed bodies get the same JSON error shape as the handlers.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("rejecting request body: {err}");
    ApiError::BadRequest("Invalid request body".into()).into()
}

#[utoipa::path(
    post,
    path = "/send-otp",
    tag = "otp",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "OTP generated and emailed", body = OtpResponse),
        (status = 400, description = "Email missing", body = crate::error::ApiErrorBody),
        (status = 500, description = "Email provider failed", body = crate::error::ApiErrorBody)
    )
)]
pub async fn send_otp(data: web::Data<AppState>, payload: web::Json<SendOtpRequest>) -> Result<HttpResponse, ApiError> {
    data.otp.send(payload.email.as_deref()).await?;
    Ok(HttpResponse::Ok().json(OtpResponse::ok("OTP sent successfully")))
}

#[utoipa::path(
    post,
    path = "/verify-otp",
    tag = "otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Code matched; it can't be used again", body = OtpResponse),
        (status = 400, description = "Unknown, expired or wrong code", body = crate::error::ApiErrorBody)
    )
)]
pub async fn verify_otp(data: web::Data<AppState>, payload: web::Json<VerifyOtpRequest>) -> Result<HttpResponse, ApiError> {
    data.otp.verify(payload.email.as_deref(), payload.otp.as_ref()).await?;
    Ok(HttpResponse::Ok().json(OtpResponse::ok("OTP verified successfully")))
}
