use crate::error::ApiErrorBody;
use crate::models::{OtpResponse, SendOtpRequest, VerifyOtpRequest};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::send_otp,
        crate::routes::verify_otp,
    ),
    components(schemas(SendOtpRequest, VerifyOtpRequest, OtpResponse, ApiErrorBody)),
    tags(
        (name = "otp", description = "Email one-time passcodes"),
    )
)]
pub struct ApiDoc;
