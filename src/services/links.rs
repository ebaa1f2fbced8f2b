use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::require_filled;

/// Details typed into the payment page before sending the proof.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentProofRequest {
    pub full_name: String,
    pub whatsapp: String,
    pub course: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentProofLink {
    pub url: String,
    pub message: String,
}

pub fn payment_proof_message(institute: &str, request: &PaymentProofRequest) -> String {
    format!(
        "Hello {},\n\nFull Name: {}\nWhatsApp: {}\nCourse: {}\n\nI have attached my payment proof.",
        institute,
        request.full_name.trim(),
        request.whatsapp.trim(),
        request.course.trim()
    )
}

/// `https://wa.me/<contact>?text=<message>` with the message percent-encoded.
pub fn payment_proof_link(
    contact: &str,
    institute: &str,
    request: &PaymentProofRequest,
) -> Result<PaymentProofLink, AppError> {
    require_filled(&[
        ("full_name", &request.full_name),
        ("whatsapp", &request.whatsapp),
        ("course", &request.course),
    ])?;

    let message = payment_proof_message(institute, request);
    let contact: String = contact.chars().filter(char::is_ascii_digit).collect();
    let url = format!("https://wa.me/{}?text={}", contact, urlencoding::encode(&message));
    Ok(PaymentProofLink { url, message })
}
