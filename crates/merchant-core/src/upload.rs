//! Two-phase image upload: request a single-use ticket, then PUT the bytes.
//!
//! This module only holds the state machine and ticket validation; the
//! network side lives with the resource clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    envelope::AUTH_SUCCESS_CODE,
    error::{ApiError, ApiErrorCategory},
    types::ImageType,
};

pub const UPLOAD_ERROR_PREFIX: &str = "Image upload failed";
pub const DISALLOWED_TYPE_MESSAGE: &str = "Only JPG, JPEG, and PNG files are allowed";
pub const INCOMPLETE_TICKET_MESSAGE: &str = "Incomplete upload data received";
pub const TICKET_FAILED_MESSAGE: &str = "Failed to get upload URL";

/// A local file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    /// Declared media type, for example `image/png`.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Guess the media type from the file extension.
    pub fn media_type_for_name(name: &str) -> &'static str {
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "bmp" => "image/bmp",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        }
    }
}

/// Map an allowed media type to the ticket's `image_type`.
///
/// `image/jpeg` and `image/jpg` both request a `jpg` ticket.
pub fn image_type_for_media_type(media_type: &str) -> Result<ImageType, ApiError> {
    match media_type {
        "image/jpeg" | "image/jpg" => Ok(ImageType::Jpg),
        "image/png" => Ok(ImageType::Png),
        _ => Err(ApiError::validation(
            "unsupported_image_type",
            DISALLOWED_TYPE_MESSAGE,
        )),
    }
}

/// Single-use upload target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadTicket {
    /// Durable handle to persist with the product.
    pub image_id: String,
    /// Valid for exactly one PUT.
    pub upload_url: String,
}

impl UploadTicket {
    /// Extract a ticket from a ticket-request body.
    ///
    /// A present, non-200 `code` fails with the envelope's `err_msg`. The
    /// ticket is read from `data`, or from the body itself when `data` is
    /// absent.
    pub fn from_response(body: &Value) -> Result<Self, ApiError> {
        if let Some(code) = body.get("code").and_then(Value::as_i64)
            && code != 0
            && code != AUTH_SUCCESS_CODE
        {
            let message = body
                .get("err_msg")
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
                .unwrap_or(TICKET_FAILED_MESSAGE);
            return Err(ApiError::new(
                ApiErrorCategory::Http,
                "upload_ticket_rejected",
                message,
            ));
        }

        let source = match body.get("data") {
            Some(data) if !data.is_null() => data,
            _ => body,
        };
        let field = |name: &str| {
            source
                .get(name)
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        };

        match (field("image_id"), field("upload_url")) {
            (Some(image_id), Some(upload_url)) => Ok(Self {
                image_id,
                upload_url,
            }),
            _ => Err(ApiError::new(
                ApiErrorCategory::Decode,
                "incomplete_upload_ticket",
                INCOMPLETE_TICKET_MESSAGE,
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    TicketRequested,
    Uploading,
    Done,
    Failed,
}

/// Per-file pipeline state. Every failure is terminal.
#[derive(Debug, Clone)]
pub struct UploadStateMachine {
    state: UploadState,
    ticket: Option<UploadTicket>,
}

impl Default for UploadStateMachine {
    fn default() -> Self {
        Self {
            state: UploadState::Idle,
            ticket: None,
        }
    }
}

impl UploadStateMachine {
    pub fn state(&self) -> UploadState {
        self.state
    }

    /// `Idle → TicketRequested`: validate the media type before any network call.
    pub fn begin(&mut self, file: &ImageFile) -> Result<ImageType, ApiError> {
        self.expect_state(UploadState::Idle, "begin")?;
        match image_type_for_media_type(&file.media_type) {
            Ok(image_type) => {
                self.state = UploadState::TicketRequested;
                Ok(image_type)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// `TicketRequested → Uploading` on a well-formed ticket body.
    pub fn on_ticket(&mut self, body: Result<Value, ApiError>) -> Result<&UploadTicket, ApiError> {
        self.expect_state(UploadState::TicketRequested, "on_ticket")?;
        match body.and_then(|body| UploadTicket::from_response(&body)) {
            Ok(ticket) => {
                self.state = UploadState::Uploading;
                Ok(&*self.ticket.insert(ticket))
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// `Uploading → Done` on a 2xx transfer, consuming the ticket.
    pub fn on_transfer(&mut self, result: Result<u16, ApiError>) -> Result<String, ApiError> {
        self.expect_state(UploadState::Uploading, "on_transfer")?;
        let ticket = self.ticket.take();
        match (result, ticket) {
            (Ok(status), Some(ticket)) if (200..300).contains(&status) => {
                self.state = UploadState::Done;
                Ok(ticket.image_id)
            }
            (Ok(status), _) => Err(self.fail(ApiError::http_status(
                status,
                format!("Upload failed with status: {status}"),
            ))),
            (Err(err), _) => Err(self.fail(err)),
        }
    }

    fn fail(&mut self, err: ApiError) -> ApiError {
        self.state = UploadState::Failed;
        self.ticket = None;
        err
    }

    fn expect_state(&self, expected: UploadState, action: &str) -> Result<(), ApiError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ApiError::new(
                ApiErrorCategory::Internal,
                "invalid_upload_transition",
                format!("cannot run '{action}' while upload is in state {:?}", self.state),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn png() -> ImageFile {
        ImageFile::new("mug.png", "image/png", vec![1, 2, 3])
    }

    #[test]
    fn maps_allowed_media_types() {
        assert_eq!(image_type_for_media_type("image/jpeg"), Ok(ImageType::Jpg));
        assert_eq!(image_type_for_media_type("image/jpg"), Ok(ImageType::Jpg));
        assert_eq!(image_type_for_media_type("image/png"), Ok(ImageType::Png));
        let err = image_type_for_media_type("image/bmp").expect_err("bmp must fail");
        assert_eq!(err.category, ApiErrorCategory::Validation);
        assert_eq!(err.message, DISALLOWED_TYPE_MESSAGE);
    }

    #[test]
    fn guesses_media_type_from_extension() {
        assert_eq!(ImageFile::media_type_for_name("A.JPG"), "image/jpeg");
        assert_eq!(ImageFile::media_type_for_name("b.png"), "image/png");
        assert_eq!(ImageFile::media_type_for_name("c.bmp"), "image/bmp");
        assert_eq!(
            ImageFile::media_type_for_name("noext"),
            "application/octet-stream"
        );
    }

    #[test]
    fn ticket_reads_data_or_top_level() {
        let nested = UploadTicket::from_response(&json!({
            "code": 200,
            "data": {"image_id": "img-1", "upload_url": "https://s3/put/1"}
        }))
        .expect("nested ticket");
        assert_eq!(nested.image_id, "img-1");

        let flat = UploadTicket::from_response(&json!({
            "image_id": "img-2", "upload_url": "https://s3/put/2"
        }))
        .expect("flat ticket");
        assert_eq!(flat.upload_url, "https://s3/put/2");
    }

    #[test]
    fn ticket_rejects_failed_code_and_missing_fields() {
        let err = UploadTicket::from_response(&json!({"code": 500, "err_msg": "quota"}))
            .expect_err("code 500 must fail");
        assert_eq!(err.message, "quota");

        let err = UploadTicket::from_response(&json!({"code": 403}))
            .expect_err("code 403 must fail");
        assert_eq!(err.message, TICKET_FAILED_MESSAGE);

        let err = UploadTicket::from_response(&json!({"code": 200, "data": {"image_id": "x"}}))
            .expect_err("missing url must fail");
        assert_eq!(err.message, INCOMPLETE_TICKET_MESSAGE);
    }

    #[test]
    fn runs_happy_path_transitions() {
        let mut sm = UploadStateMachine::default();
        assert_eq!(sm.begin(&png()), Ok(ImageType::Png));
        assert_eq!(sm.state(), UploadState::TicketRequested);

        let ticket = sm
            .on_ticket(Ok(json!({"data": {"image_id": "img-9", "upload_url": "u"}})))
            .expect("ticket");
        assert_eq!(ticket.image_id, "img-9");
        assert_eq!(sm.state(), UploadState::Uploading);

        assert_eq!(sm.on_transfer(Ok(200)), Ok("img-9".to_owned()));
        assert_eq!(sm.state(), UploadState::Done);
    }

    #[test]
    fn disallowed_type_fails_from_idle() {
        let mut sm = UploadStateMachine::default();
        let err = sm
            .begin(&ImageFile::new("x.bmp", "image/bmp", vec![]))
            .expect_err("bmp must fail");
        assert_eq!(err.code, "unsupported_image_type");
        assert_eq!(sm.state(), UploadState::Failed);
    }

    #[test]
    fn non_2xx_transfer_is_terminal() {
        let mut sm = UploadStateMachine::default();
        sm.begin(&png()).expect("begin");
        sm.on_ticket(Ok(json!({"image_id": "i", "upload_url": "u"})))
            .expect("ticket");
        let err = sm.on_transfer(Ok(403)).expect_err("403 must fail");
        assert_eq!(err.status, Some(403));
        assert_eq!(sm.state(), UploadState::Failed);

        let err = sm.on_transfer(Ok(200)).expect_err("failed is terminal");
        assert_eq!(err.code, "invalid_upload_transition");
    }

    #[test]
    fn ticket_cannot_be_reused() {
        let mut sm = UploadStateMachine::default();
        sm.begin(&png()).expect("begin");
        sm.on_ticket(Ok(json!({"image_id": "i", "upload_url": "u"})))
            .expect("ticket");
        sm.on_transfer(Ok(204)).expect("transfer");
        let err = sm.on_transfer(Ok(204)).expect_err("second transfer must fail");
        assert_eq!(err.code, "invalid_upload_transition");
    }
}
