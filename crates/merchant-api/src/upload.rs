//! Image upload pipeline: ticket request, then one PUT per ticket.

use std::sync::Arc;

use merchant_core::{
    ApiError, ApiErrorCategory, ImageFile, UploadStateMachine, upload::UPLOAD_ERROR_PREFIX,
};
use tokio::task::JoinSet;

use crate::{
    products::ProductClient,
    transport::{ApiRequest, Method, Transport},
};

pub struct ImageUploader<T> {
    transport: Arc<T>,
    products: ProductClient<T>,
}

impl<T> Clone for ImageUploader<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            products: self.products.clone(),
        }
    }
}

impl<T: Transport> ImageUploader<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            products: ProductClient::new(Arc::clone(&transport)),
            transport,
        }
    }

    /// Upload one file and return its durable image id.
    pub async fn upload(&self, file: ImageFile) -> Result<String, ApiError> {
        let name = file.name.clone();
        match self.run(file).await {
            Ok(image_id) => {
                tracing::debug!(file = %name, %image_id, "image uploaded");
                Ok(image_id)
            }
            Err(err) => {
                tracing::error!(file = %name, error = %err, "image upload failed");
                Err(err.context(UPLOAD_ERROR_PREFIX))
            }
        }
    }

    async fn run(&self, file: ImageFile) -> Result<String, ApiError> {
        let mut machine = UploadStateMachine::default();
        let image_type = machine.begin(&file)?;

        let ticket_body = self.products.upload_ticket(image_type).await;
        let upload_url = machine.on_ticket(ticket_body)?.upload_url.clone();

        let request =
            ApiRequest::absolute(Method::Put, upload_url).bytes(file.media_type, file.bytes);
        let transfer = self
            .transport
            .send(request)
            .await
            .map(|response| response.status);
        machine.on_transfer(transfer)
    }

    /// Upload files concurrently, keeping input order in the result.
    ///
    /// The first failure rejects the batch and aborts the pipelines still
    /// running, so no ticket is used after the rejection.
    pub async fn upload_all(&self, files: Vec<ImageFile>) -> Result<Vec<String>, ApiError> {
        let mut image_ids: Vec<Option<String>> = vec![None; files.len()];
        let mut tasks = JoinSet::new();
        for (index, file) in files.into_iter().enumerate() {
            let uploader = self.clone();
            tasks.spawn(async move { (index, uploader.upload(file).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|err| {
                ApiError::new(
                    ApiErrorCategory::Internal,
                    "upload_task_failed",
                    err.to_string(),
                )
            });
            match outcome {
                Ok((index, Ok(image_id))) => image_ids[index] = Some(image_id),
                Ok((_, Err(err))) | Err(err) => {
                    tasks.abort_all();
                    return Err(err);
                }
            }
        }

        Ok(image_ids.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use merchant_core::upload::DISALLOWED_TYPE_MESSAGE;
    use serde_json::json;

    use super::*;
    use crate::{
        testing::{MockReply, MockTransport},
        transport::{RequestBody, Target},
    };

    fn file(name: &str) -> ImageFile {
        ImageFile::new(name, ImageFile::media_type_for_name(name), vec![0xAB; 4])
    }

    /// Tickets are keyed by image type; PNG transfers take 50ms.
    fn storage(fail_jpg_ticket: bool) -> Arc<MockTransport> {
        Arc::new(MockTransport::replying(move |request| {
            match &request.target {
                Target::Api(_) => {
                    let kind = request
                        .json_body()
                        .and_then(|body| body.get("image_type"))
                        .and_then(|value| value.as_str())
                        .unwrap_or_default()
                        .to_owned();
                    if kind == "jpg" && fail_jpg_ticket {
                        return MockReply::json(200, json!({"code": 500, "err_msg": "quota"}));
                    }
                    MockReply::json(
                        200,
                        json!({"code": 200, "data": {
                            "image_id": format!("img-{kind}"),
                            "upload_url": format!("https://bucket.test/{kind}")
                        }}),
                    )
                }
                Target::Absolute(url) if url.ends_with("/png") => {
                    MockReply::raw(200, "").after(Duration::from_millis(50))
                }
                Target::Absolute(_) => MockReply::raw(200, ""),
            }
        }))
    }

    #[tokio::test]
    async fn disallowed_type_never_reaches_network() {
        let transport = storage(false);
        let uploader = ImageUploader::new(transport.clone());
        let err = uploader
            .upload(file("scan.bmp"))
            .await
            .expect_err("bmp must fail");
        assert_eq!(
            err.message,
            format!("{UPLOAD_ERROR_PREFIX}: {DISALLOWED_TYPE_MESSAGE}")
        );
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn png_requests_ticket_then_puts_bytes() {
        let transport = storage(false);
        let uploader = ImageUploader::new(transport.clone());
        let image_id = uploader.upload(file("mug.png")).await.expect("upload");
        assert_eq!(image_id, "img-png");

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].json_body(), Some(&json!({"image_type": "png"})));
        assert!(sent[0].session_scoped);

        assert_eq!(sent[1].method, Method::Put);
        assert_eq!(
            sent[1].target,
            Target::Absolute("https://bucket.test/png".into())
        );
        assert!(!sent[1].session_scoped);
        assert_eq!(
            sent[1].body,
            RequestBody::Bytes {
                content_type: "image/png".into(),
                bytes: vec![0xAB; 4]
            }
        );
    }

    #[tokio::test]
    async fn failed_transfer_is_reported_with_status() {
        let transport = Arc::new(MockTransport::replying(|request| match request.target {
            Target::Api(_) => MockReply::json(
                200,
                json!({"image_id": "img-1", "upload_url": "https://bucket.test/x"}),
            ),
            Target::Absolute(_) => MockReply::raw(403, "denied"),
        }));
        let err = ImageUploader::new(transport.clone())
            .upload(file("a.jpeg"))
            .await
            .expect_err("403 must fail");
        assert_eq!(err.status, Some(403));
        assert_eq!(
            err.message,
            "Image upload failed: Upload failed with status: 403"
        );
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn non_2xx_ticket_fails_before_any_transfer() {
        for (status, body) in [
            (
                500,
                json!({"image_id": "img-1", "upload_url": "https://bucket.test/x"}),
            ),
            (503, json!({"error": "service unavailable"})),
        ] {
            let transport = Arc::new(MockTransport::replying(move |request| {
                match request.target {
                    Target::Api(_) => MockReply::json(status, body.clone()),
                    Target::Absolute(_) => MockReply::raw(200, ""),
                }
            }));
            let err = ImageUploader::new(transport.clone())
                .upload(file("mug.png"))
                .await
                .expect_err("ticket failure must fail the upload");

            assert_eq!(err.status, Some(status));
            assert_eq!(
                err.message,
                format!("Image upload failed: HTTP error! status: {status}")
            );
            assert_eq!(transport.sent().len(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn batch_keeps_input_order() {
        let transport = storage(false);
        let uploader = ImageUploader::new(transport);
        let ids = uploader
            .upload_all(vec![file("slow.png"), file("fast.jpg")])
            .await
            .expect("batch");
        assert_eq!(ids, vec!["img-png".to_owned(), "img-jpg".to_owned()]);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_rejects_and_abandons_pending_tickets() {
        let transport = storage(true);
        let uploader = ImageUploader::new(transport.clone());

        let err = uploader
            .upload_all(vec![file("one.png"), file("two.jpg"), file("three.png")])
            .await
            .expect_err("second ticket fails");
        assert_eq!(err.message, "Image upload failed: quota");

        tokio::time::sleep(Duration::from_secs(1)).await;
        let completed_puts = transport
            .delivered()
            .into_iter()
            .filter(|request| matches!(request.target, Target::Absolute(_)))
            .count();
        assert_eq!(completed_puts, 0);
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let uploader = ImageUploader::new(storage(false));
        assert_eq!(uploader.upload_all(Vec::new()).await, Ok(Vec::new()));
    }
}
