//! Merchant product catalogue on the product service.

use std::sync::Arc;

use merchant_core::{
    ApiError, AuthEnvelope, CreateProductRequest, ImageType, ImageUploadRequest, ProductInfo,
    ProductListParams, ProductListResponse, ProductStatus, UpdateProductRequest,
};
use serde_json::{Value, json};
use url::form_urlencoded;

use crate::transport::{ApiRequest, Method, Transport};

pub const PRODUCT_BASE_PATH: &str = "/api/product-ms/v1/merchant";

pub fn add_product_request(product: &CreateProductRequest) -> Result<ApiRequest, ApiError> {
    ApiRequest::api(Method::Post, format!("{PRODUCT_BASE_PATH}/products")).json(product)
}

pub fn get_product_request(product_id: u64) -> ApiRequest {
    ApiRequest::api(
        Method::Get,
        format!("{PRODUCT_BASE_PATH}/product/{product_id}"),
    )
}

pub fn set_status_request(product_id: u64, status: ProductStatus) -> ApiRequest {
    ApiRequest::api(
        Method::Patch,
        format!("{PRODUCT_BASE_PATH}/products/{product_id}/status"),
    )
    .json_value(json!({ "status": status.as_code() }))
}

pub fn update_stock_request(product_id: u64, stock: i64) -> ApiRequest {
    ApiRequest::api(
        Method::Patch,
        format!("{PRODUCT_BASE_PATH}/products/{product_id}/stock"),
    )
    .json_value(json!({ "stock": stock }))
}

/// The product id goes in the path only.
pub fn edit_product_request(update: &UpdateProductRequest) -> Result<ApiRequest, ApiError> {
    ApiRequest::api(
        Method::Put,
        format!("{PRODUCT_BASE_PATH}/products/{}", update.id),
    )
    .json(update)
}

/// Query parameters are emitted only when set, in a fixed order.
pub fn list_products_request(params: &ProductListParams) -> ApiRequest {
    let mut query = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    if let Some(keyword) = params.keyword.as_deref().filter(|value| !value.is_empty()) {
        query.append_pair("keyword", keyword);
        any = true;
    }
    if let Some(category) = params.category.as_deref().filter(|value| !value.is_empty()) {
        query.append_pair("category", category);
        any = true;
    }
    if let Some(offset) = params.offset {
        query.append_pair("offset", &offset.to_string());
        any = true;
    }
    if let Some(order_by) = params.order_by {
        query.append_pair("order_by", &order_by.to_string());
        any = true;
    }

    let mut path = format!("{PRODUCT_BASE_PATH}/products");
    if any {
        path.push('?');
        path.push_str(&query.finish());
    }
    ApiRequest::api(Method::Get, path)
}

pub fn upload_ticket_request(image_type: ImageType) -> Result<ApiRequest, ApiError> {
    ApiRequest::api(
        Method::Post,
        format!("{PRODUCT_BASE_PATH}/images/upload-urls"),
    )
    .json(&ImageUploadRequest { image_type })
}

pub struct ProductClient<T> {
    transport: Arc<T>,
}

impl<T> Clone for ProductClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> ProductClient<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub async fn add(&self, product: &CreateProductRequest) -> Result<AuthEnvelope, ApiError> {
        self.transport
            .send(add_product_request(product)?)
            .await?
            .decode()
    }

    pub async fn get(&self, product_id: u64) -> Result<AuthEnvelope<ProductInfo>, ApiError> {
        self.transport
            .send(get_product_request(product_id))
            .await?
            .decode()
    }

    pub async fn publish(&self, product_id: u64) -> Result<AuthEnvelope, ApiError> {
        self.set_status(product_id, ProductStatus::Published).await
    }

    pub async fn unpublish(&self, product_id: u64) -> Result<AuthEnvelope, ApiError> {
        self.set_status(product_id, ProductStatus::Unpublished).await
    }

    async fn set_status(
        &self,
        product_id: u64,
        status: ProductStatus,
    ) -> Result<AuthEnvelope, ApiError> {
        self.transport
            .send(set_status_request(product_id, status))
            .await?
            .decode()
    }

    pub async fn update_stock(&self, product_id: u64, stock: i64) -> Result<AuthEnvelope, ApiError> {
        self.transport
            .send(update_stock_request(product_id, stock))
            .await?
            .decode()
    }

    pub async fn edit(&self, update: &UpdateProductRequest) -> Result<AuthEnvelope, ApiError> {
        self.transport
            .send(edit_product_request(update)?)
            .await?
            .decode()
    }

    pub async fn list(
        &self,
        params: &ProductListParams,
    ) -> Result<AuthEnvelope<ProductListResponse>, ApiError> {
        self.transport
            .send(list_products_request(params))
            .await?
            .decode()
    }

    /// Raw ticket body; interpretation belongs to the upload state machine.
    /// A non-2xx answer fails with its status whatever the body says.
    pub async fn upload_ticket(&self, image_type: ImageType) -> Result<Value, ApiError> {
        let response = self
            .transport
            .send(upload_ticket_request(image_type)?)
            .await?;
        if !response.is_success() {
            let status = response.status;
            return Err(ApiError::http_status(
                status,
                format!("HTTP error! status: {status}"),
            ));
        }
        response.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;

    #[test]
    fn status_and_stock_bodies() {
        let publish = set_status_request(7, ProductStatus::Published);
        assert_eq!(publish.method, Method::Patch);
        assert_eq!(
            publish.path(),
            "/api/product-ms/v1/merchant/products/7/status"
        );
        assert_eq!(publish.json_body(), Some(&json!({"status": 1})));

        let unpublish = set_status_request(7, ProductStatus::Unpublished);
        assert_eq!(unpublish.json_body(), Some(&json!({"status": 0})));

        let stock = update_stock_request(7, 12);
        assert_eq!(stock.path(), "/api/product-ms/v1/merchant/products/7/stock");
        assert_eq!(stock.json_body(), Some(&json!({"stock": 12})));
        assert!(stock.session_scoped);
    }

    #[test]
    fn get_uses_singular_product_path() {
        let request = get_product_request(42);
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path(), "/api/product-ms/v1/merchant/product/42");
        assert_eq!(request.json_body(), None);
    }

    #[test]
    fn edit_omits_id_from_body() {
        let request = edit_product_request(&UpdateProductRequest {
            id: 9,
            name: Some("Bowl".into()),
            price: Some(18.5),
            ..UpdateProductRequest::default()
        })
        .expect("edit");
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.path(), "/api/product-ms/v1/merchant/products/9");
        assert_eq!(
            request.json_body(),
            Some(&json!({"name": "Bowl", "price": 18.5}))
        );
    }

    #[test]
    fn list_query_only_carries_set_params_in_order() {
        let bare = list_products_request(&ProductListParams::default());
        assert_eq!(bare.path(), "/api/product-ms/v1/merchant/products");

        let full = list_products_request(&ProductListParams {
            keyword: Some("tea cup".into()),
            category: Some("mugs".into()),
            offset: Some(0),
            order_by: Some(1),
        });
        assert_eq!(
            full.path(),
            "/api/product-ms/v1/merchant/products?keyword=tea+cup&category=mugs&offset=0&order_by=1"
        );

        let partial = list_products_request(&ProductListParams {
            offset: Some(20),
            ..ProductListParams::default()
        });
        assert_eq!(
            partial.path(),
            "/api/product-ms/v1/merchant/products?offset=20"
        );
    }

    #[test]
    fn add_and_ticket_shapes() {
        let add = add_product_request(&CreateProductRequest {
            name: "Vase".into(),
            category: "decor".into(),
            price: 30.0,
            stock: 4,
            desc: "Tall".into(),
            pic_info: None,
            dimensions: None,
            material: None,
            weight: None,
            capacity: None,
            care_instructions: None,
        })
        .expect("add");
        assert_eq!(add.method, Method::Post);
        assert_eq!(add.path(), "/api/product-ms/v1/merchant/products");
        assert_eq!(
            add.json_body().and_then(|body| body.get("name")),
            Some(&json!("Vase"))
        );

        let ticket = upload_ticket_request(ImageType::Jpg).expect("ticket");
        assert_eq!(ticket.path(), "/api/product-ms/v1/merchant/images/upload-urls");
        assert_eq!(ticket.json_body(), Some(&json!({"image_type": "jpg"})));
        assert!(ticket.session_scoped);
    }

    #[tokio::test]
    async fn list_decodes_typed_page() {
        let transport = Arc::new(MockTransport::always(
            200,
            json!({
                "code": 200,
                "data": {
                    "list": [{
                        "id": 1, "name": "Mug", "category": "mugs", "price": 12.0,
                        "stock": 3, "desc": "Blue", "status": 1
                    }],
                    "total": 1
                }
            }),
        ));
        let client = ProductClient::new(transport);
        let envelope = client
            .list(&ProductListParams::default())
            .await
            .expect("list");
        assert!(envelope.is_success());
        let page = envelope.data.expect("page");
        assert_eq!(page.total, 1);
        assert_eq!(page.list[0].status, Some(ProductStatus::Published));
    }

    #[tokio::test]
    async fn publish_sends_one_request() {
        let transport = Arc::new(MockTransport::always(200, json!({"code": 200})));
        let client = ProductClient::new(transport.clone());
        let envelope = client.publish(5).await.expect("publish");
        assert!(envelope.is_success());
        let sent = transport.only_request();
        assert_eq!(sent.json_body(), Some(&json!({"status": 1})));
    }
}
