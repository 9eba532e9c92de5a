//! Request and record types exchanged with the merchant backend services.
//!
//! Field names follow the wire format exactly, including the camel-cased
//! `parentID`/`productID` used by the comment service.

use serde::{Deserialize, Deserializer, Serialize};

/// Login or registration credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub email: String,
    pub password: String,
}

impl UserCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: None,
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Account activation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivateRequest {
    pub code: String,
}

/// Product listing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductStatus {
    Unpublished,
    Published,
}

impl ProductStatus {
    pub fn as_code(self) -> u8 {
        match self {
            Self::Unpublished => 0,
            Self::Published => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unpublished),
            1 => Some(Self::Published),
            _ => None,
        }
    }
}

impl Serialize for ProductStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_code())
    }
}

impl<'de> Deserialize<'de> for ProductStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown product status {code}")))
    }
}

/// Product image references: one identifier or a list of them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PicInfo {
    Single(String),
    Many(Vec<String>),
}

/// Product as returned by the product service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub stock: i64,
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pic_info: Option<PicInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub care_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
}

/// New product submitted by the merchant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateProductRequest {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub stock: i64,
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pic_info: Option<PicInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub care_instructions: Option<String>,
}

/// Partial product update. `id` selects the product and is never sent in the body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateProductRequest {
    #[serde(skip_serializing)]
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub care_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pic_info: Option<String>,
}

/// Image extension accepted by the upload ticket endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Jpg,
    Jpeg,
    Png,
}

/// Body of an upload ticket request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageUploadRequest {
    pub image_type: ImageType,
}

/// Merchant product list filters. Unset fields are left out of the query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductListParams {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub offset: Option<u32>,
    /// 0: newest update first, 1: oldest update first.
    pub order_by: Option<u8>,
}

/// One page of merchant products.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductListResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub list: Vec<ProductInfo>,
    pub total: u64,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub has_more: Option<bool>,
}

/// Order lifecycle codes used by list filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Created,
    Paid,
    Shipped,
    Delivered,
    Confirmed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [Self; 6] = [
        Self::Created,
        Self::Paid,
        Self::Shipped,
        Self::Delivered,
        Self::Confirmed,
        Self::Cancelled,
    ];

    pub fn as_code(self) -> u8 {
        match self {
            Self::Created => 1,
            Self::Paid => 2,
            Self::Shipped => 3,
            Self::Delivered => 4,
            Self::Confirmed => 5,
            Self::Cancelled => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_code() == code)
    }

    /// Label used by the order service in list rows.
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Paid => "Paid",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Confirmed => "Confirmed",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.label() == label)
    }
}

/// Order row as shown in the merchant order list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderInfoInList {
    pub order_no: String,
    pub receiver_first_name: String,
    pub receiver_last_name: String,
    pub receiver_phone: String,
    pub create_time: String,
    /// Cents.
    pub total_amount: i64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItemDetail {
    pub id: u64,
    pub product_id: u64,
    pub product_name: String,
    pub price: i64,
    pub quantity: u32,
    pub total_price: i64,
    pub create_time: String,
    pub update_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderStatusLogDetail {
    pub id: u64,
    pub current_status: u8,
    pub status_name: String,
    pub create_time: String,
    pub remark: String,
}

/// Full order detail. Amounts are in cents; unset timestamps use the zero date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderDetail {
    pub order_no: String,
    pub user_id: u64,
    pub status: u8,
    pub status_name: String,
    pub total_amount: i64,
    pub pay_amount: i64,
    pub shipping_fee: i64,
    pub tax: i64,
    pub pay_time: String,
    pub create_time: String,
    pub update_time: String,
    pub delivery_time: String,
    pub confirm_time: String,
    pub receiver_first_name: String,
    pub receiver_last_name: String,
    pub receiver_phone: String,
    pub receiver_address: String,
    pub receiver_country: String,
    pub receiver_zip_code: u64,
    pub remark: String,
    pub logistics_no: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub order_items: Vec<OrderItemDetail>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status_logs: Vec<OrderStatusLogDetail>,
}

/// Order list filter, sent as a POST body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListOrderRequest {
    pub limit: u32,
    pub offset: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_status: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl ListOrderRequest {
    pub fn page(limit: u32, offset: u32) -> Self {
        Self {
            limit,
            offset,
            order_no: None,
            order_status: None,
            user_id: None,
            start_time: None,
            end_time: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListOrderResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub orders: Vec<OrderInfoInList>,
    pub total: u64,
}

/// Dashboard totals. Sales figures are in cents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderStats {
    pub total_sales: i64,
    pub total_orders: u64,
    pub avg_sales_per_order: i64,
    pub total_customers: u64,
}

/// Review list filters. `0` (or unset) means "all".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewListRequest {
    pub product_id: Option<u64>,
    pub stars: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewInfo {
    pub id: String,
    pub content: String,
    pub user_id: u64,
    pub product_id: u64,
    pub parent_id: String,
    pub stars: u8,
    pub is_anonymous: bool,
    pub is_pinned: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pic_info: Vec<String>,
    pub created_at: String,
    pub likes: u64,
    pub current_user_liked: bool,
}

/// Merchant reply to a review. `parentID` selects the review in the path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyReviewRequest {
    pub content: String,
    pub is_anonymous: bool,
    #[serde(rename = "parentID")]
    pub parent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pic_info: Option<Vec<String>>,
    #[serde(rename = "productID")]
    pub product_id: u64,
    pub stars: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyReviewData {
    pub review_id: String,
    pub reply_text: String,
    pub reply_date: String,
}


/// Go services encode an empty slice as `null`; read it as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
