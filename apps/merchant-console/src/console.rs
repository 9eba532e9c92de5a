//! Guarded command execution.
//!
//! Every command first passes the navigation guard for the page it stands
//! in for, then calls one resource client, classifies the envelope and
//! reports the outcome through the notification sink.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use merchant_api::{MerchantApi, Transport, reviews, transport::encode_segment};
use merchant_core::{
    ActivateRequest, ApiError, CreateProductRequest, Envelope, HOME_PATH, ImageFile, LOGIN_PATH,
    ListOrderRequest, ListOrderResponse, Navigation, NavigationError, NavigationGuard,
    Notification, NotificationEvent, NotificationSink, NotificationStream, OrderDetail,
    OrderStats, OrderStatus, PicInfo, ProductListParams, ReplyReviewRequest, ReviewInfo,
    ReviewListRequest, RouteTable, StoreError, UpdateProductRequest, UserCredentials, classify,
    format::{format_amount, format_date, format_pic_info, status_class, status_name},
};
use merchant_platform::{KeyValueStore, LocalSessionStore};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::broadcast::error::TryRecvError;

use crate::{
    cli::{
        Command, EditProductArgs, NewProductArgs, OrdersCommand, ProductsCommand, ReviewsCommand,
    },
    config::ConfigError,
};

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("session store error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error("sign in required to open {path}")]
    SignInRequired { path: String },
    #[error("already signed in; log out first")]
    AlreadySignedIn,
    #[error("{from} redirected to {to}")]
    Redirected { from: String, to: String },
    /// The backend answered with a failure envelope.
    #[error("{0}")]
    Rejected(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

pub struct Console<T, S: KeyValueStore, N> {
    api: MerchantApi<T>,
    session: Arc<LocalSessionStore<S>>,
    guard: NavigationGuard<Arc<LocalSessionStore<S>>>,
    notifier: N,
    order_page_size: u32,
}

impl<T, S, N> Console<T, S, N>
where
    T: Transport,
    S: KeyValueStore,
    N: NotificationSink,
{
    pub fn new(
        api: MerchantApi<T>,
        session: LocalSessionStore<S>,
        notifier: N,
        order_page_size: u32,
    ) -> Self {
        let session = Arc::new(session);
        Self {
            api,
            guard: NavigationGuard::new(RouteTable::merchant(), Arc::clone(&session)),
            session,
            notifier,
            order_page_size,
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &LocalSessionStore<S> {
        &self.session
    }

    #[cfg(test)]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Run one command and return its JSON output. Failures are also
    /// reported through the notifier.
    pub async fn run(&self, command: Command) -> Result<Value, ConsoleError> {
        let result = self.dispatch(command).await;
        if let Err(err) = &result
            && !matches!(err, ConsoleError::Rejected(_))
        {
            tracing::warn!(error = %err, "command failed");
            self.notifier.error(&err.to_string(), None);
        }
        result
    }

    async fn dispatch(&self, command: Command) -> Result<Value, ConsoleError> {
        match command {
            Command::Login { email, password } => self.login(email, password).await,
            Command::Logout => self.logout().await,
            Command::Register { email, password } => {
                let envelope = self
                    .api
                    .auth
                    .register(&UserCredentials::new(email, password))
                    .await?;
                let data = self.settle(
                    Envelope::from(envelope),
                    Some("Registration successful, check your email for the activation code"),
                    "Registration failed",
                )?;
                Ok(acknowledged(data))
            }
            Command::Activate { code } => {
                let envelope = self.api.auth.activate(&ActivateRequest { code }).await?;
                let data = self.settle(
                    Envelope::from(envelope),
                    Some("Account activated"),
                    "Activation failed",
                )?;
                Ok(acknowledged(data))
            }
            Command::Products(command) => self.products(command).await,
            Command::Orders(command) => self.orders(command).await,
            Command::Reviews(command) => self.reviews(command).await,
            Command::Upload { files } => {
                self.enter("/products/add")?;
                let image_ids = self.upload_files(&files).await?;
                self.notifier
                    .success(&format!("Uploaded {} image(s)", image_ids.len()), None);
                Ok(json!({
                    "pic_info": format_pic_info(&image_ids),
                    "image_ids": image_ids,
                }))
            }
            Command::Navigate { path } => {
                let navigation = self.guard.navigate(HOME_PATH, &path)?;
                Ok(navigation_output(&navigation))
            }
        }
    }

    async fn login(&self, email: String, password: String) -> Result<Value, ConsoleError> {
        self.enter(LOGIN_PATH)?;
        let credentials = UserCredentials::new(email, password);
        let outcome = self
            .api
            .auth
            .sign_in(&credentials, self.session.as_ref())
            .await?;
        if !outcome.is_success() {
            return Err(self.reject(outcome.message()));
        }

        self.session.set_cookies(&outcome.cookies)?;
        self.notifier.success("Login successful", None);
        Ok(json!({ "signed_in": true, "email": credentials.email }))
    }

    async fn logout(&self) -> Result<Value, ConsoleError> {
        match self.api.auth.sign_out(self.session.as_ref()).await {
            Ok(_) => self.notifier.success("Logged out", None),
            Err(ApiError { message, .. }) => self
                .notifier
                .warning(&format!("Signed out locally: {message}"), None),
        }
        Ok(json!({ "signed_in": false }))
    }

    async fn products(&self, command: ProductsCommand) -> Result<Value, ConsoleError> {
        let products = &self.api.products;
        match command {
            ProductsCommand::List {
                keyword,
                category,
                offset,
                order_by,
            } => {
                self.enter("/products")?;
                let params = ProductListParams {
                    keyword,
                    category,
                    offset,
                    order_by,
                };
                let envelope = products.list(&params).await?;
                let data = self.settle(Envelope::from(envelope), None, "Failed to load products")?;
                Ok(serde_json::to_value(data)?)
            }
            ProductsCommand::Get { id } => {
                self.enter(&format!("/products/{id}"))?;
                let envelope = products.get(id).await?;
                let data = self.settle(Envelope::from(envelope), None, "Failed to load product")?;
                Ok(serde_json::to_value(data)?)
            }
            ProductsCommand::Add(args) => self.add_product(args).await,
            ProductsCommand::Publish { id } => {
                self.enter(&format!("/products/{id}"))?;
                let envelope = products.publish(id).await?;
                let data = self.settle(
                    Envelope::from(envelope),
                    Some("Product published"),
                    "Failed to publish product",
                )?;
                Ok(acknowledged(data))
            }
            ProductsCommand::Unpublish { id } => {
                self.enter(&format!("/products/{id}"))?;
                let envelope = products.unpublish(id).await?;
                let data = self.settle(
                    Envelope::from(envelope),
                    Some("Product unpublished"),
                    "Failed to unpublish product",
                )?;
                Ok(acknowledged(data))
            }
            ProductsCommand::Stock { id, stock } => {
                self.enter(&format!("/products/{id}"))?;
                let envelope = products.update_stock(id, stock).await?;
                let data = self.settle(
                    Envelope::from(envelope),
                    Some("Stock updated"),
                    "Failed to update stock",
                )?;
                Ok(acknowledged(data))
            }
            ProductsCommand::Edit(args) => self.edit_product(args).await,
        }
    }

    async fn add_product(&self, args: NewProductArgs) -> Result<Value, ConsoleError> {
        self.enter("/products/add")?;
        let image_ids = self.upload_files(&args.images).await?;
        let details = args.details;
        let product = CreateProductRequest {
            name: args.name,
            category: args.category,
            price: args.price,
            stock: args.stock,
            desc: args.desc,
            pic_info: (!image_ids.is_empty()).then_some(PicInfo::Many(image_ids)),
            dimensions: details.dimensions,
            material: details.material,
            weight: details.weight,
            capacity: details.capacity,
            care_instructions: details.care_instructions,
        };
        let envelope = self.api.products.add(&product).await?;
        let data = self.settle(
            Envelope::from(envelope),
            Some("Product created"),
            "Failed to create product",
        )?;
        Ok(acknowledged(data))
    }

    async fn edit_product(&self, args: EditProductArgs) -> Result<Value, ConsoleError> {
        self.enter(&format!("/products/{}", args.id))?;
        let image_ids = self.upload_files(&args.images).await?;
        let details = args.details;
        let update = UpdateProductRequest {
            id: args.id,
            name: args.name,
            category: args.category,
            price: args.price,
            desc: args.desc,
            dimensions: details.dimensions,
            material: details.material,
            weight: details.weight,
            capacity: details.capacity,
            care_instructions: details.care_instructions,
            pic_info: (!image_ids.is_empty()).then(|| format_pic_info(&image_ids)),
        };
        let envelope = self.api.products.edit(&update).await?;
        let data = self.settle(
            Envelope::from(envelope),
            Some("Product updated"),
            "Failed to update product",
        )?;
        Ok(acknowledged(data))
    }

    async fn orders(&self, command: OrdersCommand) -> Result<Value, ConsoleError> {
        let orders = &self.api.orders;
        match command {
            OrdersCommand::List {
                offset,
                limit,
                status,
                order_no,
            } => {
                self.enter("/orders")?;
                let mut filter =
                    ListOrderRequest::page(limit.unwrap_or(self.order_page_size), offset);
                filter.order_status = status.as_deref().map(parse_order_status).transpose()?;
                filter.order_no = order_no.filter(|value| !value.is_empty());
                let envelope = orders.list(&filter).await?;
                let data = self.settle(Envelope::from(envelope), None, "Failed to load orders")?;
                Ok(data.map(|page| order_list_output(&page)).unwrap_or(Value::Null))
            }
            OrdersCommand::Detail { order_no } => {
                self.enter(&format!("/orders/{}", encode_segment(&order_no)))?;
                let envelope = orders.detail(&order_no).await?;
                let data = self.settle(Envelope::from(envelope), None, "Failed to load order")?;
                Ok(data.map(|detail| order_detail_output(&detail)).unwrap_or(Value::Null))
            }
            OrdersCommand::Ship {
                order_no,
                tracking_no,
            } => {
                self.enter(&format!("/orders/{}", encode_segment(&order_no)))?;
                let envelope = orders.ship(&order_no, &tracking_no).await?;
                let data = self.settle(
                    Envelope::from(envelope),
                    Some("Order shipped"),
                    "Failed to ship order",
                )?;
                Ok(acknowledged(data))
            }
            OrdersCommand::Stats => {
                self.enter(HOME_PATH)?;
                let envelope = orders.stats().await?;
                let data =
                    self.settle(Envelope::from(envelope), None, "Failed to load order stats")?;
                Ok(data.map(|stats| stats_output(&stats)).unwrap_or(Value::Null))
            }
        }
    }

    async fn reviews(&self, command: ReviewsCommand) -> Result<Value, ConsoleError> {
        self.enter("/reviews")?;
        let client = &self.api.reviews;
        match command {
            ReviewsCommand::List { product_id, stars } => {
                let envelope = client
                    .list(&ReviewListRequest { product_id, stars })
                    .await?;
                let data = self.settle(Envelope::from(envelope), None, "Failed to load reviews")?;
                Ok(review_list_output(&data.unwrap_or_default()))
            }
            ReviewsCommand::Reply {
                review_id,
                product_id,
                content,
                anonymous,
            } => {
                let reply = ReplyReviewRequest {
                    content,
                    is_anonymous: anonymous,
                    parent_id: review_id,
                    pic_info: None,
                    product_id,
                    stars: 0,
                };
                let envelope = client.reply(&reply).await;
                let data = self.settle(
                    Envelope::from(envelope),
                    Some("Reply posted"),
                    reviews::REPLY_FAILED_MESSAGE,
                )?;
                Ok(serde_json::to_value(data)?)
            }
            ReviewsCommand::Delete { review_id } => {
                let envelope = client.delete(&review_id).await;
                let data = self.settle(
                    Envelope::from(envelope),
                    Some("Review deleted"),
                    reviews::DELETE_FAILED_MESSAGE,
                )?;
                Ok(acknowledged(data))
            }
            ReviewsCommand::Pin { review_id } => {
                let envelope = client.set_pinned(&review_id, true).await;
                let data = self.settle(
                    Envelope::from(envelope),
                    Some("Review pinned"),
                    reviews::PIN_FAILED_MESSAGE,
                )?;
                Ok(acknowledged(data))
            }
            ReviewsCommand::Unpin { review_id } => {
                let envelope = client.set_pinned(&review_id, false).await;
                let data = self.settle(
                    Envelope::from(envelope),
                    Some("Review unpinned"),
                    reviews::PIN_FAILED_MESSAGE,
                )?;
                Ok(acknowledged(data))
            }
        }
    }

    /// Pass the guard for `path`. Any redirect aborts the command.
    fn enter(&self, path: &str) -> Result<Navigation, ConsoleError> {
        let navigation = self.guard.navigate(HOME_PATH, path)?;
        if !navigation.was_redirected() {
            return Ok(navigation);
        }
        if navigation.path == LOGIN_PATH {
            Err(ConsoleError::SignInRequired {
                path: path.to_owned(),
            })
        } else if path == LOGIN_PATH {
            Err(ConsoleError::AlreadySignedIn)
        } else {
            Err(ConsoleError::Redirected {
                from: path.to_owned(),
                to: navigation.path,
            })
        }
    }

    /// Classify an envelope, notify, and hand back its data on success.
    fn settle<D>(
        &self,
        envelope: Envelope<D>,
        success: Option<&str>,
        failure: &str,
    ) -> Result<Option<D>, ConsoleError> {
        let verdict = classify(&envelope, failure);
        if !verdict.ok {
            return Err(self.reject(verdict.message));
        }
        if let Some(message) = success {
            self.notifier.success(message, None);
        }
        Ok(envelope.into_data())
    }

    fn reject(&self, message: String) -> ConsoleError {
        tracing::warn!(%message, "backend rejected request");
        self.notifier.error(&message, None);
        ConsoleError::Rejected(message)
    }

    async fn upload_files(&self, paths: &[PathBuf]) -> Result<Vec<String>, ConsoleError> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let files = paths
            .iter()
            .map(|path| read_image(path))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.api.uploads.upload_all(files).await?)
    }
}

fn read_image(path: &Path) -> Result<ImageFile, ConsoleError> {
    let bytes = std::fs::read(path).map_err(|source| ConsoleError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let media_type = ImageFile::media_type_for_name(&name);
    Ok(ImageFile::new(name, media_type, bytes))
}

/// Accepts a status code (`2`) or label (`paid`).
pub fn parse_order_status(value: &str) -> Result<u8, ConsoleError> {
    let value = value.trim();
    let status = match value.parse::<u8>() {
        Ok(code) => OrderStatus::from_code(code),
        Err(_) => OrderStatus::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(value)),
    };
    status
        .map(OrderStatus::as_code)
        .ok_or_else(|| ConsoleError::InvalidArgument(format!("unknown order status '{value}'")))
}

fn acknowledged(data: Option<Value>) -> Value {
    json!({ "ok": true, "data": data })
}

fn navigation_output(navigation: &Navigation) -> Value {
    json!({
        "path": navigation.path,
        "route": navigation.route.name,
        "requires_auth": navigation.route.requires_auth,
        "params": navigation.params,
        "redirected_from": navigation.redirected_from,
    })
}

fn order_list_output(page: &ListOrderResponse) -> Value {
    let orders: Vec<Value> = page
        .orders
        .iter()
        .map(|order| {
            json!({
                "order_no": order.order_no,
                "receiver": format!("{} {}", order.receiver_first_name, order.receiver_last_name),
                "phone": order.receiver_phone,
                "created": format_date(&order.create_time),
                "total": format_amount(order.total_amount),
                "status": status_name(&order.status),
                "status_class": status_class(&order.status),
            })
        })
        .collect();
    json!({ "total": page.total, "orders": orders })
}

fn order_detail_output(detail: &OrderDetail) -> Value {
    let items: Vec<Value> = detail
        .order_items
        .iter()
        .map(|item| {
            json!({
                "product_id": item.product_id,
                "product_name": item.product_name,
                "quantity": item.quantity,
                "price": format_amount(item.price),
                "total": format_amount(item.total_price),
            })
        })
        .collect();
    let history: Vec<Value> = detail
        .status_logs
        .iter()
        .map(|log| {
            json!({
                "status": log.status_name,
                "time": format_date(&log.create_time),
                "remark": log.remark,
            })
        })
        .collect();

    json!({
        "order_no": detail.order_no,
        "status": status_name(&detail.status_name),
        "status_class": status_class(&detail.status_name),
        "total": format_amount(detail.total_amount),
        "paid": format_amount(detail.pay_amount),
        "shipping_fee": format_amount(detail.shipping_fee),
        "tax": format_amount(detail.tax),
        "created": format_date(&detail.create_time),
        "pay_time": format_date(&detail.pay_time),
        "delivery_time": format_date(&detail.delivery_time),
        "confirm_time": format_date(&detail.confirm_time),
        "receiver": {
            "name": format!("{} {}", detail.receiver_first_name, detail.receiver_last_name),
            "phone": detail.receiver_phone,
            "address": detail.receiver_address,
            "country": detail.receiver_country,
            "zip_code": detail.receiver_zip_code,
        },
        "logistics_no": detail.logistics_no,
        "remark": detail.remark,
        "items": items,
        "history": history,
    })
}

fn stats_output(stats: &OrderStats) -> Value {
    json!({
        "total_sales": format_amount(stats.total_sales),
        "total_orders": stats.total_orders,
        "avg_sales_per_order": format_amount(stats.avg_sales_per_order),
        "total_customers": stats.total_customers,
    })
}

fn review_list_output(reviews: &[ReviewInfo]) -> Value {
    reviews
        .iter()
        .map(|review| {
            json!({
                "id": review.id,
                "product_id": review.product_id,
                "stars": review.stars,
                "content": review.content,
                "pinned": review.is_pinned,
                "anonymous": review.is_anonymous,
                "likes": review.likes,
                "images": review.pic_info,
                "created": format_date(&review.created_at),
            })
        })
        .collect()
}

/// One terminal line per notification.
pub fn render_notification(notification: &Notification) -> String {
    let kind = format!("{:?}", notification.kind).to_ascii_lowercase();
    let color = notification.kind.color();
    match &notification.title {
        Some(title) => format!("[{kind} {color}] {title}: {}", notification.message),
        None => format!("[{kind} {color}] {}", notification.message),
    }
}

/// Collect notifications already shown on `stream` without waiting.
pub fn drain_shown(stream: &mut NotificationStream) -> Vec<Notification> {
    let mut shown = Vec::new();
    loop {
        match stream.try_recv() {
            Ok(NotificationEvent::Shown(notification)) => shown.push(notification),
            Ok(NotificationEvent::Dismissed { .. }) | Err(TryRecvError::Lagged(_)) => {}
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    shown
}
