use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use minijinja::{context, Environment};
use serde::{Deserialize, Serialize};

use crate::domain::inventory_item::InventoryItem;
use crate::inventory_client::InventoryClient;

const INDEX_PAGE: &str = include_str!("../../templates/scanner_index.html");
const RESULT_TEMPLATE: &str = "scan_result.html";

/// Compiled HTML templates of the scanner pages.
pub struct ScanTemplates {
    env: Environment<'static>,
}

#[derive(Deserialize, Debug)]
pub struct ScanForm {
    pub barcode: Option<String>,
}

#[derive(Serialize, Debug, PartialEq)]
struct ItemView {
    name: String,
    characteristic: String,
    price: String,
    stock: Vec<StockView>,
}

#[derive(Serialize, Debug, PartialEq)]
struct StockView {
    storage: String,
    series: String,
    count: String,
}

impl From<InventoryItem> for ItemView {
    fn from(item: InventoryItem) -> Self {
        ItemView {
            name: item.name,
            characteristic: item.characteristic,
            price: format!("{:.2}", item.price),
            stock: item
                .stock
                .into_iter()
                .map(|level| StockView {
                    storage: level.storage,
                    series: level.series,
                    count: format!("{:.0}", level.count),
                })
                .collect(),
        }
    }
}

#[derive(thiserror::Error)]
pub enum ScanError {
    #[error("barcode is missing")]
    MissingBarcode,
    #[error("Failed to render the scan result.")]
    Render(#[from] minijinja::Error),
}

impl std::fmt::Debug for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Caused by:\n\t({})", self)
    }
}

impl ResponseError for ScanError {
    fn status_code(&self) -> StatusCode {
        match self {
            ScanError::MissingBarcode => StatusCode::BAD_REQUEST,
            ScanError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ScanError::MissingBarcode => HttpResponse::BadRequest()
                .json(serde_json::json!({ "error": self.to_string() })),
            ScanError::Render(_) => HttpResponse::new(self.status_code()),
        }
    }
}

impl ScanTemplates {
    pub fn new() -> Result<ScanTemplates, minijinja::Error> {
        let mut env = Environment::new();

        env.add_template(
            RESULT_TEMPLATE,
            include_str!("../../templates/scan_result.html"),
        )?;

        Ok(ScanTemplates { env })
    }

    fn render_item(&self, item: InventoryItem) -> Result<String, minijinja::Error> {
        self.env
            .get_template(RESULT_TEMPLATE)?
            .render(context! { item => ItemView::from(item) })
    }

    fn render_error(&self, error: &str) -> Result<String, minijinja::Error> {
        self.env
            .get_template(RESULT_TEMPLATE)?
            .render(context! { error => error })
    }
}

#[tracing::instrument(name = "Serving the scanner page")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(INDEX_PAGE)
}

/// Cross-origin preflight. The CORS headers come from the app-wide defaults.
pub async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}

#[tracing::instrument(
    name = "Scanning a barcode",
    skip(form, inventory, templates),
    fields(barcode = ?form.barcode)
)]
pub async fn scan(
    form: web::Form<ScanForm>,
    inventory: web::Data<InventoryClient>,
    templates: web::Data<ScanTemplates>,
) -> Result<HttpResponse, ScanError> {
    let barcode = form
        .into_inner()
        .barcode
        .map(|barcode| barcode.trim().to_string())
        .filter(|barcode| !barcode.is_empty())
        .ok_or(ScanError::MissingBarcode)?;

    let fragment = match inventory.fetch_item(&barcode).await {
        Ok(item) => templates.render_item(item)?,
        Err(err) => {
            tracing::warn!("Lookup of barcode {} failed: {:?}", barcode, err);
            templates.render_error(&err.to_string())?
        }
    };

    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(fragment))
}
