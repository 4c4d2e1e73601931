use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub characteristic: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: Vec<StockLevel>,
}

/// Stock of one series in one storage.
#[derive(Debug, Clone, Deserialize)]
pub struct StockLevel {
    #[serde(default)]
    pub storage: String,
    #[serde(default)]
    pub series: String,
    #[serde(default)]
    pub count: f64,
}

impl InventoryItem {
    /// The inventory API answers unknown barcodes with an empty item.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.stock.is_empty()
    }
}
