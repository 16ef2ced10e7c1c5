//! Store API payloads.
//!
//! Only the fields the storefront renders are modelled; everything else in
//! the backend's JSON is ignored. Lists the backend may send as `null` are
//! read as empty.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use dbk_core::address::{CountryRef, DraftAddress};
use dbk_core::pagination::Identified;
use dbk_core::pricing::{PricePoint, lowest_price};
use dbk_core::variant::VariantOptions;
use dbk_core::{
    CartId, CategoryId, CollectionId, CurrencyCode, CustomerAddressId, LineItemId, Money, OrderId,
    ProductId, RegionId, ReviewId, ShippingOptionId, VariantId,
};

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Regions
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    #[serde(default)]
    pub currency_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub countries: Vec<Country>,
}

impl Region {
    /// Countries in the shape address resolution expects.
    #[must_use]
    pub fn country_refs(&self) -> Vec<CountryRef<'_>> {
        self.countries
            .iter()
            .map(|c| CountryRef {
                iso_2: &c.iso_2,
                display_name: c.display_name.as_deref().unwrap_or_default(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    pub iso_2: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegionList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub regions: Vec<Region>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegionEnvelope {
    pub region: Region,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<ProductImage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<ProductOption>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub variants: Vec<ProductVariant>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<ProductCategory>,
    #[serde(default)]
    pub collection_id: Option<CollectionId>,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Product {
    /// Ids of the product's option dimensions.
    #[must_use]
    pub fn option_ids(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.id.as_str()).collect()
    }

    /// Path segment used in product links: the handle, else the id.
    #[must_use]
    pub fn slug(&self) -> &str {
        self.handle
            .as_deref()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| self.id.as_str())
    }

    /// Cheapest priced variant, for listing cards.
    #[must_use]
    pub fn lowest_price(&self) -> Option<PricePoint> {
        let points: Vec<PricePoint> = self
            .variants
            .iter()
            .filter_map(ProductVariant::price_point)
            .collect();
        lowest_price(&points).copied()
    }

    /// `metadata.video_url`, when set to a non-empty string.
    #[must_use]
    pub fn video_url(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("video_url"))
            .and_then(serde_json::Value::as_str)
            .filter(|url| !url.trim().is_empty())
    }

    /// Image URLs, falling back to the thumbnail.
    #[must_use]
    pub fn image_urls(&self) -> Vec<&str> {
        let urls: Vec<&str> = self.images.iter().map(|img| img.url.as_str()).collect();
        if urls.is_empty() {
            self.thumbnail.as_deref().into_iter().collect()
        } else {
            urls
        }
    }

    #[must_use]
    pub fn primary_category(&self) -> Option<&ProductCategory> {
        self.categories.first()
    }
}

impl Identified for Product {
    fn id(&self) -> &str {
        self.id.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductImage {
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductOption {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub values: Vec<ProductOptionValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductOptionValue {
    #[serde(default)]
    pub id: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<VariantOptionValue>,
    #[serde(default)]
    pub calculated_price: Option<CalculatedPrice>,
}

impl ProductVariant {
    /// Display price: tax-inclusive amount when available, with the original
    /// amount as compare-at only for sale price lists.
    #[must_use]
    pub fn price_point(&self) -> Option<PricePoint> {
        let calc = self.calculated_price.as_ref()?;
        let amount = calc.calculated_amount_with_tax.or(calc.calculated_amount)?;
        let compare_at = if calc.is_sale() {
            calc.original_amount_with_tax.or(calc.original_amount)
        } else {
            None
        };
        let currency = calc
            .currency_code
            .as_deref()
            .map(CurrencyCode::parse)
            .unwrap_or_default();
        Some(PricePoint::new(amount, compare_at, currency))
    }
}

impl VariantOptions for ProductVariant {
    fn option_values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|o| {
            (
                o.option_id.as_deref().unwrap_or_default(),
                o.value.as_str(),
            )
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantOptionValue {
    #[serde(default)]
    pub id: Option<String>,
    pub value: String,
    #[serde(default)]
    pub option_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatedPrice {
    #[serde(default)]
    pub calculated_amount: Option<Decimal>,
    #[serde(default)]
    pub calculated_amount_with_tax: Option<Decimal>,
    #[serde(default)]
    pub original_amount: Option<Decimal>,
    #[serde(default)]
    pub original_amount_with_tax: Option<Decimal>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub calculated_price: Option<PriceListInfo>,
}

impl CalculatedPrice {
    fn is_sale(&self) -> bool {
        self.calculated_price
            .as_ref()
            .and_then(|p| p.price_list_type.as_deref())
            == Some("sale")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceListInfo {
    #[serde(default)]
    pub price_list_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCategory {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub handle: String,
}

impl Identified for ProductCategory {
    fn id(&self) -> &str {
        self.id.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub title: String,
    #[serde(default)]
    pub handle: String,
}

/// One page of a product listing plus the listing's total size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub products: Vec<Product>,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub product_categories: Vec<ProductCategory>,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CollectionList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub collections: Vec<Collection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Banner {
    pub id: String,
    pub image_url: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub collection_handle: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BannerList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub banners: Vec<Banner>,
}

// =============================================================================
// Reviews
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Identified for Review {
    fn id(&self) -> &str {
        self.id.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewInput {
    pub product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    pub rating: u8,
    pub first_name: String,
    pub last_name: String,
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    #[serde(default)]
    pub region_id: Option<RegionId>,
    #[serde(default)]
    pub region: Option<Region>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub shipping_methods: Vec<ShippingMethod>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub promotions: Vec<Promotion>,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub item_subtotal: Option<Decimal>,
    #[serde(default)]
    pub discount_total: Option<Decimal>,
    #[serde(default)]
    pub shipping_total: Option<Decimal>,
    #[serde(default)]
    pub tax_total: Option<Decimal>,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub original_total: Option<Decimal>,
}

impl Cart {
    #[must_use]
    pub fn currency(&self) -> CurrencyCode {
        self.currency_code
            .as_deref()
            .map(CurrencyCode::parse)
            .unwrap_or_default()
    }

    /// Wrap a backend amount in the cart's currency; missing amounts are zero.
    #[must_use]
    pub fn money(&self, amount: Option<Decimal>) -> Money {
        Money::new(amount.unwrap_or_default(), self.currency())
    }

    /// Sum of line quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Phone from the shipping address, else the billing address.
    #[must_use]
    pub fn contact_phone(&self) -> Option<&str> {
        [&self.shipping_address, &self.billing_address]
            .into_iter()
            .flatten()
            .find_map(|a| a.phone.as_deref().filter(|p| !p.trim().is_empty()))
    }

    /// Shipping option the first shipping method was created from.
    #[must_use]
    pub fn selected_shipping_option(&self) -> Option<&ShippingOptionId> {
        self.shipping_methods
            .first()
            .and_then(|m| m.shipping_option_id.as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub product_title: Option<String>,
    #[serde(default)]
    pub product_handle: Option<String>,
    #[serde(default)]
    pub variant_title: Option<String>,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub total: Option<Decimal>,
}

/// A postal address as the backend stores it on carts and customers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub address_1: Option<String>,
    #[serde(default)]
    pub address_2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl From<&Address> for DraftAddress {
    fn from(address: &Address) -> Self {
        Self {
            first_name: address.first_name.clone(),
            last_name: address.last_name.clone(),
            address_1: address.address_1.clone(),
            address_2: address.address_2.clone(),
            postal_code: address.postal_code.clone(),
            city: address.city.clone(),
            province: address.province.clone(),
            company: address.company.clone(),
            country_code: address.country_code.clone(),
            phone: address.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub id: String,
    #[serde(default)]
    pub shipping_option_id: Option<ShippingOptionId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartEnvelope {
    pub cart: Cart,
}

/// Deletions answer with the updated parent object.
#[derive(Debug, Deserialize)]
pub(crate) struct ParentEnvelope<T> {
    pub parent: T,
}

/// Fields written by a cart update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CartUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<RegionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<DraftAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<DraftAddress>,
}

impl CartUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.region_id.is_none()
            && self.email.is_none()
            && self.shipping_address.is_none()
            && self.billing_address.is_none()
    }
}

// =============================================================================
// Fulfillment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingPriceType {
    Flat,
    Calculated,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingOption {
    pub id: ShippingOptionId,
    pub name: String,
    pub price_type: ShippingPriceType,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShippingOptionList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub shipping_options: Vec<ShippingOption>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShippingOptionEnvelope {
    pub shipping_option: ShippingOption,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub display_id: Option<u64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub total: Option<Decimal>,
}

/// Result of asking the backend to turn a cart into an order.
#[derive(Debug, Clone)]
pub enum CompleteCartOutcome {
    /// The order was placed.
    Order(Box<Order>),
    /// The cart could not be completed; the backend may say why.
    Cart {
        cart: Box<Cart>,
        error: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum CompleteCartResponse {
    Order {
        order: Box<Order>,
    },
    Cart {
        cart: Box<Cart>,
        #[serde(default)]
        error: Option<CompletionError>,
    },
}

/// The completion error arrives either as a bare string or as an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CompletionError {
    Message(String),
    Detailed { message: String },
}

impl From<CompleteCartResponse> for CompleteCartOutcome {
    fn from(response: CompleteCartResponse) -> Self {
        match response {
            CompleteCartResponse::Order { order } => Self::Order(order),
            CompleteCartResponse::Cart { cart, error } => Self::Cart {
                cart,
                error: error.map(|e| match e {
                    CompletionError::Message(message) | CompletionError::Detailed { message } => {
                        message
                    }
                }),
            },
        }
    }
}

// =============================================================================
// Customers
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub addresses: Vec<CustomerAddress>,
}

impl Customer {
    #[must_use]
    pub fn address(&self, id: &CustomerAddressId) -> Option<&CustomerAddress> {
        self.addresses.iter().find(|a| &a.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerAddress {
    pub id: CustomerAddressId,
    #[serde(flatten)]
    pub address: Address,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomerEnvelope {
    pub customer: Customer,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CustomerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerCreate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dbk_core::variant::OptionSelection;
    use dbk_core::variant::resolve;

    use super::*;

    const PRODUCT_JSON: &str = r#"{
        "id": "prod_1",
        "title": "Linen Saree",
        "handle": "linen-saree",
        "description": null,
        "images": [{"id": "img_1", "url": "/static/linen.jpg"}],
        "options": [{"id": "opt_size", "title": "Size", "values": [{"id": "v1", "value": "S"}, {"id": "v2", "value": "M"}]}],
        "variants": [
            {"id": "variant_s", "title": "S", "options": [{"id": "v1", "value": "S", "option_id": "opt_size"}],
             "calculated_price": {"calculated_amount": 1999, "original_amount": 2999, "currency_code": "inr",
                                  "calculated_price": {"price_list_type": "sale"}}},
            {"id": "variant_m", "title": "M", "options": [{"id": "v2", "value": "M", "option_id": "opt_size"}],
             "calculated_price": {"calculated_amount": 2199, "calculated_amount_with_tax": 2299, "original_amount": 2999, "currency_code": "inr",
                                  "calculated_price": {"price_list_type": null}}}
        ],
        "categories": null,
        "metadata": {"video_url": "/static/reel.mp4"}
    }"#;

    #[test]
    fn test_product_deserializes_with_nulls() {
        let product: Product = serde_json::from_str(PRODUCT_JSON).unwrap();
        assert_eq!(product.slug(), "linen-saree");
        assert!(product.categories.is_empty());
        assert_eq!(product.video_url(), Some("/static/reel.mp4"));
        assert_eq!(product.image_urls(), vec!["/static/linen.jpg"]);
    }

    #[test]
    fn test_price_point_only_compares_sale_prices() {
        let product: Product = serde_json::from_str(PRODUCT_JSON).unwrap();
        let sale = product.variants[0].price_point().unwrap();
        assert_eq!(sale.percent_off(), Some(33));

        let regular = product.variants[1].price_point().unwrap();
        assert_eq!(regular.amount, Decimal::from(2299));
        assert!(regular.compare_at.is_none());
    }

    #[test]
    fn test_lowest_price_across_variants() {
        let product: Product = serde_json::from_str(PRODUCT_JSON).unwrap();
        let best = product.lowest_price().unwrap();
        assert_eq!(best.amount, Decimal::from(1999));
    }

    #[test]
    fn test_variant_resolution_on_backend_types() {
        let product: Product = serde_json::from_str(PRODUCT_JSON).unwrap();
        let selection: OptionSelection = [("opt_size", "M")].into_iter().collect();
        let variant = resolve(&selection, &product.option_ids(), &product.variants).unwrap();
        assert_eq!(variant.id.as_str(), "variant_m");
    }

    #[test]
    fn test_complete_cart_response_variants() {
        let order: CompleteCartResponse =
            serde_json::from_str(r#"{"type": "order", "order": {"id": "order_1", "display_id": 7}}"#)
                .unwrap();
        assert!(matches!(
            CompleteCartOutcome::from(order),
            CompleteCartOutcome::Order(o) if o.id.as_str() == "order_1"
        ));

        let failed: CompleteCartResponse = serde_json::from_str(
            r#"{"type": "cart", "cart": {"id": "cart_1"}, "error": {"message": "Payment declined", "name": "x", "type": "y"}}"#,
        )
        .unwrap();
        match CompleteCartOutcome::from(failed) {
            CompleteCartOutcome::Cart { error, .. } => {
                assert_eq!(error.as_deref(), Some("Payment declined"));
            }
            CompleteCartOutcome::Order(_) => panic!("expected cart outcome"),
        }
    }

    #[test]
    fn test_cart_helpers() {
        let cart: Cart = serde_json::from_str(
            r#"{
                "id": "cart_1",
                "currency_code": "inr",
                "items": [{"id": "item_1", "title": "S", "quantity": 2}, {"id": "item_2", "title": "M", "quantity": 1}],
                "shipping_address": {"phone": ""},
                "billing_address": {"phone": "+91 90000 00000"},
                "shipping_methods": [{"id": "sm_1", "shipping_option_id": "so_1"}],
                "total": 4000
            }"#,
        )
        .unwrap();

        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.contact_phone(), Some("+91 90000 00000"));
        assert_eq!(cart.selected_shipping_option().unwrap().as_str(), "so_1");
        assert_eq!(cart.money(cart.total).format(), "₹4,000.00");
    }

    #[test]
    fn test_customer_address_flattens() {
        let customer: Customer = serde_json::from_str(
            r#"{"id": "cus_1", "email": "a@b.c", "addresses": [{"id": "addr_1", "city": "Pune", "phone": "1"}]}"#,
        )
        .unwrap();
        let address = customer.address(&CustomerAddressId::new("addr_1")).unwrap();
        assert_eq!(address.address.city.as_deref(), Some("Pune"));
    }
}
