//! Checkout route handlers.
//!
//! The confirm page is one form per section. Each post updates the session
//! draft (or the cart directly, for shipping), writes what is complete to the
//! cart and redirects back, so a refresh never re-submits.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use dbk_core::address::{DraftAddress, filled};
use dbk_core::{CustomerAddressId, OrderId, ShippingOptionId};

use crate::error::AppError;
use crate::filters;
use crate::medusa::{Cart, Customer, CustomerAddress, Region};
use crate::middleware::{CspNonce, OptionalCustomer, RequireCustomer};
use crate::models::CheckoutDraft;
use crate::services::{
    CartProvider, CheckoutService, CustomerProvider, PlaceOrder, PricedOption, RegionProvider,
    priced_options, validate_for_payment,
};
use crate::state::AppState;

use super::cart::CartView;
use super::{MessageQuery, redirect_with};

const CONFIRM_PATH: &str = "/checkout/confirm";
const ADD_ADDRESS_FAILED: &str = "Failed to add address";

// =============================================================================
// Views
// =============================================================================

/// Contact section display data.
#[derive(Clone)]
pub struct ContactView {
    pub email: String,
    pub registered: bool,
}

/// A saved address in the delivery select.
#[derive(Clone)]
pub struct SavedAddressView {
    pub id: String,
    pub label: String,
    pub selected: bool,
}

impl SavedAddressView {
    fn new(saved: &CustomerAddress, selected: Option<&CustomerAddressId>) -> Self {
        Self {
            id: saved.id.to_string(),
            label: address_label(&DraftAddress::from(&saved.address)),
            selected: selected == Some(&saved.id),
        }
    }
}

/// One line summary of an address.
///
/// ```text
/// Asha Rao · 12 MG Road, Bengaluru 560001 • +91 98450 00000
/// ```
#[must_use]
pub fn address_label(address: &DraftAddress) -> String {
    let name = [address.first_name.as_deref(), address.last_name.as_deref()]
        .into_iter()
        .filter_map(filled)
        .collect::<Vec<_>>()
        .join(" ");
    let place = [address.city.as_deref(), address.postal_code.as_deref()]
        .into_iter()
        .filter_map(filled)
        .collect::<Vec<_>>()
        .join(" ");
    let street = [filled(address.address_1.as_deref()), filled(Some(&place))]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");

    let mut label = [filled(Some(&name)), filled(Some(&street))]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" · ");
    if let Some(phone) = filled(address.phone.as_deref()) {
        label.push_str(" • ");
        label.push_str(phone);
    }
    label
}

/// A country in the address form select.
#[derive(Clone)]
pub struct CountryView {
    pub code: String,
    pub name: String,
    pub selected: bool,
}

/// Address form field values.
#[derive(Clone, Default)]
pub struct AddressFormView {
    pub first_name: String,
    pub last_name: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub company: String,
    pub phone: String,
    pub countries: Vec<CountryView>,
}

impl AddressFormView {
    #[must_use]
    pub fn new(address: Option<&DraftAddress>, region: Option<&Region>) -> Self {
        let field = |get: fn(&DraftAddress) -> Option<&String>| {
            address.and_then(get).cloned().unwrap_or_default()
        };
        let country = address
            .and_then(|a| filled(a.country_code.as_deref()))
            .map(str::to_ascii_lowercase);

        Self {
            first_name: field(|a| a.first_name.as_ref()),
            last_name: field(|a| a.last_name.as_ref()),
            address_1: field(|a| a.address_1.as_ref()),
            address_2: field(|a| a.address_2.as_ref()),
            city: field(|a| a.city.as_ref()),
            province: field(|a| a.province.as_ref()),
            postal_code: field(|a| a.postal_code.as_ref()),
            company: field(|a| a.company.as_ref()),
            phone: field(|a| a.phone.as_ref()),
            countries: region
                .map(|r| {
                    r.countries
                        .iter()
                        .map(|c| CountryView {
                            code: c.iso_2.clone(),
                            name: c
                                .display_name
                                .clone()
                                .unwrap_or_else(|| c.iso_2.to_ascii_uppercase()),
                            selected: country.as_deref() == Some(c.iso_2.as_str()),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Delivery section display data.
#[derive(Clone)]
pub struct AddressSectionView {
    /// Saved addresses; empty for guests and new customers.
    pub saved: Vec<SavedAddressView>,
    pub form: AddressFormView,
    pub registered: bool,
}

/// A shipping choice.
#[derive(Clone)]
pub struct ShippingOptionView {
    pub id: String,
    pub name: String,
    /// `None` while the price is being calculated or failed to.
    pub price: Option<String>,
    pub ready: bool,
    pub selected: bool,
}

impl ShippingOptionView {
    fn new(priced: &PricedOption, cart: &Cart) -> Self {
        Self {
            id: priced.option.id.to_string(),
            name: priced.option.name.clone(),
            price: priced.price.map(|p| cart.money(Some(p)).format()),
            ready: priced.is_ready(),
            selected: cart.selected_shipping_option() == Some(&priced.option.id),
        }
    }
}

/// Order summary totals.
#[derive(Clone)]
pub struct SummaryView {
    pub subtotal: String,
    pub discounts: String,
    pub shipping: String,
    pub taxes: String,
    pub total: String,
}

impl From<&Cart> for SummaryView {
    fn from(cart: &Cart) -> Self {
        Self {
            subtotal: cart.money(cart.subtotal).format(),
            discounts: cart.money(cart.discount_total).format(),
            shipping: cart.money(cart.shipping_total).format(),
            taxes: cart.money(cart.tax_total).format(),
            total: cart.money(cart.total).format(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Checkout confirm page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirm.html")]
pub struct ConfirmTemplate {
    /// `None` when there is nothing to check out.
    pub checkout: Option<CheckoutView>,
    pub error: Option<String>,
    pub nonce: String,
}

/// Everything the confirm page shows for a non-empty cart.
#[derive(Clone)]
pub struct CheckoutView {
    pub cart: CartView,
    pub contact: ContactView,
    pub address: AddressSectionView,
    pub shipping: Vec<ShippingOptionView>,
    pub summary: SummaryView,
    /// What still blocks "Pay Now".
    pub blocker: Option<String>,
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct OrderSuccessTemplate {
    pub order_id: Option<String>,
    pub nonce: String,
}

// =============================================================================
// Forms
// =============================================================================

/// Contact form data.
#[derive(Debug, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub email: String,
}

/// Saved address pick.
#[derive(Debug, Deserialize)]
pub struct SavedAddressForm {
    pub address_id: CustomerAddressId,
}

/// Shipping pick.
#[derive(Debug, Deserialize)]
pub struct ShippingForm {
    pub option_id: ShippingOptionId,
}

/// `?id=` on the confirmation page.
#[derive(Debug, Deserialize)]
pub struct OrderSuccessQuery {
    pub id: Option<OrderId>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Seed an untouched draft: the email from the cart or the account, and the
/// first saved address.
fn seed_draft(draft: &mut CheckoutDraft, cart: &Cart, customer: Option<&Customer>) -> bool {
    let mut changed = false;

    if draft.email.is_none()
        && let Some(email) = filled(cart.email.as_deref())
            .or_else(|| customer.and_then(|c| filled(Some(c.email.as_str()))))
    {
        draft.set_email(email);
        changed = true;
    }

    if draft.selected_address_id.is_none()
        && draft.manual_address.is_none()
        && let Some(first) = customer.and_then(|c| c.addresses.first())
    {
        draft.select_saved_address(first.id.clone());
        changed = true;
    }

    changed
}

/// Write the draft onto the visitor's cart and go back to the confirm page.
async fn sync_and_return(
    state: &AppState,
    session: &Session,
    customer: Option<&Customer>,
    change: impl FnOnce(&mut CheckoutDraft),
) -> Result<Response, AppError> {
    let Some(cart) = CartProvider::new(session, state.medusa()).peek().await? else {
        return Ok(Redirect::to(CONFIRM_PATH).into_response());
    };

    let checkout = CheckoutService::new(session, state);
    let draft = checkout.update_draft(&cart.id, change).await?;

    Ok(match checkout.sync_to_cart(&draft, &cart, customer).await {
        Ok(_) => Redirect::to(CONFIRM_PATH).into_response(),
        Err(AppError::Medusa(e)) => {
            tracing::warn!(cart_id = %cart.id, error = %e, "Checkout sync failed");
            redirect_with(CONFIRM_PATH, "error", &e.user_message()).into_response()
        }
        Err(e) => return Err(e),
    })
}

async fn checkout_view(
    state: &AppState,
    session: &Session,
    cart: Cart,
    customer: Option<&Customer>,
) -> Result<(CheckoutView, Option<String>), AppError> {
    let checkout = CheckoutService::new(session, state);
    let mut draft = checkout.load_draft(&cart.id).await?;
    if seed_draft(&mut draft, &cart, customer) {
        checkout.save_draft(&draft).await?;
    }

    let mut sync_error = None;
    let cart = match checkout.sync_to_cart(&draft, &cart, customer).await {
        Ok(synced) => synced,
        Err(AppError::Medusa(e)) => {
            tracing::warn!(cart_id = %cart.id, error = %e, "Checkout sync failed");
            sync_error = Some(e.user_message());
            cart
        }
        Err(e) => return Err(e),
    };

    let shipping = match priced_options(state.medusa(), &cart.id).await {
        Ok(options) => options
            .iter()
            .map(|priced| ShippingOptionView::new(priced, &cart))
            .collect(),
        Err(e) => {
            tracing::warn!(cart_id = %cart.id, error = %e, "Failed to list shipping options");
            Vec::new()
        }
    };

    let manual = draft
        .manual_address
        .clone()
        .or_else(|| cart.shipping_address.as_ref().map(DraftAddress::from));
    let view = CheckoutView {
        contact: ContactView {
            email: draft.email.clone().unwrap_or_default(),
            registered: customer.is_some(),
        },
        address: AddressSectionView {
            saved: customer
                .map(|c| {
                    c.addresses
                        .iter()
                        .map(|a| SavedAddressView::new(a, draft.selected_address_id.as_ref()))
                        .collect()
                })
                .unwrap_or_default(),
            form: AddressFormView::new(manual.as_ref(), cart.region.as_ref()),
            registered: customer.is_some(),
        },
        shipping,
        summary: SummaryView::from(&cart),
        blocker: validate_for_payment(Some(&cart)).map(str::to_string),
        cart: CartView::new(&cart, state.medusa()),
    };
    Ok((view, sync_error))
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the checkout page.
#[instrument(skip(state, session, customer, nonce))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
    CspNonce(nonce): CspNonce,
    Query(query): Query<MessageQuery>,
) -> Result<ConfirmTemplate, AppError> {
    let cart = CartProvider::new(&session, state.medusa())
        .peek()
        .await?
        .filter(|cart| !cart.is_empty());
    let Some(cart) = cart else {
        return Ok(ConfirmTemplate {
            checkout: None,
            error: query.error,
            nonce,
        });
    };

    let (view, sync_error) = checkout_view(&state, &session, cart, customer.customer()).await?;
    Ok(ConfirmTemplate {
        checkout: Some(view),
        error: query.error.or(sync_error),
        nonce,
    })
}

/// Set the contact email.
#[instrument(skip(state, session, customer, form))]
pub async fn contact(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
    Form(form): Form<ContactForm>,
) -> Result<Response, AppError> {
    sync_and_return(&state, &session, customer.customer(), |draft| {
        draft.set_email(&form.email);
    })
    .await
}

/// Type in a delivery address.
#[instrument(skip(state, session, customer, address))]
pub async fn address(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
    Form(address): Form<DraftAddress>,
) -> Result<Response, AppError> {
    sync_and_return(&state, &session, customer.customer(), |draft| {
        draft.merge_manual_address(address);
    })
    .await
}

/// Deliver to a saved address.
#[instrument(skip(state, session, customer))]
pub async fn saved_address(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
    Form(form): Form<SavedAddressForm>,
) -> Result<Response, AppError> {
    let known = customer
        .customer()
        .is_some_and(|c| c.address(&form.address_id).is_some());
    if !known {
        return Ok(
            redirect_with(CONFIRM_PATH, "error", "Please pick one of your addresses.")
                .into_response(),
        );
    }

    sync_and_return(&state, &session, customer.customer(), |draft| {
        draft.select_saved_address(form.address_id);
    })
    .await
}

/// Save a new address to the account and deliver to it.
#[instrument(skip(state, session, customer, address))]
pub async fn new_address(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer { customer, .. }: RequireCustomer,
    Form(address): Form<DraftAddress>,
) -> Result<Response, AppError> {
    let cart = CartProvider::new(&session, state.medusa()).peek().await?;
    let region = match cart.as_ref().and_then(|c| c.region.clone()) {
        Some(region) => Some(region),
        None => RegionProvider::new(&session, state.medusa()).current().await?,
    };

    let updated = match CustomerProvider::new(&session, state.medusa())
        .add_address(address, region.as_ref())
        .await
    {
        Ok(updated) => updated,
        Err(e) => {
            tracing::warn!(customer_id = %customer.id, error = %e, "Failed to add address");
            return Ok(redirect_with(CONFIRM_PATH, "error", ADD_ADDRESS_FAILED).into_response());
        }
    };

    let Some(added) = updated.addresses.last().map(|a| a.id.clone()) else {
        return Ok(redirect_with(CONFIRM_PATH, "error", ADD_ADDRESS_FAILED).into_response());
    };
    sync_and_return(&state, &session, Some(&updated), |draft| {
        draft.select_saved_address(added);
    })
    .await
}

/// Pick a shipping method.
#[instrument(skip(state, session))]
pub async fn shipping(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ShippingForm>,
) -> Result<Response, AppError> {
    Ok(
        match CartProvider::new(&session, state.medusa())
            .select_shipping(&form.option_id)
            .await
        {
            Ok(_) => Redirect::to(CONFIRM_PATH).into_response(),
            Err(e) => {
                tracing::warn!(option_id = %form.option_id, error = %e, "Failed to set shipping");
                redirect_with(CONFIRM_PATH, "error", &e.user_message()).into_response()
            }
        },
    )
}

/// Place the order.
#[instrument(skip(state, session, customer))]
pub async fn complete(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
) -> Result<Response, AppError> {
    let outcome = CheckoutService::new(&session, &state)
        .place_order(customer.customer())
        .await?;

    Ok(match outcome {
        PlaceOrder::Placed(order_id) => Redirect::to(&format!(
            "/order/success?id={}",
            urlencoding::encode(order_id.as_str())
        ))
        .into_response(),
        PlaceOrder::Rejected(reason) => {
            redirect_with(CONFIRM_PATH, "error", &reason).into_response()
        }
    })
}

/// Display the order confirmation.
#[instrument(skip(nonce))]
pub async fn order_success(
    CspNonce(nonce): CspNonce,
    Query(query): Query<OrderSuccessQuery>,
) -> OrderSuccessTemplate {
    OrderSuccessTemplate {
        order_id: query.id.map(|id| id.to_string()),
        nonce,
    }
}
