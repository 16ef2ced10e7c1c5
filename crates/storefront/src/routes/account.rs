//! Account route handlers.
//!
//! `/profile` shows the sign-in and registration forms to visitors and the
//! profile with its address book to signed-in customers. Changes are plain
//! form posts answered with a redirect and a flash message.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use dbk_core::CustomerAddressId;
use dbk_core::address::{DraftAddress, display_name, filled};

use crate::error::AppError;
use crate::filters;
use crate::medusa::{Customer, CustomerAddress, CustomerUpdate, Region};
use crate::middleware::{CspNonce, LOGIN_PATH, OptionalCustomer, RequireCustomer};
use crate::services::{CustomerProvider, CustomerState, RegionProvider};
use crate::state::AppState;

use super::checkout::{AddressFormView, address_label};
use super::redirect_with;

/// Profile display data for templates.
#[derive(Clone)]
pub struct ProfileView {
    pub name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub addresses: Vec<AddressView>,
    /// Blank add-address form with the region's countries.
    pub new_address: AddressFormView,
}

impl ProfileView {
    #[must_use]
    pub fn new(customer: &Customer, region: Option<&Region>) -> Self {
        Self {
            name: display_name(
                customer.first_name.as_deref(),
                customer.last_name.as_deref(),
                Some(customer.email.as_str()),
            ),
            email: customer.email.clone(),
            first_name: customer.first_name.clone().unwrap_or_default(),
            last_name: customer.last_name.clone().unwrap_or_default(),
            phone: customer.phone.clone().unwrap_or_default(),
            addresses: customer
                .addresses
                .iter()
                .map(|a| AddressView::new(a, region))
                .collect(),
            new_address: AddressFormView::new(None, region),
        }
    }
}

/// A saved address with its edit form.
#[derive(Clone)]
pub struct AddressView {
    pub id: String,
    pub label: String,
    /// Where the edit form posts.
    pub action: String,
    pub form: AddressFormView,
}

impl AddressView {
    fn new(saved: &CustomerAddress, region: Option<&Region>) -> Self {
        let address = DraftAddress::from(&saved.address);
        Self {
            id: saved.id.to_string(),
            label: address_label(&address),
            action: format!("/profile/addresses/{}", urlencoding::encode(saved.id.as_str())),
            form: AddressFormView::new(Some(&address), region),
        }
    }
}

/// `/profile` query: flashes and which sign-in form to show.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    pub error: Option<String>,
    pub success: Option<String>,
    pub register: Option<String>,
}

impl ProfileQuery {
    fn wants_register(&self) -> bool {
        self.register.as_deref().is_some_and(|v| v == "1")
    }
}

/// Account page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/show.html")]
pub struct AccountTemplate {
    /// `None` for signed-out visitors.
    pub profile: Option<ProfileView>,
    pub show_register: bool,
    pub error: Option<String>,
    pub success: Option<String>,
    pub nonce: String,
}

/// Profile form data.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
}

impl ProfileForm {
    /// Fields to change; blank inputs are left alone.
    #[must_use]
    pub fn to_update(&self) -> CustomerUpdate {
        let value = |field: &str| filled(Some(field)).map(str::to_string);
        CustomerUpdate {
            first_name: value(&self.first_name),
            last_name: value(&self.last_name),
            phone: value(&self.phone),
            company_name: None,
        }
    }
}

/// Display the sign-in forms or the profile.
#[instrument(skip(state, session, customer, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
    CspNonce(nonce): CspNonce,
    Query(query): Query<ProfileQuery>,
) -> Result<AccountTemplate, AppError> {
    let show_register = query.wants_register();
    let (profile, load_error) = match &customer {
        CustomerState::Authenticated(customer) => {
            let region = RegionProvider::new(&session, state.medusa()).current().await?;
            (Some(ProfileView::new(customer, region.as_ref())), None)
        }
        CustomerState::Failed(message) => (None, Some(message.clone())),
        CustomerState::Anonymous => (None, None),
    };

    Ok(AccountTemplate {
        profile,
        show_register,
        error: query.error.or(load_error),
        success: query.success,
        nonce,
    })
}

/// Update name and phone.
#[instrument(skip(state, session, _customer, form))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    _customer: RequireCustomer,
    Form(form): Form<ProfileForm>,
) -> Response {
    let result = CustomerProvider::new(&session, state.medusa())
        .update_profile(&form.to_update())
        .await;
    flash(result, "Profile updated.", "Could not update profile.")
}

/// Add an address to the address book.
#[instrument(skip(state, session, _customer, address))]
pub async fn add_address(
    State(state): State<AppState>,
    session: Session,
    _customer: RequireCustomer,
    Form(address): Form<DraftAddress>,
) -> Result<Response, AppError> {
    let region = RegionProvider::new(&session, state.medusa()).current().await?;
    let result = CustomerProvider::new(&session, state.medusa())
        .add_address(address, region.as_ref())
        .await;
    Ok(flash(result, "Address added.", "Failed to add address"))
}

/// Replace a saved address.
#[instrument(skip(state, session, customer, address))]
pub async fn update_address(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer { customer, .. }: RequireCustomer,
    Path(id): Path<CustomerAddressId>,
    Form(address): Form<DraftAddress>,
) -> Result<Response, AppError> {
    if customer.address(&id).is_none() {
        return Ok(redirect_with(LOGIN_PATH, "error", "Address not found.").into_response());
    }
    let region = RegionProvider::new(&session, state.medusa()).current().await?;
    let result = CustomerProvider::new(&session, state.medusa())
        .update_address(&id, address, region.as_ref())
        .await;
    Ok(flash(result, "Address updated.", "Could not update address."))
}

/// Remove a saved address.
#[instrument(skip(state, session, customer))]
pub async fn delete_address(
    State(state): State<AppState>,
    session: Session,
    RequireCustomer { customer, .. }: RequireCustomer,
    Path(id): Path<CustomerAddressId>,
) -> Response {
    if customer.address(&id).is_none() {
        return redirect_with(LOGIN_PATH, "error", "Address not found.").into_response();
    }
    let result = CustomerProvider::new(&session, state.medusa())
        .delete_address(&id)
        .await;
    flash(result, "Address removed.", "Could not remove address.")
}

/// Back to the profile with a success or error flash.
fn flash(result: Result<Customer, AppError>, success: &str, failure: &str) -> Response {
    match result {
        Ok(_) => redirect_with(LOGIN_PATH, "success", success).into_response(),
        Err(AppError::Unauthorized(_)) => Redirect::to(LOGIN_PATH).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "{failure}");
            redirect_with(LOGIN_PATH, "error", failure).into_response()
        }
    }
}
