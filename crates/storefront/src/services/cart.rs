//! The visitor's cart.
//!
//! Only the cart id lives in the session. Every mutation answers with the
//! full cart from the backend, which replaces whatever was shown before.

use tower_sessions::Session;
use tracing::instrument;

use dbk_core::{CartId, LineItemId, ShippingOptionId, VariantId};

use crate::error::{AppError, add_breadcrumb};
use crate::medusa::{Cart, CustomerToken, MedusaClient, MedusaError};
use crate::models::CheckoutDraft;
use crate::models::session::keys;

use super::region::RegionProvider;

/// Rejection for changes that need an existing cart.
pub const NO_CART: &str = "No cart";

/// Session-scoped cart operations.
pub struct CartProvider<'a> {
    session: &'a Session,
    client: &'a MedusaClient,
}

impl<'a> CartProvider<'a> {
    #[must_use]
    pub const fn new(session: &'a Session, client: &'a MedusaClient) -> Self {
        Self { session, client }
    }

    /// The stored cart id, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn stored_id(&self) -> Result<Option<CartId>, AppError> {
        Ok(self.session.get::<CartId>(keys::CART_ID).await?)
    }

    /// The visitor's cart without creating one.
    ///
    /// A stored id the backend no longer knows is forgotten.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or the session store fails.
    #[instrument(skip(self))]
    pub async fn peek(&self) -> Result<Option<Cart>, AppError> {
        let Some(id) = self.stored_id().await? else {
            return Ok(None);
        };

        match self.client.get_cart(&id).await {
            Ok(cart) => Ok(Some(cart)),
            Err(MedusaError::NotFound(_)) => {
                tracing::warn!(cart_id = %id, "Stored cart no longer exists");
                self.forget().await?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The visitor's cart, created in the current region if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend has no region, or the backend or the
    /// session store fails.
    #[instrument(skip(self))]
    pub async fn current(&self) -> Result<Cart, AppError> {
        match self.peek().await? {
            Some(cart) => Ok(cart),
            None => self.create().await,
        }
    }

    async fn create(&self) -> Result<Cart, AppError> {
        let region = RegionProvider::new(self.session, self.client)
            .current()
            .await?
            .ok_or_else(|| AppError::Internal("No region available for a new cart".to_string()))?;

        let cart = self.client.create_cart(&region.id).await?;
        self.session.insert(keys::CART_ID, &cart.id).await?;
        tracing::info!(cart_id = %cart.id, "Created cart");
        Ok(cart)
    }

    /// Stored cart id. Changes to lines, codes or shipping never start a cart.
    async fn cart_id(&self) -> Result<CartId, AppError> {
        self.stored_id()
            .await?
            .ok_or_else(|| AppError::BadRequest(NO_CART.to_string()))
    }

    async fn forget(&self) -> Result<(), AppError> {
        self.session.remove::<CartId>(keys::CART_ID).await?;
        self.session
            .remove::<CheckoutDraft>(keys::CHECKOUT_DRAFT)
            .await?;
        Ok(())
    }

    /// Add `quantity` (at least one) of a variant.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the line or fails.
    #[instrument(skip(self), fields(variant_id = %variant_id))]
    pub async fn add_line(&self, variant_id: &VariantId, quantity: u32) -> Result<Cart, AppError> {
        let cart = self.current().await?;
        add_breadcrumb("cart", "Added line", Some(&[("variant_id", variant_id.as_str())]));
        Ok(self
            .client
            .add_line_item(&cart.id, variant_id, quantity.max(1))
            .await?)
    }

    /// Set a line's quantity, never below one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the change or fails.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn update_line(&self, line_id: &LineItemId, quantity: u32) -> Result<Cart, AppError> {
        let id = self.cart_id().await?;
        Ok(self
            .client
            .update_line_item(&id, line_id, quantity.max(1))
            .await?)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_line(&self, line_id: &LineItemId) -> Result<Cart, AppError> {
        let id = self.cart_id().await?;
        Ok(self.client.delete_line_item(&id, line_id).await?)
    }

    /// Drop the current cart (and its checkout draft) and start a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or the session store fails.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Cart, AppError> {
        self.forget().await?;
        self.create().await
    }

    /// Apply a promotion code. Blank codes leave the cart unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the code or fails.
    #[instrument(skip(self))]
    pub async fn apply_promotion(&self, code: &str) -> Result<Cart, AppError> {
        let cart = self.current().await?;
        let code = code.trim();
        if code.is_empty() {
            return Ok(cart);
        }
        Ok(self.client.apply_promotions(&cart.id, &[code]).await?)
    }

    /// Remove a promotion code.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    #[instrument(skip(self))]
    pub async fn remove_promotion(&self, code: &str) -> Result<Cart, AppError> {
        let id = self.cart_id().await?;
        Ok(self.client.remove_promotions(&id, &[code.trim()]).await?)
    }

    /// Choose the shipping option for the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the option or fails.
    #[instrument(skip(self), fields(option_id = %option_id))]
    pub async fn select_shipping(&self, option_id: &ShippingOptionId) -> Result<Cart, AppError> {
        let id = self.cart_id().await?;
        Ok(self.client.add_shipping_method(&id, option_id).await?)
    }

    /// Hand a guest cart to a freshly signed-in customer.
    ///
    /// Failures are logged and otherwise ignored: the shopper keeps a usable
    /// guest cart.
    #[instrument(skip(self, token))]
    pub async fn transfer_to_customer(&self, token: &CustomerToken) {
        let id = match self.stored_id().await {
            Ok(Some(id)) => id,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read cart id for transfer");
                return;
            }
        };

        if let Err(e) = self.client.transfer_cart(&id, token).await {
            tracing::warn!(cart_id = %id, error = %e, "Cart transfer failed");
        }
    }
}
