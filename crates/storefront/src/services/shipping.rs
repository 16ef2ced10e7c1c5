//! Shipping options with their prices.
//!
//! Flat options carry their price. Calculated options are priced by the
//! backend per cart, all at once; an option whose calculation fails stays
//! listed but cannot be picked.

use rust_decimal::Decimal;
use tokio::task::JoinSet;
use tracing::instrument;

use dbk_core::CartId;

use crate::medusa::{MedusaClient, MedusaError, ShippingOption, ShippingPriceType};

/// A shipping option and its price, when known.
#[derive(Debug, Clone)]
pub struct PricedOption {
    pub option: ShippingOption,
    pub price: Option<Decimal>,
}

impl PricedOption {
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.price.is_some()
    }
}

/// List the cart's shipping options and price them.
///
/// # Errors
///
/// Returns an error if the option list cannot be fetched. Failed price
/// calculations are not errors.
#[instrument(skip(client), fields(cart_id = %cart_id))]
pub async fn priced_options(
    client: &MedusaClient,
    cart_id: &CartId,
) -> Result<Vec<PricedOption>, MedusaError> {
    let options = client.list_shipping_options(cart_id).await?;

    let mut calculations = JoinSet::new();
    for (index, option) in options.iter().enumerate() {
        if option.price_type != ShippingPriceType::Calculated {
            continue;
        }
        let client = client.clone();
        let option_id = option.id.clone();
        let cart_id = cart_id.clone();
        calculations.spawn(async move {
            let result = client.calculate_shipping_option(&option_id, &cart_id).await;
            (index, result)
        });
    }

    let mut priced: Vec<PricedOption> = options
        .into_iter()
        .map(|option| PricedOption {
            price: match option.price_type {
                ShippingPriceType::Flat => option.amount,
                ShippingPriceType::Calculated | ShippingPriceType::Other => None,
            },
            option,
        })
        .collect();

    while let Some(joined) = calculations.join_next().await {
        match joined {
            Ok((index, Ok(calculated))) => {
                if let Some(slot) = priced.get_mut(index) {
                    slot.price = calculated.amount;
                }
            }
            Ok((index, Err(e))) => {
                tracing::warn!(index, error = %e, "Shipping price calculation failed");
            }
            Err(e) => tracing::error!(error = %e, "Shipping calculation task failed"),
        }
    }

    Ok(priced)
}
