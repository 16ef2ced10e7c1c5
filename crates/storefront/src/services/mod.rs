//! Business logic on top of the Medusa client.
//!
//! # Services
//!
//! - `region` - Region the visitor is priced in
//! - `cart` - The visitor's cart (id kept in the session)
//! - `customer` - Signed-in customer, profile and address book
//! - `auth` - Login, registration and logout
//! - `checkout` - Checkout draft, cart sync and order placement
//! - `shipping` - Shipping options with calculated prices
//! - `single_flight` - Per-key coalescing of concurrent work

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod customer;
pub mod region;
pub mod shipping;
pub mod single_flight;

pub use auth::{AuthError, AuthService, Registration};
pub use cart::CartProvider;
pub use checkout::{CheckoutService, PlaceOrder, validate_for_payment};
pub use customer::{CustomerProvider, CustomerState};
pub use region::RegionProvider;
pub use shipping::{PricedOption, priced_options};
pub use single_flight::SingleFlight;
