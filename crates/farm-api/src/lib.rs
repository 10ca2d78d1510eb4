//! Typed farm-management endpoints for the Farmstead client.
//!
//! [`FarmApi`] owns the session and the authenticated pipeline. Login and
//! registration go through the token endpoints; everything else is sent
//! with the current access token and recovers from one expired token.

mod client;
mod models;

pub use client::FarmApi;
pub use farm_auth::Registration;
pub use models::{
    Category, Farm, FarmUpdate, GoogleLoginUrl, Livestock, LivestockInput, Page, Product,
    RegisterRequest, UserProfile, UserProfileUpdate,
};
